//! Acknowledgement handling of deposit and LSM share transfers.

use crate::{
  Config, DepositRecordStatus, Error, Event, LsmTokenDepositStatus, LsmTransferCallback, Pallet,
  TransferCallback, LOG_TARGET,
};
use codec::Decode;
use polkadot_sdk::{frame_support::traits::Get, sp_runtime::DispatchResult};
use primitives::{AckResponse, AckStatus, CallbackHandler, CallbackKind, Packet};

impl<T: Config> CallbackHandler for Pallet<T> {
  fn handles(kind: CallbackKind) -> bool {
    matches!(kind, CallbackKind::NativeTransfer | CallbackKind::LsmTransfer)
  }

  fn call(kind: CallbackKind, _packet: &Packet, ack: &AckResponse, args: &[u8]) -> DispatchResult {
    match kind {
      CallbackKind::NativeTransfer => Self::native_transfer_callback(ack, args),
      CallbackKind::LsmTransfer => Self::lsm_transfer_callback(ack, args),
      _ => Err(Error::<T>::InvalidCallbackArgs.into()),
    }
  }
}

impl<T: Config> Pallet<T> {
  /// A landed transfer queues the deposit for delegation; anything else re-queues the transfer.
  pub(crate) fn native_transfer_callback(ack: &AckResponse, args: &[u8]) -> DispatchResult {
    let TransferCallback { deposit_record_id } =
      TransferCallback::decode(&mut &args[..]).map_err(|_| Error::<T>::InvalidCallbackArgs)?;

    // A reaped record leaves nothing to update; dropping the ack lets the registry forget it.
    let Some(record) = Self::get_deposit_record(deposit_record_id) else {
      log::warn!(
        target: LOG_TARGET,
        "transfer acknowledged for unknown deposit record {}",
        deposit_record_id
      );
      return Ok(());
    };

    let status = match ack.status {
      AckStatus::Success => DepositRecordStatus::DelegationQueue,
      AckStatus::Failure => {
        log::warn!(
          target: LOG_TARGET,
          "deposit record {} transfer failed: {}",
          deposit_record_id,
          ack.error
        );
        DepositRecordStatus::TransferQueue
      },
      AckStatus::Timeout => {
        log::warn!(target: LOG_TARGET, "deposit record {} transfer timed out", deposit_record_id);
        DepositRecordStatus::TransferQueue
      },
    };
    Self::update_deposit_status(record, status);

    Self::deposit_event(Event::NativeTransferAcknowledged {
      deposit_record_id,
      status: ack.status,
    });
    Ok(())
  }

  /// A landed share waits for detokenization; a timeout is retried until the attempt budget
  /// runs out.
  pub(crate) fn lsm_transfer_callback(ack: &AckResponse, args: &[u8]) -> DispatchResult {
    let LsmTransferCallback { chain_id, denom } =
      LsmTransferCallback::decode(&mut &args[..]).map_err(|_| Error::<T>::InvalidCallbackArgs)?;

    let mut deposit =
      Self::get_lsm_deposit(&chain_id, &denom).ok_or(Error::<T>::UnknownLsmDeposit)?;

    deposit.status = match ack.status {
      AckStatus::Success => LsmTokenDepositStatus::DetokenizationQueue,
      AckStatus::Failure => {
        log::warn!(target: LOG_TARGET, "LSM share transfer failed: {}", ack.error);
        LsmTokenDepositStatus::TransferFailed
      },
      AckStatus::Timeout if deposit.transfer_attempts >= T::MaxLsmTransferAttempts::get() => {
        log::warn!(
          target: LOG_TARGET,
          "LSM share transfer timed out after {} attempts",
          deposit.transfer_attempts
        );
        LsmTokenDepositStatus::TransferFailed
      },
      AckStatus::Timeout => LsmTokenDepositStatus::DepositPending,
    };
    Self::set_lsm_deposit(deposit);

    Self::deposit_event(Event::LsmTransferAcknowledged { chain_id, denom, status: ack.status });
    Ok(())
  }
}
