//! Acknowledgement handling of delegations, undelegations, exit transfers, claims and
//! detokenizations.

use crate::{
  ClaimCallback, Config, DelegateCallback, DetokenizeCallback, Error, HostZones, Pallet,
  RedemptionCallback, UndelegateCallback, LOG_TARGET,
};
use codec::Decode;
use pallet_records::{DepositRecordStatus, HostZoneUnbondingStatus, LsmTokenDepositStatus};
use polkadot_sdk::sp_runtime::{DispatchError, DispatchResult};
use primitives::{
  AckResponse, AckStatus, CallbackHandler, CallbackKind, Packet, TokenBank, UndelegateResponse,
};

type Records<T> = pallet_records::Pallet<T>;

impl<T: Config> CallbackHandler for Pallet<T> {
  fn handles(kind: CallbackKind) -> bool {
    matches!(
      kind,
      CallbackKind::Delegate |
        CallbackKind::Undelegate |
        CallbackKind::Redemption |
        CallbackKind::Claim |
        CallbackKind::Detokenize
    )
  }

  fn call(kind: CallbackKind, _packet: &Packet, ack: &AckResponse, args: &[u8]) -> DispatchResult {
    match kind {
      CallbackKind::Delegate => Self::delegate_callback(ack, decode::<T, _>(args)?),
      CallbackKind::Undelegate => Self::undelegate_callback(ack, decode::<T, _>(args)?),
      CallbackKind::Redemption => Self::redemption_callback(ack, decode::<T, _>(args)?),
      CallbackKind::Claim => Self::claim_callback(ack, decode::<T, _>(args)?),
      CallbackKind::Detokenize => Self::detokenize_callback(ack, decode::<T, _>(args)?),
      _ => Err(Error::<T>::InvalidCallbackArgs.into()),
    }
  }
}

fn decode<T: Config, A: Decode>(args: &[u8]) -> Result<A, DispatchError> {
  A::decode(&mut &args[..]).map_err(|_| Error::<T>::InvalidCallbackArgs.into())
}

impl<T: Config> Pallet<T> {
  pub(crate) fn delegate_callback(ack: &AckResponse, args: DelegateCallback) -> DispatchResult {
    let mut record = Records::<T>::get_deposit_record(args.deposit_record_id)
      .ok_or(pallet_records::Error::<T>::UnknownDepositRecord)?;
    record.delegation_txs_in_progress = Self::decrement(record.delegation_txs_in_progress)?;

    if ack.status != AckStatus::Success {
      log::warn!(
        target: LOG_TARGET,
        "delegation of deposit record {} did not land ({:?}), requeueing",
        record.id,
        ack.status
      );
      record.status = DepositRecordStatus::DelegationQueue;
      Records::<T>::set_deposit_record(record);
      return Ok(());
    }

    HostZones::<T>::try_mutate(&args.host_zone_id, |maybe| -> DispatchResult {
      let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
      for split in &args.splits {
        let validator =
          zone.validator_mut(&split.validator).ok_or(Error::<T>::ValidatorNotFound)?;
        validator.delegation = validator.delegation.saturating_add(split.amount);
        zone.total_delegations = zone.total_delegations.saturating_add(split.amount);
      }
      Ok(())
    })?;

    if record.delegation_txs_in_progress == 0 {
      Records::<T>::remove_deposit_record(record.id);
    } else {
      Records::<T>::set_deposit_record(record);
    }
    Ok(())
  }

  pub(crate) fn undelegate_callback(ack: &AckResponse, args: UndelegateCallback) -> DispatchResult {
    let zone = Self::get_host_zone(&args.host_zone_id)?;

    let unbonding_time = match ack.status {
      AckStatus::Success => {
        let latest_completion = ack
          .msg_responses
          .iter()
          .filter_map(|raw| UndelegateResponse::decode(&mut &raw[..]).ok())
          .map(|response| response.completion_time)
          .max()
          .unwrap_or_default();
        let earliest = Self::now_secs().saturating_add(zone.unbonding_period_seconds);
        Some(latest_completion.max(earliest))
      },
      _ => None,
    };

    for epoch_number in &args.epoch_numbers {
      let mut cell = Records::<T>::get_host_zone_unbonding(*epoch_number, &args.host_zone_id)
        .ok_or(pallet_records::Error::<T>::HostZoneUnbondingNotFound)?;
      cell.undelegation_txs_in_progress = Self::decrement(cell.undelegation_txs_in_progress)?;

      match (ack.status, unbonding_time) {
        (AckStatus::Success, Some(time)) => {
          cell.unbonding_time = cell.unbonding_time.max(time);
          if cell.undelegation_txs_in_progress == 0 && cell.st_tokens_to_burn > 0 {
            let st_denom = primitives::st_denom(&zone.host_denom);
            T::Bank::burn(&zone.deposit_address, &st_denom, cell.st_tokens_to_burn)?;
            cell.st_tokens_to_burn = 0;
          }
        },
        (AckStatus::Failure, _) => {
          log::warn!(
            target: LOG_TARGET,
            "undelegation of epoch {} failed: {}, queued for retry",
            epoch_number,
            ack.error
          );
          cell.status = HostZoneUnbondingStatus::UnbondingRetryQueue;
        },
        _ => {
          log::warn!(
            target: LOG_TARGET,
            "undelegation of epoch {} timed out, awaiting restore",
            epoch_number
          );
        },
      }
      Records::<T>::set_host_zone_unbonding(*epoch_number, cell)?;
    }

    if ack.status == AckStatus::Success {
      HostZones::<T>::try_mutate(&args.host_zone_id, |maybe| -> DispatchResult {
        let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
        for split in &args.splits {
          if let Some(validator) = zone.validator_mut(&split.validator) {
            validator.delegation = validator.delegation.saturating_sub(split.amount);
          }
        }
        zone.total_delegations =
          zone.validators.iter().fold(0u128, |sum, v| sum.saturating_add(v.delegation));
        Ok(())
      })?;
    }
    Ok(())
  }

  pub(crate) fn redemption_callback(ack: &AckResponse, args: RedemptionCallback) -> DispatchResult {
    for epoch_number in &args.epoch_numbers {
      let mut cell = Records::<T>::get_host_zone_unbonding(*epoch_number, &args.host_zone_id)
        .ok_or(pallet_records::Error::<T>::HostZoneUnbondingNotFound)?;
      if ack.status == AckStatus::Success {
        cell.claimable_native_tokens = cell.native_tokens_to_unbond;
        cell.native_tokens_to_unbond = 0;
        cell.status = HostZoneUnbondingStatus::Claimable;
      } else {
        cell.status = HostZoneUnbondingStatus::ExitTransferQueue;
      }
      Records::<T>::set_host_zone_unbonding(*epoch_number, cell)?;
    }
    if ack.status != AckStatus::Success {
      log::warn!(
        target: LOG_TARGET,
        "exit transfer of {:?} did not land ({:?}), requeueing",
        args.host_zone_id,
        ack.status
      );
    }
    Ok(())
  }

  /// A paid claim retires its redemption record; anything else makes it claimable again.
  pub(crate) fn claim_callback(ack: &AckResponse, args: ClaimCallback) -> DispatchResult {
    let mut user = Records::<T>::get_user_redemption_record(&args.user_redemption_record_id)
      .ok_or(pallet_records::Error::<T>::UserRedemptionRecordNotFound)?;
    let mut cell = Records::<T>::get_host_zone_unbonding(args.epoch_number, &args.chain_id)
      .ok_or(pallet_records::Error::<T>::HostZoneUnbondingNotFound)?;

    if ack.status == AckStatus::Success {
      cell.user_redemption_record_ids.retain(|id| *id != args.user_redemption_record_id);
      if cell.user_redemption_record_ids.is_empty() {
        // Truncation dust stays in the deposit address.
        cell.claimable_native_tokens = 0;
      }
      Records::<T>::remove_user_redemption_record(&args.user_redemption_record_id);
    } else {
      log::warn!(
        target: LOG_TARGET,
        "claim {:?} did not land ({:?}), reopening",
        args.user_redemption_record_id,
        ack.status
      );
      cell.claimable_native_tokens =
        cell.claimable_native_tokens.saturating_add(user.native_token_amount);
      user.claim_is_pending = false;
      Records::<T>::set_user_redemption_record(user);
    }
    Records::<T>::set_host_zone_unbonding(args.epoch_number, cell)
  }

  pub(crate) fn detokenize_callback(ack: &AckResponse, args: DetokenizeCallback) -> DispatchResult {
    let deposit = Records::<T>::get_lsm_deposit(&args.chain_id, &args.denom)
      .ok_or(pallet_records::Error::<T>::UnknownLsmDeposit)?;

    match ack.status {
      AckStatus::Success => {
        HostZones::<T>::try_mutate(&args.chain_id, |maybe| -> DispatchResult {
          let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
          let validator = zone
            .validator_mut(&deposit.validator_address)
            .ok_or(Error::<T>::ValidatorNotFound)?;
          validator.delegation = validator.delegation.saturating_add(deposit.amount);
          zone.total_delegations = zone.total_delegations.saturating_add(deposit.amount);
          Ok(())
        })?;
        Records::<T>::remove_lsm_deposit(&args.chain_id, &args.denom);
        Ok(())
      },
      AckStatus::Failure => Records::<T>::update_lsm_deposit_status(
        &args.chain_id,
        &args.denom,
        LsmTokenDepositStatus::DetokenizationFailed,
      ),
      AckStatus::Timeout => Records::<T>::update_lsm_deposit_status(
        &args.chain_id,
        &args.denom,
        LsmTokenDepositStatus::DetokenizationQueue,
      ),
    }
  }
}
