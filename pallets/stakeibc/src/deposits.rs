//! Deposit pipeline: liquid staking, transfers to the host, delegation and LSM deposits.

use crate::{
  Config, DelegateCallback, DetokenizeCallback, Error, Event, HostZone, Pallet, SplitDelegation,
  LOG_TARGET,
};
use alloc::vec::Vec;
use codec::Encode;
use pallet_records::{
  DepositRecord, DepositRecordSource, DepositRecordStatus, LsmTokenDeposit, LsmTokenDepositStatus,
};
use polkadot_sdk::{
  frame_support::{ensure, storage::with_storage_layer},
  sp_runtime::{DispatchError, DispatchResult},
};
use primitives::{
  bounded, div_trunc, epoch_ids::STRIDE_EPOCH, ports::TRANSFER_PORT, pro_rata, st_denom,
  CallbackKind, CallbackRegistry, Coin, Denom, DenomTraceResolver, HostMsg, IcaAccountType, IcaApi,
  TokenBank,
};

type Records<T> = pallet_records::Pallet<T>;

impl<T: Config> Pallet<T> {
  /// Escrows `amount` host vouchers, mints stTokens and books the deposit for the current
  /// stride epoch.
  pub fn do_liquid_stake(
    staker: &T::AccountId,
    amount: u128,
    host_denom: &[u8],
  ) -> Result<Coin, DispatchError> {
    ensure!(amount > 0, Error::<T>::InvalidAmount);
    let zone = Self::host_zone_by_denom(host_denom).ok_or(Error::<T>::HostZoneNotFound)?;
    let zone = Self::active_host_zone(&zone.chain_id)?;

    let st_amount = div_trunc(amount, zone.redemption_rate).ok_or(Error::<T>::InvalidAmount)?;
    ensure!(st_amount > 0, Error::<T>::InvalidAmount);
    let st_denom: Denom = bounded(&st_denom(&zone.host_denom)).ok_or(Error::<T>::InvalidHostZone)?;
    let epoch_number = Self::current_epoch(STRIDE_EPOCH).ok_or(Error::<T>::EpochNotStarted)?;

    T::Bank::transfer(staker, &zone.deposit_address, &zone.ibc_denom, amount)
      .map_err(|_| Error::<T>::InsufficientFunds)?;
    T::Bank::mint(staker, &st_denom, st_amount)?;

    match Records::<T>::transfer_queue_record(&zone.chain_id, epoch_number) {
      Some(mut record) => {
        record.amount = record.amount.checked_add(amount).ok_or(Error::<T>::InternalInvariant)?;
        Records::<T>::set_deposit_record(record);
      },
      None => {
        Records::<T>::append_deposit_record(DepositRecord {
          id: 0,
          amount,
          denom: zone.host_denom.clone(),
          host_zone_id: zone.chain_id.clone(),
          deposit_epoch_number: epoch_number,
          source: DepositRecordSource::Stride,
          status: DepositRecordStatus::TransferQueue,
          delegation_txs_in_progress: 0,
        });
      },
    }

    Self::deposit_event(Event::LiquidStaked {
      staker: staker.clone(),
      chain_id: zone.chain_id,
      native_amount: amount,
      st_amount,
    });
    Ok(Coin { denom: st_denom, amount: st_amount })
  }

  /// Escrows LSM shares and mints their stTokens right away; the shares themselves travel to
  /// the host with the next stride epoch.
  pub fn do_lsm_liquid_stake(
    staker: &T::AccountId,
    amount: u128,
    lsm_ibc_denom: &[u8],
  ) -> DispatchResult {
    ensure!(amount > 0, Error::<T>::InvalidAmount);
    let trace = T::DenomTraces::resolve(lsm_ibc_denom).ok_or(Error::<T>::InvalidLsmDenom)?;
    let channel_id = trace
      .path
      .strip_prefix(TRANSFER_PORT)
      .and_then(|rest| rest.strip_prefix(b"/"))
      .ok_or(Error::<T>::InvalidLsmDenom)?;
    let zone =
      Self::host_zone_by_transfer_channel(channel_id).ok_or(Error::<T>::HostZoneNotFound)?;
    let zone = Self::active_host_zone(&zone.chain_id)?;

    let slash = trace
      .base_denom
      .iter()
      .position(|b| *b == b'/')
      .ok_or(Error::<T>::InvalidLsmDenom)?;
    let validator_address = &trace.base_denom[..slash];
    ensure!(
      zone.validators.iter().any(|v| v.address.as_slice() == validator_address),
      Error::<T>::ValidatorNotFound
    );

    let denom: Denom = bounded(&trace.base_denom).ok_or(Error::<T>::InvalidLsmDenom)?;
    ensure!(
      Records::<T>::get_lsm_deposit(&zone.chain_id, &denom).is_none(),
      Error::<T>::LsmDepositAlreadyExists
    );

    let st_amount = div_trunc(amount, zone.redemption_rate).ok_or(Error::<T>::InvalidAmount)?;
    ensure!(st_amount > 0, Error::<T>::InvalidAmount);
    let st_denom: Denom = bounded(&st_denom(&zone.host_denom)).ok_or(Error::<T>::InvalidHostZone)?;

    T::Bank::transfer(staker, &zone.deposit_address, lsm_ibc_denom, amount)
      .map_err(|_| Error::<T>::InsufficientFunds)?;
    T::Bank::mint(staker, &st_denom, st_amount)?;

    let deposit_id = polkadot_sdk::sp_io::hashing::blake2_256(
      &(&zone.chain_id, &denom, staker, amount).encode(),
    );
    let validator_address = bounded(validator_address).ok_or(Error::<T>::InvalidLsmDenom)?;
    Records::<T>::set_lsm_deposit(LsmTokenDeposit {
      deposit_id,
      chain_id: zone.chain_id.clone(),
      denom,
      ibc_denom: bounded(lsm_ibc_denom).ok_or(Error::<T>::InvalidLsmDenom)?,
      validator_address: validator_address.clone(),
      amount,
      staker: staker.clone(),
      st_token: Coin { denom: st_denom, amount: st_amount },
      transfer_attempts: 0,
      status: LsmTokenDepositStatus::DepositPending,
    });

    Self::deposit_event(Event::LsmLiquidStaked {
      staker: staker.clone(),
      chain_id: zone.chain_id,
      validator: validator_address,
      amount,
      st_amount,
    });
    Ok(())
  }

  /// Splits `amount` across validators by weight; the rounding remainder goes to the first
  /// weighted validator.
  pub(crate) fn delegation_splits(
    zone: &HostZone<T::AccountId>,
    amount: u128,
  ) -> Result<Vec<SplitDelegation>, DispatchError> {
    let total_weight = zone
      .validators
      .iter()
      .fold(0u128, |sum, v| sum.saturating_add(u128::from(v.weight)));
    ensure!(total_weight > 0, Error::<T>::NoValidators);

    let mut splits: Vec<SplitDelegation> = zone
      .validators
      .iter()
      .filter(|v| v.weight > 0)
      .map(|v| {
        let share = pro_rata(amount, u128::from(v.weight), total_weight).unwrap_or_default();
        SplitDelegation { validator: v.address.clone(), amount: share }
      })
      .collect();

    let assigned = splits.iter().fold(0u128, |sum, s| sum.saturating_add(s.amount));
    let remainder = amount.checked_sub(assigned).ok_or(Error::<T>::InternalInvariant)?;
    if let Some(first) = splits.first_mut() {
      first.amount = first.amount.saturating_add(remainder);
    }
    splits.retain(|s| s.amount > 0);
    Ok(splits)
  }

  /// Transfers every non-empty `TransferQueue` record of a past epoch to the delegation account
  /// and prunes empty ones.
  pub(crate) fn transfer_deposits(zone: &HostZone<T::AccountId>, epoch_number: u64) {
    let queued = Records::<T>::all_deposit_records().into_iter().filter(|record| {
      record.host_zone_id == zone.chain_id &&
        record.status == DepositRecordStatus::TransferQueue &&
        record.deposit_epoch_number < epoch_number
    });

    for record in queued {
      if record.amount == 0 {
        Records::<T>::remove_deposit_record(record.id);
        continue;
      }
      let result = with_storage_layer(|| {
        Records::<T>::transfer_native_tokens(
          record.id,
          &zone.deposit_address,
          &zone.delegation_ica_address,
          &zone.transfer_channel_id,
          &zone.ibc_denom,
        )
      });
      if let Err(err) = result {
        log::error!(
          target: LOG_TARGET,
          "transfer of deposit record {} to {:?} failed: {:?}",
          record.id,
          zone.chain_id,
          err
        );
      }
    }
  }

  /// Delegates every `DelegationQueue` record through the delegation account.
  pub(crate) fn delegate_deposits(zone: &HostZone<T::AccountId>) {
    let queued = Records::<T>::all_deposit_records().into_iter().filter(|record| {
      record.host_zone_id == zone.chain_id && record.status == DepositRecordStatus::DelegationQueue
    });

    for record in queued {
      let id = record.id;
      if let Err(err) = with_storage_layer(|| Self::delegate_deposit(zone, record)) {
        log::error!(target: LOG_TARGET, "delegation of deposit record {} failed: {:?}", id, err);
      }
    }
  }

  fn delegate_deposit(zone: &HostZone<T::AccountId>, mut record: DepositRecord) -> DispatchResult {
    let splits = Self::delegation_splits(zone, record.amount)?;
    let msgs = splits
      .iter()
      .map(|split| HostMsg::Delegate {
        delegator: zone.delegation_ica_address.clone(),
        validator: split.validator.clone(),
        denom: zone.host_denom.clone(),
        amount: split.amount,
      })
      .collect();

    let packet = T::Ica::submit_tx(&zone.chain_id, IcaAccountType::Delegation, msgs, Self::ica_timeout())
      .map_err(|_| Error::<T>::ICATxFailed)?;
    T::Callbacks::register_callback(
      &packet.port_id,
      &packet.channel_id,
      packet.sequence,
      CallbackKind::Delegate,
      DelegateCallback {
        host_zone_id: zone.chain_id.clone(),
        deposit_record_id: record.id,
        splits,
      }
      .encode(),
    )?;

    record.status = DepositRecordStatus::DelegationInProgress;
    record.delegation_txs_in_progress = record.delegation_txs_in_progress.saturating_add(1);
    Self::deposit_event(Event::DelegationSubmitted {
      chain_id: zone.chain_id.clone(),
      deposit_record_id: record.id,
      amount: record.amount,
    });
    Records::<T>::set_deposit_record(record);
    Ok(())
  }

  pub(crate) fn transfer_lsm_deposits(zone: &HostZone<T::AccountId>) {
    for deposit in
      Records::<T>::lsm_deposits_with_status(&zone.chain_id, LsmTokenDepositStatus::DepositPending)
    {
      let result = with_storage_layer(|| {
        Records::<T>::transfer_lsm_token(
          &deposit.chain_id,
          &deposit.denom,
          &zone.deposit_address,
          &zone.delegation_ica_address,
          &zone.transfer_channel_id,
        )
      });
      if let Err(err) = result {
        log::error!(target: LOG_TARGET, "LSM share transfer failed: {:?}", err);
      }
    }
  }

  /// Redeems transferred shares for native stake on the host.
  pub(crate) fn detokenize_lsm_deposits(zone: &HostZone<T::AccountId>) {
    for deposit in Records::<T>::lsm_deposits_with_status(
      &zone.chain_id,
      LsmTokenDepositStatus::DetokenizationQueue,
    ) {
      let result = with_storage_layer(|| -> DispatchResult {
        let msg = HostMsg::RedeemTokensForShares {
          delegator: zone.delegation_ica_address.clone(),
          denom: deposit.denom.clone(),
          amount: deposit.amount,
        };
        let packet = T::Ica::submit_tx(
          &zone.chain_id,
          IcaAccountType::Delegation,
          alloc::vec![msg],
          Self::ica_timeout(),
        )
        .map_err(|_| Error::<T>::ICATxFailed)?;
        T::Callbacks::register_callback(
          &packet.port_id,
          &packet.channel_id,
          packet.sequence,
          CallbackKind::Detokenize,
          DetokenizeCallback { chain_id: deposit.chain_id.clone(), denom: deposit.denom.clone() }
            .encode(),
        )?;
        Records::<T>::update_lsm_deposit_status(
          &deposit.chain_id,
          &deposit.denom,
          LsmTokenDepositStatus::DetokenizationInProgress,
        )
      });
      if let Err(err) = result {
        log::error!(target: LOG_TARGET, "detokenization failed: {:?}", err);
      }
    }
  }
}
