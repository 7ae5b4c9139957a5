//! Unbonding pipeline: redemptions, batch undelegation, exit transfers, claims and cleanup.

use crate::{
  ClaimCallback, Config, Error, Event, HostZone, Pallet, RedemptionCallback, SplitDelegation,
  UndelegateCallback, LOG_TARGET,
};
use alloc::vec::Vec;
use codec::Encode;
use pallet_records::{HostZoneUnbonding, HostZoneUnbondingStatus, UserRedemptionRecord};
use polkadot_sdk::{
  frame_support::{ensure, traits::Get},
  sp_runtime::{DispatchError, DispatchResult},
};
use primitives::{
  bounded, epoch_ids::DAY_EPOCH, mul_trunc, ports::TRANSFER_PORT, pro_rata, st_denom,
  timeouts::packet_timeout, AddressCodec, CallbackKind, CallbackRegistry, ChainId, HostMsg,
  IcaAccountType, IcaApi, MsgTransfer, PortId, RemoteAddress, TokenBank, TransferApi,
};

type Records<T> = pallet_records::Pallet<T>;

impl<T: Config> Pallet<T> {
  /// Escrows `amount` stTokens into the current day epoch's batch of `chain_id`.
  pub fn do_redeem_stake(
    redeemer: &T::AccountId,
    amount: u128,
    chain_id: &[u8],
    receiver: &[u8],
  ) -> DispatchResult {
    let zone = Self::get_host_zone(chain_id)?;
    ensure!(!zone.halted, Error::<T>::HostZoneHalted);
    ensure!(zone.redemptions_enabled, Error::<T>::RedemptionsDisabled);

    let mut prefix = zone.bech32_prefix.to_vec();
    prefix.push(b'1');
    ensure!(
      receiver.starts_with(&prefix) && receiver.len() > prefix.len(),
      Error::<T>::InvalidReceiver
    );
    let receiver: RemoteAddress = bounded(receiver).ok_or(Error::<T>::InvalidReceiver)?;

    ensure!(zone.rate_within_bounds(), Error::<T>::RedemptionRateOutOfBounds);
    let native = mul_trunc(zone.redemption_rate, amount).ok_or(Error::<T>::InvalidAmount)?;
    ensure!(native > 0, Error::<T>::InvalidAmount);

    let st_denom = st_denom(&zone.host_denom);
    ensure!(T::Bank::balance(redeemer, &st_denom) >= amount, Error::<T>::InsufficientFunds);

    let epoch_number = Self::current_epoch(DAY_EPOCH).ok_or(Error::<T>::EpochNotStarted)?;
    let record = Records::<T>::get_epoch_unbonding_record(epoch_number)
      .ok_or(pallet_records::Error::<T>::EpochUnbondingRecordNotFound)?;
    let mut cell = record
      .host_zone_unbonding(&zone.chain_id)
      .cloned()
      .unwrap_or_else(|| HostZoneUnbonding::new(zone.chain_id.clone()));
    ensure!(
      cell.status == HostZoneUnbondingStatus::UnbondingQueue,
      Error::<T>::UnbondingNotQueued
    );

    let claimant = T::AddressCodec::encode(redeemer);
    let id = Records::<T>::user_redemption_record_id(&zone.chain_id, epoch_number, &claimant)
      .ok_or(Error::<T>::InvalidReceiver)?;
    let mut user = Records::<T>::get_user_redemption_record(&id).unwrap_or_else(|| {
      UserRedemptionRecord {
        id: id.clone(),
        chain_id: zone.chain_id.clone(),
        epoch_number,
        st_token_amount: 0,
        native_token_amount: 0,
        claimant: redeemer.clone(),
        receiver: receiver.clone(),
        claim_is_pending: false,
      }
    });
    user.st_token_amount =
      user.st_token_amount.checked_add(amount).ok_or(Error::<T>::InternalInvariant)?;
    user.receiver = receiver.clone();

    if !cell.user_redemption_record_ids.contains(&id) {
      cell
        .user_redemption_record_ids
        .try_push(id)
        .map_err(|_| pallet_records::Error::<T>::TooManyUserRedemptions)?;
    }
    cell.st_token_amount =
      cell.st_token_amount.checked_add(amount).ok_or(Error::<T>::InternalInvariant)?;

    T::Bank::transfer(redeemer, &zone.deposit_address, &st_denom, amount)
      .map_err(|_| Error::<T>::InsufficientFunds)?;
    Records::<T>::set_user_redemption_record(user);
    Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;

    Self::deposit_event(Event::RedemptionRequested {
      redeemer: redeemer.clone(),
      chain_id: zone.chain_id,
      epoch_number,
      st_amount: amount,
      receiver,
    });
    Ok(())
  }

  /// Splits an undelegation across validators in proportion to their delegation, or by weight
  /// while nothing is delegated.
  pub(crate) fn undelegation_splits(
    zone: &HostZone<T::AccountId>,
    amount: u128,
  ) -> Result<Vec<SplitDelegation>, DispatchError> {
    if zone.total_delegations == 0 {
      return Self::delegation_splits(zone, amount);
    }
    ensure!(amount <= zone.total_delegations, Error::<T>::InsufficientDelegations);

    let mut splits: Vec<SplitDelegation> = zone
      .validators
      .iter()
      .filter(|v| v.delegation > 0)
      .map(|v| SplitDelegation {
        validator: v.address.clone(),
        amount: pro_rata(amount, v.delegation, zone.total_delegations).unwrap_or_default(),
      })
      .collect();

    let assigned = splits.iter().fold(0u128, |sum, s| sum.saturating_add(s.amount));
    let mut remainder = amount.checked_sub(assigned).ok_or(Error::<T>::InternalInvariant)?;
    for (split, validator) in splits
      .iter_mut()
      .zip(zone.validators.iter().filter(|v| v.delegation > 0))
    {
      let headroom = validator.delegation.saturating_sub(split.amount).min(remainder);
      split.amount = split.amount.saturating_add(headroom);
      remainder = remainder.saturating_sub(headroom);
    }
    splits.retain(|s| s.amount > 0);
    Ok(splits)
  }

  /// Undelegates every queued or retryable batch of `chain_id` in one interchain transaction.
  pub(crate) fn initiate_unbonding(chain_id: &ChainId) -> DispatchResult {
    let zone = Self::get_host_zone(chain_id)?;
    let cells: Vec<(u64, HostZoneUnbonding)> = Records::<T>::host_zone_unbondings_by_status(
      chain_id,
      &[HostZoneUnbondingStatus::UnbondingQueue, HostZoneUnbondingStatus::UnbondingRetryQueue],
    )
    .into_iter()
    .filter(|(_, cell)| {
      cell.st_token_amount > 0 &&
        (cell.status == HostZoneUnbondingStatus::UnbondingQueue || cell.should_retry())
    })
    .collect();
    if cells.is_empty() {
      return Ok(());
    }

    let rate = zone.redemption_rate;
    let mut total_native = 0u128;
    let mut batch = Vec::with_capacity(cells.len());
    for (epoch_number, mut cell) in cells {
      let native = mul_trunc(rate, cell.st_token_amount).ok_or(Error::<T>::InternalInvariant)?;
      for id in cell.user_redemption_record_ids.iter() {
        let mut user = Records::<T>::get_user_redemption_record(id)
          .ok_or(pallet_records::Error::<T>::UserRedemptionRecordNotFound)?;
        user.native_token_amount =
          mul_trunc(rate, user.st_token_amount).ok_or(Error::<T>::InternalInvariant)?;
        Records::<T>::set_user_redemption_record(user);
      }
      cell.native_token_amount = native;
      cell.st_tokens_to_burn = cell.st_token_amount;
      cell.native_tokens_to_unbond = native;
      cell.claimable_native_tokens = 0;
      total_native = total_native.checked_add(native).ok_or(Error::<T>::InternalInvariant)?;
      batch.push((epoch_number, cell));
    }
    if total_native == 0 {
      log::warn!(target: LOG_TARGET, "batch of {:?} is worth no native tokens", chain_id);
      return Ok(());
    }

    let splits = Self::undelegation_splits(&zone, total_native)?;
    let msgs = splits
      .iter()
      .map(|split| HostMsg::Undelegate {
        delegator: zone.delegation_ica_address.clone(),
        validator: split.validator.clone(),
        denom: zone.host_denom.clone(),
        amount: split.amount,
      })
      .collect();
    let packet =
      T::Ica::submit_tx(chain_id, IcaAccountType::Delegation, msgs, Self::ica_timeout())
        .map_err(|_| Error::<T>::ICATxFailed)?;

    let epoch_numbers: Vec<u64> = batch.iter().map(|(epoch, _)| *epoch).collect();
    T::Callbacks::register_callback(
      &packet.port_id,
      &packet.channel_id,
      packet.sequence,
      CallbackKind::Undelegate,
      UndelegateCallback { host_zone_id: chain_id.clone(), epoch_numbers: epoch_numbers.clone(), splits }
        .encode(),
    )?;

    for (epoch_number, mut cell) in batch {
      cell.status = HostZoneUnbondingStatus::UnbondingInProgress;
      cell.undelegation_txs_in_progress = cell.undelegation_txs_in_progress.saturating_add(1);
      Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;
    }

    log::info!(
      target: LOG_TARGET,
      "undelegating {} from {:?} for epochs {:?}",
      total_native,
      chain_id,
      epoch_numbers
    );
    Self::deposit_event(Event::UnbondingSubmitted {
      chain_id: chain_id.clone(),
      epoch_numbers,
      native_amount: total_native,
    });
    Ok(())
  }

  /// Transfers matured undelegations from the redemption account back to the deposit address.
  pub(crate) fn sweep_unbonded_tokens(chain_id: &ChainId) -> DispatchResult {
    let zone = Self::get_host_zone(chain_id)?;
    let now = Self::now_secs();

    let matured = Records::<T>::host_zone_unbondings_by_status(
      chain_id,
      &[HostZoneUnbondingStatus::UnbondingInProgress, HostZoneUnbondingStatus::ExitTransferQueue],
    )
    .into_iter()
    .filter(|(_, cell)| {
      cell.status == HostZoneUnbondingStatus::ExitTransferQueue ||
        (cell.undelegation_txs_in_progress == 0 &&
          cell.st_tokens_to_burn == 0 &&
          cell.unbonding_time > 0 &&
          cell.unbonding_time <= now)
    })
    .collect::<Vec<_>>();
    if matured.is_empty() {
      return Ok(());
    }

    let total = matured.iter().try_fold(0u128, |sum, (_, cell)| {
      sum.checked_add(cell.native_tokens_to_unbond).ok_or(Error::<T>::InternalInvariant)
    })?;
    if total == 0 {
      for (epoch_number, mut cell) in matured {
        cell.status = HostZoneUnbondingStatus::Claimable;
        Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;
      }
      return Ok(());
    }

    let port_id: PortId = bounded(TRANSFER_PORT).ok_or(Error::<T>::InternalInvariant)?;
    let msg = HostMsg::Transfer {
      source_port: port_id,
      source_channel: zone.transfer_channel_id.clone(),
      denom: zone.host_denom.clone(),
      amount: total,
      sender: zone.redemption_ica_address.clone(),
      receiver: T::AddressCodec::encode(&zone.deposit_address),
      timeout_timestamp: Self::ica_timeout(),
    };
    let packet =
      T::Ica::submit_tx(chain_id, IcaAccountType::Redemption, alloc::vec![msg], Self::ica_timeout())
        .map_err(|_| Error::<T>::ICATxFailed)?;

    let epoch_numbers: Vec<u64> = matured.iter().map(|(epoch, _)| *epoch).collect();
    T::Callbacks::register_callback(
      &packet.port_id,
      &packet.channel_id,
      packet.sequence,
      CallbackKind::Redemption,
      RedemptionCallback { host_zone_id: chain_id.clone(), epoch_numbers: epoch_numbers.clone() }
        .encode(),
    )?;

    for (epoch_number, mut cell) in matured {
      cell.status = HostZoneUnbondingStatus::ExitTransferInProgress;
      Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;
    }

    Self::deposit_event(Event::ExitTransferSubmitted {
      chain_id: chain_id.clone(),
      epoch_numbers,
      native_amount: total,
    });
    Ok(())
  }

  /// Pays a claimable redemption out to the user's receiver on the host.
  pub fn do_claim_undelegated_tokens(
    chain_id: &[u8],
    epoch_number: u64,
    claimant: &T::AccountId,
  ) -> DispatchResult {
    let zone = Self::get_host_zone(chain_id)?;
    let id = Records::<T>::user_redemption_record_id(
      chain_id,
      epoch_number,
      &T::AddressCodec::encode(claimant),
    )
    .ok_or(pallet_records::Error::<T>::UserRedemptionRecordNotFound)?;
    let mut user = Records::<T>::get_user_redemption_record(&id)
      .ok_or(pallet_records::Error::<T>::UserRedemptionRecordNotFound)?;
    let mut cell = Records::<T>::get_host_zone_unbonding(epoch_number, chain_id)
      .ok_or(pallet_records::Error::<T>::HostZoneUnbondingNotFound)?;

    ensure!(cell.status == HostZoneUnbondingStatus::Claimable, Error::<T>::ClaimNotReady);
    ensure!(!user.claim_is_pending, Error::<T>::ClaimPending);
    cell.claimable_native_tokens =
      Records::<T>::checked_sub(cell.claimable_native_tokens, user.native_token_amount)?;

    let msg = MsgTransfer {
      source_port: TRANSFER_PORT.to_vec(),
      source_channel: zone.transfer_channel_id.to_vec(),
      denom: zone.ibc_denom.to_vec(),
      amount: user.native_token_amount,
      sender: zone.deposit_address.clone(),
      receiver: user.receiver.to_vec(),
      timeout_timestamp: packet_timeout(
        Self::now_secs(),
        <T as pallet_records::Config>::TransferTimeout::get(),
      ),
      memo: Vec::new(),
    };
    let sequence = T::Transfers::transfer(msg).map_err(|_| Error::<T>::IBCTransferFailed)?;
    T::Callbacks::register_callback(
      TRANSFER_PORT,
      &zone.transfer_channel_id,
      sequence,
      CallbackKind::Claim,
      ClaimCallback {
        user_redemption_record_id: id,
        chain_id: zone.chain_id.clone(),
        epoch_number,
      }
      .encode(),
    )?;

    let amount = user.native_token_amount;
    user.claim_is_pending = true;
    Records::<T>::set_user_redemption_record(user);
    Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;

    Self::deposit_event(Event::ClaimSubmitted {
      claimant: claimant.clone(),
      chain_id: zone.chain_id,
      epoch_number,
      amount,
    });
    Ok(())
  }

  /// Puts undelegations whose packet timed out back into the retry queue.
  pub(crate) fn do_restore_unbonding_records(chain_id: &ChainId) -> DispatchResult {
    Self::get_host_zone(chain_id)?;
    let mut epoch_numbers = Vec::new();
    for (epoch_number, mut cell) in Records::<T>::host_zone_unbondings_by_status(
      chain_id,
      &[HostZoneUnbondingStatus::UnbondingInProgress],
    ) {
      if cell.undelegation_txs_in_progress == 0 && cell.st_tokens_to_burn > 0 {
        cell.status = HostZoneUnbondingStatus::UnbondingRetryQueue;
        Records::<T>::set_host_zone_unbonding(epoch_number, cell)?;
        epoch_numbers.push(epoch_number);
      }
    }
    Self::deposit_event(Event::UnbondingRecordsRestored {
      chain_id: chain_id.clone(),
      epoch_numbers,
    });
    Ok(())
  }

  /// Removes records of past epochs with nothing left to unbond or claim.
  pub(crate) fn cleanup_epoch_unbonding_records(current_epoch: u64) {
    for record in Records::<T>::all_epoch_unbonding_records() {
      if record.epoch_number >= current_epoch {
        continue;
      }
      if record.host_zone_unbondings.iter().all(HostZoneUnbonding::is_drained) {
        Records::<T>::remove_epoch_unbonding_record(record.epoch_number);
        Self::deposit_event(Event::EpochUnbondingRecordRemoved {
          epoch_number: record.epoch_number,
        });
      }
    }
  }
}
