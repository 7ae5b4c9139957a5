//! Epoch boundaries drive both pipelines.

use crate::{Config, EpochTrackers, HostZones, Pallet, LOG_TARGET};
use polkadot_sdk::{frame_support::storage::with_storage_layer, sp_runtime::DispatchResult};
use primitives::{
  bounded,
  epoch_ids::{DAY_EPOCH, STRIDE_EPOCH},
  EpochHooks, EpochIdentifier,
};

impl<T: Config> EpochHooks for Pallet<T> {
  fn before_epoch_start(identifier: &[u8], epoch_number: u64) -> DispatchResult {
    let key: Option<EpochIdentifier> = bounded(identifier);
    if let Some(key) = key {
      EpochTrackers::<T>::insert(key, epoch_number);
    }

    match identifier {
      DAY_EPOCH => Self::process_unbonding_epoch(epoch_number),
      STRIDE_EPOCH => Self::process_deposit_epoch(epoch_number),
      _ => {},
    }
    Ok(())
  }

  fn after_epoch_end(_identifier: &[u8], _epoch_number: u64) -> DispatchResult {
    Ok(())
  }
}

impl<T: Config> Pallet<T> {
  /// Submits queued batches, sweeps matured undelegations, prunes drained records and opens
  /// the record of `epoch_number`.
  pub(crate) fn process_unbonding_epoch(epoch_number: u64) {
    for zone in HostZones::<T>::iter_values() {
      if zone.halted {
        continue;
      }
      if let Err(err) = with_storage_layer(|| Self::initiate_unbonding(&zone.chain_id)) {
        log::error!(
          target: LOG_TARGET,
          "unbonding submission for {:?} failed: {:?}",
          zone.chain_id,
          err
        );
      }
      if let Err(err) = with_storage_layer(|| Self::sweep_unbonded_tokens(&zone.chain_id)) {
        log::error!(target: LOG_TARGET, "exit transfer for {:?} failed: {:?}", zone.chain_id, err);
      }
    }
    Self::cleanup_epoch_unbonding_records(epoch_number);
    pallet_records::Pallet::<T>::create_epoch_unbonding_record(epoch_number);
  }

  /// Moves deposits of past epochs to the host, delegates what arrived and advances the
  /// LSM deposits.
  pub(crate) fn process_deposit_epoch(epoch_number: u64) {
    for zone in HostZones::<T>::iter_values() {
      if zone.halted {
        continue;
      }
      Self::transfer_deposits(&zone, epoch_number);
      Self::delegate_deposits(&zone);
      Self::transfer_lsm_deposits(&zone);
      Self::detokenize_lsm_deposits(&zone);
    }
  }
}
