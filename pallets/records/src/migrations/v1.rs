//! Status-field backfill.
//!
//! Version 0 host zone unbondings carried only their totals and status; version 1 adds the
//! in-flight fields (`st_tokens_to_burn`, `native_tokens_to_unbond`, `claimable_native_tokens`,
//! `undelegation_txs_in_progress`). Deposit records gain `delegation_txs_in_progress`.

use crate::{
  Config, DepositRecord, DepositRecordSource, DepositRecordStatus, DepositRecords,
  EpochUnbondingRecord, EpochUnbondingRecords, HostZoneUnbonding, HostZoneUnbondingStatus,
  MaxHostZoneUnbondings, MaxUserRedemptionIds, Pallet, LOG_TARGET,
};
use codec::{Decode, Encode, MaxEncodedLen};
use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  migrations::VersionedMigration,
  traits::{Get, UncheckedOnRuntimeUpgrade},
  weights::Weight,
  BoundedVec,
};
use primitives::{ChainId, Denom, RedemptionId};
use scale_info::TypeInfo;

#[cfg(feature = "try-runtime")]
use alloc::vec::Vec;
#[cfg(feature = "try-runtime")]
use polkadot_sdk::sp_runtime::TryRuntimeError;

/// Version 0 layouts.
pub mod v0 {
  use super::*;

  #[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
  pub struct DepositRecord {
    pub id: u64,
    pub amount: u128,
    pub denom: Denom,
    pub host_zone_id: ChainId,
    pub deposit_epoch_number: u64,
    pub source: DepositRecordSource,
    pub status: DepositRecordStatus,
  }

  #[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
  pub struct HostZoneUnbonding {
    pub host_zone_id: ChainId,
    pub st_token_amount: u128,
    pub native_token_amount: u128,
    pub user_redemption_record_ids: BoundedVec<RedemptionId, MaxUserRedemptionIds>,
    pub status: HostZoneUnbondingStatus,
    pub unbonding_time: u64,
  }

  #[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
  pub struct EpochUnbondingRecord {
    pub epoch_number: u64,
    pub host_zone_unbondings: BoundedVec<HostZoneUnbonding, MaxHostZoneUnbondings>,
  }
}

/// Derives the in-flight fields of a version 0 host zone unbonding from its status.
pub fn backfill_host_zone_unbonding(old: v0::HostZoneUnbonding) -> HostZoneUnbonding {
  let mut cell = HostZoneUnbonding {
    host_zone_id: old.host_zone_id,
    st_token_amount: old.st_token_amount,
    native_token_amount: old.native_token_amount,
    st_tokens_to_burn: 0,
    native_tokens_to_unbond: 0,
    claimable_native_tokens: 0,
    undelegation_txs_in_progress: 0,
    user_redemption_record_ids: old.user_redemption_record_ids,
    status: old.status,
    unbonding_time: old.unbonding_time,
  };
  match cell.status {
    HostZoneUnbondingStatus::UnbondingInProgress => {
      cell.st_tokens_to_burn = cell.st_token_amount;
      cell.native_tokens_to_unbond = cell.native_token_amount;
      cell.undelegation_txs_in_progress = 1;
    },
    HostZoneUnbondingStatus::Claimable => {
      cell.claimable_native_tokens = cell.native_token_amount;
    },
    HostZoneUnbondingStatus::UnbondingQueue
    | HostZoneUnbondingStatus::UnbondingRetryQueue
    | HostZoneUnbondingStatus::ExitTransferQueue
    | HostZoneUnbondingStatus::ExitTransferInProgress => {},
  }
  cell
}

pub fn backfill_deposit_record(old: v0::DepositRecord) -> DepositRecord {
  let delegation_txs_in_progress =
    u64::from(old.status == DepositRecordStatus::DelegationInProgress);
  DepositRecord {
    id: old.id,
    amount: old.amount,
    denom: old.denom,
    host_zone_id: old.host_zone_id,
    deposit_epoch_number: old.deposit_epoch_number,
    source: old.source,
    status: old.status,
    delegation_txs_in_progress,
  }
}

pub struct UncheckedMigrateV0ToV1<T>(PhantomData<T>);

impl<T: Config> UncheckedOnRuntimeUpgrade for UncheckedMigrateV0ToV1<T> {
  fn on_runtime_upgrade() -> Weight {
    let mut translated = 0u64;

    DepositRecords::<T>::translate::<v0::DepositRecord, _>(|_, old| {
      translated = translated.saturating_add(1);
      Some(backfill_deposit_record(old))
    });

    EpochUnbondingRecords::<T>::translate::<v0::EpochUnbondingRecord, _>(|_, old| {
      translated = translated.saturating_add(1);
      let cells: alloc::vec::Vec<HostZoneUnbonding> = old
        .host_zone_unbondings
        .into_iter()
        .map(backfill_host_zone_unbonding)
        .collect();
      Some(EpochUnbondingRecord {
        epoch_number: old.epoch_number,
        host_zone_unbondings: BoundedVec::truncate_from(cells),
      })
    });

    log::info!(target: LOG_TARGET, "backfilled status fields of {} records", translated);
    T::DbWeight::get().reads_writes(translated, translated)
  }

  #[cfg(feature = "try-runtime")]
  fn pre_upgrade() -> Result<Vec<u8>, TryRuntimeError> {
    let counts = (
      DepositRecords::<T>::iter_keys().count() as u64,
      EpochUnbondingRecords::<T>::iter_keys().count() as u64,
    );
    Ok(counts.encode())
  }

  #[cfg(feature = "try-runtime")]
  fn post_upgrade(state: Vec<u8>) -> Result<(), TryRuntimeError> {
    let (deposits, epochs) = <(u64, u64)>::decode(&mut &state[..])
      .map_err(|_| TryRuntimeError::Other("invalid pre-upgrade state"))?;
    ensure_count(DepositRecords::<T>::iter_values().count() as u64, deposits)?;
    ensure_count(EpochUnbondingRecords::<T>::iter_values().count() as u64, epochs)?;
    Pallet::<T>::do_try_state()
  }
}

#[cfg(feature = "try-runtime")]
fn ensure_count(actual: u64, expected: u64) -> Result<(), TryRuntimeError> {
  if actual == expected {
    Ok(())
  } else {
    Err(TryRuntimeError::Other("record lost during status backfill"))
  }
}

/// Runs [`UncheckedMigrateV0ToV1`] once, when the on-chain storage version is 0.
pub type MigrateV0ToV1<T> = VersionedMigration<
  0,
  1,
  UncheckedMigrateV0ToV1<T>,
  Pallet<T>,
  <T as polkadot_sdk::frame_system::Config>::DbWeight,
>;
