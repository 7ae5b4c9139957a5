//! Host zones gain the `redemptions_enabled` switch, on by default.

use super::v0::HostZoneV0;
use crate::{Config, HostZones, Pallet, LOG_TARGET};
use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  migrations::VersionedMigration,
  traits::{Get, UncheckedOnRuntimeUpgrade},
  weights::Weight,
};

#[cfg(feature = "try-runtime")]
use alloc::vec::Vec;
#[cfg(feature = "try-runtime")]
use codec::{Decode, Encode};
#[cfg(feature = "try-runtime")]
use polkadot_sdk::sp_runtime::TryRuntimeError;

pub struct UncheckedMigrateV1ToV2<T>(PhantomData<T>);

impl<T: Config> UncheckedOnRuntimeUpgrade for UncheckedMigrateV1ToV2<T> {
  fn on_runtime_upgrade() -> Weight {
    let mut translated = 0u64;
    HostZones::<T>::translate::<HostZoneV0<T::AccountId>, _>(|_, old| {
      translated = translated.saturating_add(1);
      Some(old.upgrade(true))
    });
    log::info!(target: LOG_TARGET, "enabled redemptions on {} host zones", translated);
    T::DbWeight::get().reads_writes(translated, translated)
  }

  #[cfg(feature = "try-runtime")]
  fn pre_upgrade() -> Result<Vec<u8>, TryRuntimeError> {
    Ok((HostZones::<T>::iter_keys().count() as u64).encode())
  }

  #[cfg(feature = "try-runtime")]
  fn post_upgrade(state: Vec<u8>) -> Result<(), TryRuntimeError> {
    let zones = u64::decode(&mut &state[..])
      .map_err(|_| TryRuntimeError::Other("invalid pre-upgrade state"))?;
    let upgraded = HostZones::<T>::iter_values().filter(|zone| zone.redemptions_enabled).count();
    if upgraded as u64 != zones {
      return Err(TryRuntimeError::Other("host zone lost or left disabled"));
    }
    Pallet::<T>::do_try_state().map_err(Into::into)
  }
}

/// Runs [`UncheckedMigrateV1ToV2`] once, when the on-chain storage version is 1.
pub type MigrateV1ToV2<T> = VersionedMigration<
  1,
  2,
  UncheckedMigrateV1ToV2<T>,
  Pallet<T>,
  <T as polkadot_sdk::frame_system::Config>::DbWeight,
>;
