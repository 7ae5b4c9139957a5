//! Redemption-rate bound widening and exit-transfer backfill.
//!
//! Every host zone gets bounds of `rate × (1 − 5%)` and `rate × (1 + 10%)`, with 12% of
//! headroom for `osmosis-1`. Host zone unbondings waiting in the exit-transfer queue are
//! re-priced: each user record's native amount is recomputed from its stTokens at the
//! historical rate of the batch's epoch. Epochs missing from the table are priced at the
//! midpoint of the rate when the change was proposed and the rate at upgrade time.

use super::v0::{self, HostZoneV0};
use crate::{Config, Pallet, LOG_TARGET};
use alloc::collections::BTreeMap;
use core::marker::PhantomData;
use pallet_records::HostZoneUnbondingStatus;
use polkadot_sdk::frame_support::{
  migrations::VersionedMigration,
  traits::{Get, UncheckedOnRuntimeUpgrade},
  weights::Weight,
};
use polkadot_sdk::sp_runtime::traits::Saturating;
use primitives::{dec_midpoint, mul_trunc, parse_dec, ChainId, Dec};

#[cfg(feature = "try-runtime")]
use alloc::vec::Vec;
#[cfg(feature = "try-runtime")]
use codec::{Decode, Encode};
#[cfg(feature = "try-runtime")]
use polkadot_sdk::sp_runtime::TryRuntimeError;

type Records<T> = pallet_records::Pallet<T>;

const MIN_BOUND_ADJUSTMENT: Dec = Dec::from_rational(5, 100);
const MAX_BOUND_ADJUSTMENT: Dec = Dec::from_rational(10, 100);
const OSMOSIS_MAX_BOUND_ADJUSTMENT: Dec = Dec::from_rational(12, 100);
const OSMOSIS_CHAIN_ID: &[u8] = b"osmosis-1";

/// Redemption rate of each host zone when the backfill was proposed.
const RATES_AT_PROP: &[(&str, &str)] = &[
  ("comdex-1", "1.204883527965105396"),
  ("cosmoshub-4", "1.299886984330871277"),
  ("evmos_9001-2", "1.492732862363044751"),
  ("injective-1", "1.216027814303310584"),
  ("juno-1", "1.418690442281976982"),
  ("osmosis-1", "1.201662502920632779"),
  ("phoenix-1", "1.178584742254853106"),
  ("sommelier-3", "1.025900897761638723"),
  ("stargaze-1", "1.430486928659223287"),
  ("umee-1", "1.128892781103330908"),
];

/// Redemption rates observed before the proposal, by chain and day epoch.
const HISTORICAL_RATES: &[(&str, &[u64], &str)] = &[
  ("juno-1", &[495, 496, 497], "1.412164551270598"),
  ("juno-1", &[500, 501, 503, 504], "1.4161495546072012"),
  ("juno-1", &[505, 507, 508], "1.417724248601981"),
  ("phoenix-1", &[496, 498, 499], "1.1740619020285001"),
  ("phoenix-1", &[500, 503], "1.1757224643748854"),
  ("phoenix-1", &[504, 505, 506, 507], "1.176553937681711"),
  ("sommelier-3", &[495, 496, 497, 499], "1.0241481197817144"),
  ("sommelier-3", &[501, 502, 503, 504], "1.025236900070852"),
  ("sommelier-3", &[505, 507, 508, 509], "1.0259008616651284"),
  ("cosmoshub-4", &[496, 497, 498, 499], "1.2938404518607025"),
  ("cosmoshub-4", &[500, 501, 502, 503], "1.2957672912922817"),
  ("cosmoshub-4", &[504, 505, 506, 507], "1.296926394723948"),
  ("comdex-1", &[496, 497, 498, 499], "1.1963306878344375"),
  ("comdex-1", &[500, 501, 502, 503], "1.1994537074221134"),
  ("comdex-1", &[504, 505, 506, 507], "1.2019746297343605"),
  ("evmos_9001-2", &[499, 500], "1.4895991845634247"),
  ("evmos_9001-2", &[501, 502, 503], "1.490098715761824"),
  ("evmos_9001-2", &[504, 505], "1.4910458236916064"),
  ("evmos_9001-2", &[507, 508], "1.4918520366929944"),
  ("osmosis-1", &[498, 499, 500], "1.1984190041836773"),
  ("osmosis-1", &[501, 502, 503], "1.1991174772238702"),
  ("osmosis-1", &[504, 505, 506], "1.2003177583397713"),
  ("osmosis-1", &[507, 508, 509], "1.2011986371246357"),
  ("stargaze-1", &[498, 499, 500], "1.4246347073913794"),
  ("stargaze-1", &[501, 502, 503], "1.4267297754925006"),
  ("stargaze-1", &[504, 505, 506], "1.4279528400269015"),
  ("stargaze-1", &[507, 508, 509], "1.430136789416802"),
  ("umee-1", &[505], "1.1266406527137283"),
  ("injective-1", &[464], "1.10904028152176"),
  ("injective-1", &[465], "1.1092232046811195"),
  ("injective-1", &[466], "1.1094104738505122"),
  ("injective-1", &[467], "1.109660102119856"),
  ("injective-1", &[468], "1.1099206471560683"),
  ("injective-1", &[469], "1.1101781888690843"),
  ("injective-1", &[470], "1.1104928343163862"),
  ("injective-1", &[471], "1.1106814727683936"),
  ("injective-1", &[472], "1.1109147705303473"),
  ("injective-1", &[473], "1.1111483631454906"),
  ("injective-1", &[474], "1.1113789833325327"),
  ("injective-1", &[475], "1.1115865207841595"),
  ("injective-1", &[476], "1.1118256565192843"),
  ("injective-1", &[477], "1.112062977242558"),
  ("injective-1", &[478], "1.112305089405149"),
  ("injective-1", &[479], "1.1125496812740654"),
  ("injective-1", &[480], "1.112796928321449"),
  ("injective-1", &[481], "1.113045979582398"),
  ("injective-1", &[482], "1.1133578645679472"),
  ("injective-1", &[483], "1.1135463131500978"),
  ("injective-1", &[484], "1.113862639530537"),
  ("injective-1", &[485], "1.1140510045259582"),
  ("injective-1", &[486], "1.114295573398525"),
  ("injective-1", &[487], "1.1145990588175787"),
  ("injective-1", &[488], "1.114779498371232"),
  ("injective-1", &[489], "1.1150839991290917"),
  ("injective-1", &[498], "1.1170896901082266"),
  ("injective-1", &[499], "1.1498981693771557"),
  ("injective-1", &[500], "1.209508137205966"),
  ("injective-1", &[501], "1.209985009275008"),
  ("injective-1", &[502], "1.210478332327813"),
  ("injective-1", &[503], "1.2109676716098068"),
  ("injective-1", &[504], "1.2130924701151315"),
  ("injective-1", &[505], "1.2136053525521355"),
  ("injective-1", &[507], "1.21455566769327"),
];

/// `(min, max)` redemption-rate bounds around `rate`.
pub fn widened_bounds(chain_id: &[u8], rate: Dec) -> (Dec, Dec) {
  let max_adjustment = if chain_id == OSMOSIS_CHAIN_ID {
    OSMOSIS_MAX_BOUND_ADJUSTMENT
  } else {
    MAX_BOUND_ADJUSTMENT
  };
  let min = rate.saturating_sub(rate.saturating_mul(MIN_BOUND_ADJUSTMENT));
  let max = rate.saturating_add(rate.saturating_mul(max_adjustment));
  (min, max)
}

pub fn rate_at_prop(chain_id: &[u8]) -> Option<Dec> {
  RATES_AT_PROP
    .iter()
    .find(|(chain, _)| chain.as_bytes() == chain_id)
    .and_then(|(_, rate)| parse_dec(rate))
}

pub fn historical_rate(chain_id: &[u8], epoch_number: u64) -> Option<Dec> {
  HISTORICAL_RATES
    .iter()
    .find(|(chain, epochs, _)| chain.as_bytes() == chain_id && epochs.contains(&epoch_number))
    .and_then(|(_, _, rate)| parse_dec(rate))
}

/// Rate an exit-transfer batch of `epoch_number` is re-priced at.
pub fn backfill_rate(chain_id: &[u8], epoch_number: u64, rate_at_upgrade: Dec) -> Option<Dec> {
  historical_rate(chain_id, epoch_number)
    .or_else(|| rate_at_prop(chain_id).map(|at_prop| dec_midpoint(at_prop, rate_at_upgrade)))
}

pub struct UncheckedMigrateV0ToV1<T>(PhantomData<T>);

impl<T: Config> UncheckedMigrateV0ToV1<T> {
  /// Widens the bounds of every host zone, returning the rates at upgrade time.
  fn widen_bounds() -> (BTreeMap<ChainId, Dec>, u64) {
    let mut rates = BTreeMap::new();
    let mut translated = 0u64;
    v0::HostZones::<T>::translate::<HostZoneV0<T::AccountId>, _>(|chain_id, mut zone| {
      translated = translated.saturating_add(1);
      let (min, max) = widened_bounds(&chain_id, zone.redemption_rate);
      zone.min_redemption_rate = min;
      zone.max_redemption_rate = max;
      rates.insert(chain_id, zone.redemption_rate);
      Some(zone)
    });
    (rates, translated)
  }

  /// Re-prices exit-transfer batches, returning the number of records read and written.
  fn backfill_exit_transfers(rates: &BTreeMap<ChainId, Dec>) -> (u64, u64) {
    let (mut reads, mut writes) = (0u64, 0u64);
    for mut record in Records::<T>::all_epoch_unbonding_records() {
      reads = reads.saturating_add(1);
      let epoch_number = record.epoch_number;
      let mut changed = false;

      for cell in record.host_zone_unbondings.iter_mut() {
        if cell.status != HostZoneUnbondingStatus::ExitTransferQueue {
          continue;
        }
        let rate = rates
          .get(&cell.host_zone_id)
          .and_then(|at_upgrade| backfill_rate(&cell.host_zone_id, epoch_number, *at_upgrade));
        let Some(rate) = rate else {
          log::warn!(
            target: LOG_TARGET,
            "no backfill rate for {:?} in epoch {}, leaving it untouched",
            cell.host_zone_id,
            epoch_number
          );
          continue;
        };
        let Some(native) = mul_trunc(rate, cell.st_token_amount) else {
          polkadot_sdk::frame_support::defensive!("stakeibc: backfilled batch overflows");
          continue;
        };

        for id in &cell.user_redemption_record_ids {
          reads = reads.saturating_add(1);
          let Some(mut user) = Records::<T>::get_user_redemption_record(id) else {
            continue;
          };
          if let Some(user_native) = mul_trunc(rate, user.st_token_amount) {
            user.native_token_amount = user_native;
            Records::<T>::set_user_redemption_record(user);
            writes = writes.saturating_add(1);
          }
        }
        cell.native_token_amount = native;
        cell.native_tokens_to_unbond = native;
        changed = true;
      }

      if changed {
        Records::<T>::set_epoch_unbonding_record(record);
        writes = writes.saturating_add(1);
      }
    }
    (reads, writes)
  }
}

impl<T: Config> UncheckedOnRuntimeUpgrade for UncheckedMigrateV0ToV1<T> {
  fn on_runtime_upgrade() -> Weight {
    let (rates, zones) = Self::widen_bounds();
    let (reads, writes) = Self::backfill_exit_transfers(&rates);
    log::info!(
      target: LOG_TARGET,
      "widened bounds of {} host zones, backfilled {} records",
      zones,
      writes
    );
    T::DbWeight::get().reads_writes(zones.saturating_add(reads), zones.saturating_add(writes))
  }

  #[cfg(feature = "try-runtime")]
  fn pre_upgrade() -> Result<Vec<u8>, TryRuntimeError> {
    Ok((v0::HostZones::<T>::iter_keys().count() as u64).encode())
  }

  #[cfg(feature = "try-runtime")]
  fn post_upgrade(state: Vec<u8>) -> Result<(), TryRuntimeError> {
    let zones = u64::decode(&mut &state[..])
      .map_err(|_| TryRuntimeError::Other("invalid pre-upgrade state"))?;
    let mut after = 0u64;
    for zone in v0::HostZones::<T>::iter_values() {
      after = after.saturating_add(1);
      if zone.min_redemption_rate > zone.redemption_rate ||
        zone.max_redemption_rate < zone.redemption_rate
      {
        return Err(TryRuntimeError::Other("redemption rate outside widened bounds"));
      }
    }
    if after != zones {
      return Err(TryRuntimeError::Other("host zone lost during bound widening"));
    }
    Ok(())
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
