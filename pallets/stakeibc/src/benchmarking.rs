use crate::*;
use alloc::vec;
use pallet_records::{EpochUnbondingRecord, HostZoneUnbonding, HostZoneUnbondingStatus};
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::{traits::EnsureOrigin, BoundedVec};
use polkadot_sdk::frame_system::RawOrigin;
use primitives::{
  bounded,
  epoch_ids::{DAY_EPOCH, STRIDE_EPOCH},
  st_denom, AddressCodec, ChainId, Dec, Denom, EpochIdentifier, TokenBank,
};

const CHAIN: &[u8] = b"cosmoshub-4";

fn host_zone_config() -> HostZoneConfig {
  HostZoneConfig {
    chain_id: CHAIN.to_vec(),
    host_denom: b"uatom".to_vec(),
    ibc_denom: b"ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2".to_vec(),
    transfer_channel_id: b"channel-0".to_vec(),
    connection_id: b"connection-0".to_vec(),
    bech32_prefix: b"cosmos".to_vec(),
    delegation_ica_address: b"cosmos1delegation".to_vec(),
    redemption_ica_address: b"cosmos1redemption".to_vec(),
    validators: vec![(b"cosmosvaloper1a".to_vec(), 1), (b"cosmosvaloper1b".to_vec(), 1)],
    unbonding_period_seconds: 21 * 24 * 60 * 60,
  }
}

fn chain_id() -> ChainId {
  bounded(CHAIN).expect("chain id fits")
}

fn setup_host_zone<T: Config>() -> HostZone<T::AccountId> {
  Pallet::<T>::do_register_host_zone(host_zone_config()).expect("host zone registers");
  Pallet::<T>::get_host_zone(CHAIN).expect("host zone registered")
}

fn start_epoch<T: Config>(identifier: &[u8], epoch_number: u64) {
  let key: EpochIdentifier = bounded(identifier).expect("identifier fits");
  EpochTrackers::<T>::insert(key, epoch_number);
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn register_host_zone() {
    let origin = T::OperatorOrigin::try_successful_origin()
      .expect("OperatorOrigin must have a successful origin");

    #[extrinsic_call]
    register_host_zone(origin as T::RuntimeOrigin, host_zone_config());

    assert!(HostZones::<T>::contains_key(chain_id()));
  }

  #[benchmark]
  fn liquid_stake() {
    let zone = setup_host_zone::<T>();
    start_epoch::<T>(STRIDE_EPOCH, 1);
    let caller: T::AccountId = whitelisted_caller();
    T::Bank::mint(&caller, &zone.ibc_denom, 1_000_000).expect("mint succeeds");

    #[extrinsic_call]
    liquid_stake(RawOrigin::Signed(caller.clone()), 1_000_000, zone.host_denom.to_vec());

    assert_eq!(T::Bank::balance(&caller, &st_denom(&zone.host_denom)), 1_000_000);
  }

  #[benchmark]
  fn redeem_stake() {
    let zone = setup_host_zone::<T>();
    start_epoch::<T>(DAY_EPOCH, 1);
    pallet_records::Pallet::<T>::create_epoch_unbonding_record(1);
    let caller: T::AccountId = whitelisted_caller();
    T::Bank::mint(&caller, &st_denom(&zone.host_denom), 1_000_000).expect("mint succeeds");

    #[extrinsic_call]
    redeem_stake(
      RawOrigin::Signed(caller.clone()),
      1_000_000,
      chain_id(),
      bounded(b"cosmos1receiver").expect("receiver fits"),
    );

    let cell = pallet_records::Pallet::<T>::get_host_zone_unbonding(1, CHAIN).expect("cell created");
    assert_eq!(cell.st_token_amount, 1_000_000);
  }

  #[benchmark]
  fn claim_undelegated_tokens() {
    let zone = setup_host_zone::<T>();
    start_epoch::<T>(DAY_EPOCH, 1);
    pallet_records::Pallet::<T>::create_epoch_unbonding_record(1);
    let caller: T::AccountId = whitelisted_caller();
    T::Bank::mint(&caller, &st_denom(&zone.host_denom), 1_000_000).expect("mint succeeds");
    Pallet::<T>::do_redeem_stake(&caller, 1_000_000, CHAIN, b"cosmos1receiver")
      .expect("redeem succeeds");

    let claimant = <T as Config>::AddressCodec::encode(&caller);
    let id = pallet_records::Pallet::<T>::user_redemption_record_id(CHAIN, 1, &claimant)
      .expect("id fits");
    let mut user =
      pallet_records::Pallet::<T>::get_user_redemption_record(&id).expect("user record created");
    user.native_token_amount = 1_000_000;
    pallet_records::Pallet::<T>::set_user_redemption_record(user);
    let mut cell = pallet_records::Pallet::<T>::get_host_zone_unbonding(1, CHAIN).expect("cell created");
    cell.native_token_amount = 1_000_000;
    cell.claimable_native_tokens = 1_000_000;
    cell.status = HostZoneUnbondingStatus::Claimable;
    pallet_records::Pallet::<T>::set_host_zone_unbonding(1, cell).expect("cell stored");

    #[extrinsic_call]
    claim_undelegated_tokens(RawOrigin::Signed(caller.clone()), chain_id(), 1, caller.clone());

    let user = pallet_records::Pallet::<T>::get_user_redemption_record(&id).expect("user record kept");
    assert!(user.claim_is_pending);
  }

  #[benchmark]
  fn lsm_liquid_stake() {
    let zone = setup_host_zone::<T>();
    let lsm_ibc_denom = b"ibc/LSMSHARE".to_vec();
    T::BenchmarkHelper::register_denom_trace(
      &lsm_ibc_denom,
      b"transfer/channel-0",
      b"cosmosvaloper1a/42",
    );
    let caller: T::AccountId = whitelisted_caller();
    T::Bank::mint(&caller, &lsm_ibc_denom, 1_000_000).expect("mint succeeds");

    #[extrinsic_call]
    lsm_liquid_stake(RawOrigin::Signed(caller.clone()), 1_000_000, lsm_ibc_denom.clone());

    let denom: Denom = bounded(b"cosmosvaloper1a/42").expect("denom fits");
    assert!(pallet_records::Pallet::<T>::get_lsm_deposit(&chain_id(), &denom).is_some());
    assert_eq!(T::Bank::balance(&caller, &st_denom(&zone.host_denom)), 1_000_000);
  }

  #[benchmark]
  fn update_redemption_rate() {
    setup_host_zone::<T>();
    let origin = T::OperatorOrigin::try_successful_origin()
      .expect("OperatorOrigin must have a successful origin");
    let rate = Dec::from_rational(11, 10);

    #[extrinsic_call]
    update_redemption_rate(origin as T::RuntimeOrigin, chain_id(), rate);

    assert_eq!(Pallet::<T>::get_host_zone(CHAIN).expect("zone").redemption_rate, rate);
  }

  #[benchmark]
  fn resume_host_zone() {
    setup_host_zone::<T>();
    HostZones::<T>::mutate(chain_id(), |zone| {
      if let Some(zone) = zone {
        zone.halted = true;
      }
    });
    let origin = T::OperatorOrigin::try_successful_origin()
      .expect("OperatorOrigin must have a successful origin");

    #[extrinsic_call]
    resume_host_zone(origin as T::RuntimeOrigin, chain_id());

    assert!(!Pallet::<T>::get_host_zone(CHAIN).expect("zone").halted);
  }

  #[benchmark]
  fn set_redemptions_enabled() {
    setup_host_zone::<T>();
    let origin = T::OperatorOrigin::try_successful_origin()
      .expect("OperatorOrigin must have a successful origin");

    #[extrinsic_call]
    set_redemptions_enabled(origin as T::RuntimeOrigin, chain_id(), false);

    assert!(!Pallet::<T>::get_host_zone(CHAIN).expect("zone").redemptions_enabled);
  }

  #[benchmark]
  fn restore_unbonding_records() {
    setup_host_zone::<T>();
    let cells = (0..8u64)
      .map(|epoch| {
        let mut cell = HostZoneUnbonding::new(chain_id());
        cell.st_token_amount = 1_000;
        cell.native_token_amount = 1_000;
        cell.st_tokens_to_burn = 1_000;
        cell.native_tokens_to_unbond = 1_000;
        cell.status = HostZoneUnbondingStatus::UnbondingInProgress;
        EpochUnbondingRecord {
          epoch_number: epoch,
          host_zone_unbondings: BoundedVec::truncate_from(vec![cell]),
        }
      })
      .collect::<alloc::vec::Vec<_>>();
    for record in cells {
      pallet_records::Pallet::<T>::set_epoch_unbonding_record(record);
    }
    let origin = T::OperatorOrigin::try_successful_origin()
      .expect("OperatorOrigin must have a successful origin");

    #[extrinsic_call]
    restore_unbonding_records(origin as T::RuntimeOrigin, chain_id());

    let cell = pallet_records::Pallet::<T>::get_host_zone_unbonding(0, CHAIN).expect("cell kept");
    assert_eq!(cell.status, HostZoneUnbondingStatus::UnbondingRetryQueue);
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
