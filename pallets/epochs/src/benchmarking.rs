use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::EnsureOrigin;
use polkadot_sdk::frame_system;
use primitives::{bounded, EpochIdentifier};

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn add_epoch() {
    let identifier: EpochIdentifier = bounded(b"week").expect("identifier fits");
    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    add_epoch(origin as T::RuntimeOrigin, identifier.clone(), 0, 604_800);

    assert!(EpochInfos::<T>::contains_key(&identifier));
  }

  #[benchmark]
  fn epoch_transition() {
    let identifier: EpochIdentifier = bounded(b"week").expect("identifier fits");
    let mut info = EpochInfo::new(identifier.clone(), 0, 604_800);
    info.epoch_counting_started = true;
    info.current_epoch = 1;
    EpochInfos::<T>::insert(&identifier, &info);
    let block_number = frame_system::Pallet::<T>::block_number();
    let crossed;

    #[block]
    {
      crossed = Pallet::<T>::tick(info, 604_801, block_number);
    }

    assert!(crossed);
    assert_eq!(EpochInfos::<T>::get(&identifier).map(|info| info.current_epoch), Some(2));
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
