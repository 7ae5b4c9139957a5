use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::EnsureOrigin;

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn set_params() {
    let origin = T::AdminOrigin::try_successful_origin()
      .expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    set_params(origin as T::RuntimeOrigin, true, false);

    assert_eq!(Params::<T>::get(), AutopilotParams { stakeibc_active: true, claim_active: false });
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
