use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::EnsureOrigin;
use primitives::{bounded, ChainId, Coin, Denom};

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn reset_lsm_token_deposit() {
    let chain_id: ChainId = bounded(b"cosmoshub-4").expect("chain id fits");
    let denom: Denom = bounded(b"cosmosvaloper1abc/42").expect("denom fits");
    Pallet::<T>::set_lsm_deposit(LsmTokenDeposit {
      deposit_id: [7u8; 32],
      chain_id: chain_id.clone(),
      denom: denom.clone(),
      ibc_denom: denom.clone(),
      validator_address: Default::default(),
      amount: 1_000,
      staker: whitelisted_caller(),
      st_token: Coin::default(),
      transfer_attempts: 3,
      status: LsmTokenDepositStatus::TransferFailed,
    });

    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    reset_lsm_token_deposit(origin as T::RuntimeOrigin, chain_id.clone(), denom.clone());

    let deposit = Pallet::<T>::get_lsm_deposit(&chain_id, &denom).expect("deposit kept");
    assert_eq!(deposit.status, LsmTokenDepositStatus::DepositPending);
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
