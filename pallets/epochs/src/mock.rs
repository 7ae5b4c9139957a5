use crate as pallet_epochs;
use alloc::vec::Vec;
use polkadot_sdk::frame_support::{
  construct_runtime, derive_impl,
  pallet_prelude::ValueQuery,
  storage_alias,
  traits::{ConstU64, Hooks},
};
use polkadot_sdk::frame_system;
use polkadot_sdk::pallet_timestamp;
use polkadot_sdk::sp_runtime::{
  traits::{BlakeTwo256, IdentityLookup},
  BuildStorage, DispatchError, DispatchResult,
};
use primitives::EpochHooks;

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Timestamp: pallet_timestamp,
    Epochs: pallet_epochs,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = polkadot_sdk::sp_core::H256;
  type Hashing = BlakeTwo256;
}

impl pallet_timestamp::Config for Test {
  type Moment = u64;
  type OnTimestampSet = ();
  type MinimumPeriod = ConstU64<1>;
  type WeightInfo = ();
}

/// `(identifier, epoch, started)` in delivery order.
#[storage_alias]
pub type Signals = StorageValue<MockHooks, Vec<(Vec<u8>, u64, bool)>, ValueQuery>;

/// Identifier whose subscriber writes a signal and then fails.
pub const BROKEN_EPOCH: &[u8] = b"broken";

pub struct RecordingHooks;

impl RecordingHooks {
  fn record(identifier: &[u8], epoch_number: u64, started: bool) -> DispatchResult {
    Signals::append((identifier.to_vec(), epoch_number, started));
    if identifier == BROKEN_EPOCH {
      return Err(DispatchError::Other("subscriber failed"));
    }
    Ok(())
  }
}

impl EpochHooks for RecordingHooks {
  fn before_epoch_start(identifier: &[u8], epoch_number: u64) -> DispatchResult {
    Self::record(identifier, epoch_number, true)
  }

  fn after_epoch_end(identifier: &[u8], epoch_number: u64) -> DispatchResult {
    Self::record(identifier, epoch_number, false)
  }
}

impl pallet_epochs::Config for Test {
  type UnixTime = Timestamp;
  type EpochHooks = RecordingHooks;
  type AdminOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type WeightInfo = ();
}

pub const DAY: u64 = 86_400;
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Moves to block `n` at unix second `secs` and runs the epoch clock.
pub fn run_to(n: u64, secs: u64) {
  System::set_block_number(n);
  Timestamp::set_timestamp(secs * 1_000);
  Epochs::on_initialize(n);
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  pallet_epochs::GenesisConfig::<Test> {
    epochs: alloc::vec![
      (b"day".to_vec(), GENESIS_TIME, DAY),
      (BROKEN_EPOCH.to_vec(), GENESIS_TIME, DAY),
    ],
    _marker: Default::default(),
  }
  .assimilate_storage(&mut t)
  .unwrap();

  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| run_to(1, GENESIS_TIME - 10));
  ext
}
