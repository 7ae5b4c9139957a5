use crate as pallet_icacallbacks;
use polkadot_sdk::frame_support::{construct_runtime, derive_impl, storage_alias, Blake2_128Concat};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_runtime::{
  traits::{BlakeTwo256, IdentityLookup},
  BuildStorage, DispatchError, DispatchResult,
};
use primitives::{AckResponse, AckStatus, CallbackHandler, CallbackKind, Packet};

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Icacallbacks: pallet_icacallbacks,
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

/// Invocations seen by [`RecordingHandler`], keyed by packet sequence.
#[storage_alias]
pub type HandledCallbacks =
  StorageMap<MockHandler, Blake2_128Concat, u64, (CallbackKind, AckStatus, alloc::vec::Vec<u8>)>;

/// Args that make [`RecordingHandler`] fail after writing.
pub const FAILING_ARGS: &[u8] = &[0xff];

/// Owns the native transfer and delegate kinds; records every call.
pub struct RecordingHandler;

impl CallbackHandler for RecordingHandler {
  fn handles(kind: CallbackKind) -> bool {
    matches!(kind, CallbackKind::NativeTransfer | CallbackKind::Delegate)
  }

  fn call(kind: CallbackKind, packet: &Packet, ack: &AckResponse, args: &[u8]) -> DispatchResult {
    HandledCallbacks::insert(packet.sequence, (kind, ack.status, args.to_vec()));
    if args == FAILING_ARGS {
      return Err(DispatchError::Other("handler failed"));
    }
    Ok(())
  }
}

impl pallet_icacallbacks::Config for Test {
  type CallbackHandler = RecordingHandler;
}

pub fn transfer_packet(sequence: u64) -> Packet {
  Packet {
    sequence,
    source_port: b"transfer".to_vec(),
    source_channel: b"channel-0".to_vec(),
    destination_port: b"transfer".to_vec(),
    destination_channel: b"channel-9".to_vec(),
    data: alloc::vec::Vec::new(),
    timeout_timestamp: 0,
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| System::set_block_number(1));
  ext
}
