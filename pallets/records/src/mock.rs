use crate as pallet_records;
use crate::{DepositRecord, DepositRecordSource, DepositRecordStatus};
use polkadot_sdk::frame_support::{
  construct_runtime, derive_impl, parameter_types,
  pallet_prelude::ValueQuery,
  storage_alias,
  traits::{ConstU32, ConstU64},
  Twox64Concat,
};
use polkadot_sdk::frame_system;
use polkadot_sdk::pallet_timestamp;
use polkadot_sdk::sp_runtime::{
  traits::{BlakeTwo256, IdentityLookup},
  BuildStorage, DispatchError,
};
use primitives::{bounded, MsgTransfer, Packet, TransferApi};

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Timestamp: pallet_timestamp,
    Icacallbacks: pallet_icacallbacks,
    Records: pallet_records,
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

impl pallet_icacallbacks::Config for Test {
  type CallbackHandler = Records;
}

/// Transfers accepted by [`MockTransfers`], by sequence.
#[storage_alias]
pub type SentTransfers = StorageMap<MockTransfers, Twox64Concat, u64, MsgTransfer<u64>>;

#[storage_alias]
pub type LastSequence = StorageValue<MockTransfers, u64, ValueQuery>;

/// Makes every submission fail while set.
#[storage_alias]
pub type RejectTransfers = StorageValue<MockTransfers, bool, ValueQuery>;

pub struct MockTransfers;

impl TransferApi<u64> for MockTransfers {
  fn transfer(msg: MsgTransfer<u64>) -> Result<u64, DispatchError> {
    if RejectTransfers::get() {
      return Err(DispatchError::Other("channel closed"));
    }
    let sequence = LastSequence::mutate(|last| {
      *last += 1;
      *last
    });
    SentTransfers::insert(sequence, msg);
    Ok(sequence)
  }
}

parameter_types! {
  pub const TransferTimeout: u64 = 1_800;
  pub const LsmTransferTimeout: u64 = 86_400;
}

impl pallet_records::Config for Test {
  type Transfers = MockTransfers;
  type Callbacks = Icacallbacks;
  type UnixTime = Timestamp;
  type AdminOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type TransferTimeout = TransferTimeout;
  type LsmTransferTimeout = LsmTransferTimeout;
  type MaxLsmTransferAttempts = ConstU32<3>;
  type WeightInfo = ();
}

pub const NOW: u64 = 1_700_000_000;
pub const DEPOSIT_ACCOUNT: u64 = 100;
pub const CHAIN: &[u8] = b"cosmoshub-4";

/// The packet a relayer would acknowledge for a transfer sent with `sequence`.
pub fn sent_packet(sequence: u64) -> Packet {
  let msg = SentTransfers::get(sequence).expect("transfer was sent");
  Packet {
    sequence,
    source_port: msg.source_port,
    source_channel: msg.source_channel,
    destination_port: b"transfer".to_vec(),
    destination_channel: b"channel-100".to_vec(),
    data: alloc::vec::Vec::new(),
    timeout_timestamp: msg.timeout_timestamp,
  }
}

pub fn deposit_record(amount: u128, epoch: u64, status: DepositRecordStatus) -> DepositRecord {
  DepositRecord {
    id: 0,
    amount,
    denom: bounded(b"uatom").unwrap(),
    host_zone_id: bounded(CHAIN).unwrap(),
    deposit_epoch_number: epoch,
    source: DepositRecordSource::Stride,
    status,
    delegation_txs_in_progress: 0,
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| {
    System::set_block_number(1);
    Timestamp::set_timestamp(NOW * 1_000);
  });
  ext
}
