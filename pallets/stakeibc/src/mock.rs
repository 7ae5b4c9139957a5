use crate as pallet_stakeibc;
use crate::HostZoneConfig;
use alloc::{format, vec, vec::Vec};
use codec::Encode;
use polkadot_sdk::frame_support::{
  construct_runtime, derive_impl, parameter_types,
  pallet_prelude::ValueQuery,
  storage_alias,
  traits::{ConstU32, ConstU64},
  Blake2_128Concat, PalletId, Twox64Concat,
};
use polkadot_sdk::frame_system;
use polkadot_sdk::pallet_timestamp;
use polkadot_sdk::sp_runtime::{
  traits::{BlakeTwo256, IdentityLookup},
  BuildStorage, DispatchError, DispatchResult,
};
use primitives::{
  AddressCodec, DenomTrace, DenomTraceResolver, HostMsg, IcaAccountType, IcaApi, MsgTransfer,
  Packet, PacketId, TokenBank, TransferApi, TxMsgData, Acknowledgement,
};

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Timestamp: pallet_timestamp,
    Icacallbacks: pallet_icacallbacks,
    Records: pallet_records,
    Stakeibc: pallet_stakeibc,
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
  type CallbackHandler = (Records, Stakeibc);
}

// Bank

#[storage_alias]
pub type Balances =
  StorageDoubleMap<MockBank, Twox64Concat, u64, Blake2_128Concat, Vec<u8>, u128, ValueQuery>;

pub struct MockBank;

impl TokenBank<u64> for MockBank {
  fn transfer(from: &u64, to: &u64, denom: &[u8], amount: u128) -> DispatchResult {
    let balance = Balances::get(from, denom.to_vec());
    let remaining = balance
      .checked_sub(amount)
      .ok_or(DispatchError::Other("insufficient balance"))?;
    Balances::insert(from, denom.to_vec(), remaining);
    Balances::mutate(to, denom.to_vec(), |b| *b += amount);
    Ok(())
  }

  fn mint(to: &u64, denom: &[u8], amount: u128) -> DispatchResult {
    Balances::mutate(to, denom.to_vec(), |b| *b += amount);
    Ok(())
  }

  fn burn(from: &u64, denom: &[u8], amount: u128) -> DispatchResult {
    Balances::try_mutate(from, denom.to_vec(), |b| {
      *b = b.checked_sub(amount).ok_or(DispatchError::Other("burn exceeds balance"))?;
      Ok(())
    })
  }

  fn balance(who: &u64, denom: &[u8]) -> u128 {
    Balances::get(who, denom.to_vec())
  }
}

// ICS-20

#[storage_alias]
pub type SentTransfers = StorageMap<MockTransfers, Twox64Concat, u64, MsgTransfer<u64>>;

#[storage_alias]
pub type LastTransferSequence = StorageValue<MockTransfers, u64, ValueQuery>;

pub struct MockTransfers;

impl TransferApi<u64> for MockTransfers {
  fn transfer(msg: MsgTransfer<u64>) -> Result<u64, DispatchError> {
    let sequence = LastTransferSequence::mutate(|last| {
      *last += 1;
      *last
    });
    SentTransfers::insert(sequence, msg);
    Ok(sequence)
  }
}

// Interchain accounts

pub const ICA_PORT: &[u8] = b"icacontroller-cosmoshub-4";
pub const ICA_CHANNEL: &[u8] = b"channel-1";

#[storage_alias]
pub type SentIcaTxs =
  StorageMap<MockIca, Twox64Concat, u64, (Vec<u8>, IcaAccountType, Vec<HostMsg>)>;

#[storage_alias]
pub type LastIcaSequence = StorageValue<MockIca, u64, ValueQuery>;

pub struct MockIca;

impl IcaApi for MockIca {
  fn submit_tx(
    chain_id: &[u8],
    account: IcaAccountType,
    msgs: Vec<HostMsg>,
    _timeout_timestamp: u64,
  ) -> Result<PacketId, DispatchError> {
    let sequence = LastIcaSequence::mutate(|last| {
      *last += 1;
      *last
    });
    SentIcaTxs::insert(sequence, (chain_id.to_vec(), account, msgs));
    Ok(PacketId { port_id: ICA_PORT.to_vec(), channel_id: ICA_CHANNEL.to_vec(), sequence })
  }
}

/// Renders `7` as `stride17`.
pub struct MockAddressCodec;

impl AddressCodec<u64> for MockAddressCodec {
  fn encode(who: &u64) -> Vec<u8> {
    format!("stride1{}", who).into_bytes()
  }

  fn decode(address: &[u8]) -> Option<u64> {
    core::str::from_utf8(address.strip_prefix(b"stride1")?).ok()?.parse().ok()
  }
}

#[storage_alias]
pub type DenomTraces = StorageMap<MockDenomTraces, Blake2_128Concat, Vec<u8>, (Vec<u8>, Vec<u8>)>;

pub struct MockDenomTraces;

impl DenomTraceResolver for MockDenomTraces {
  fn resolve(ibc_denom: &[u8]) -> Option<DenomTrace> {
    DenomTraces::get(ibc_denom.to_vec()).map(|(path, base_denom)| DenomTrace { path, base_denom })
  }
}

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper for MockDenomTraces {
  fn register_denom_trace(ibc_denom: &[u8], path: &[u8], base_denom: &[u8]) {
    DenomTraces::insert(ibc_denom.to_vec(), (path.to_vec(), base_denom.to_vec()));
  }
}

parameter_types! {
  pub const TransferTimeout: u64 = 1_800;
  pub const LsmTransferTimeout: u64 = 86_400;
  pub const StakeibcPalletId: PalletId = PalletId(*b"py/stake");
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

impl pallet_stakeibc::Config for Test {
  type Bank = MockBank;
  type Ica = MockIca;
  type AddressCodec = MockAddressCodec;
  type DenomTraces = MockDenomTraces;
  type PalletId = StakeibcPalletId;
  type IcaTimeout = ConstU64<3_600>;
  type OperatorOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockDenomTraces;
}

pub const NOW: u64 = 1_700_000_000;
pub const UNBONDING_PERIOD: u64 = 21 * 24 * 60 * 60;
pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CHAIN: &[u8] = b"cosmoshub-4";
pub const HOST_DENOM: &[u8] = b"uatom";
pub const ST_DENOM: &[u8] = b"stuatom";
pub const IBC_DENOM: &[u8] = b"ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";
pub const TRANSFER_CHANNEL: &[u8] = b"channel-0";
pub const VALIDATOR_A: &[u8] = b"cosmosvaloper1a";
pub const VALIDATOR_B: &[u8] = b"cosmosvaloper1b";

pub fn host_zone_config() -> HostZoneConfig {
  HostZoneConfig {
    chain_id: CHAIN.to_vec(),
    host_denom: HOST_DENOM.to_vec(),
    ibc_denom: IBC_DENOM.to_vec(),
    transfer_channel_id: TRANSFER_CHANNEL.to_vec(),
    connection_id: b"connection-0".to_vec(),
    bech32_prefix: b"cosmos".to_vec(),
    delegation_ica_address: b"cosmos1delegation".to_vec(),
    redemption_ica_address: b"cosmos1redemption".to_vec(),
    validators: vec![(VALIDATOR_A.to_vec(), 1), (VALIDATOR_B.to_vec(), 1)],
    unbonding_period_seconds: UNBONDING_PERIOD,
  }
}

pub fn deposit_address() -> u64 {
  Stakeibc::deposit_address(CHAIN)
}

/// Packet of the interchain-account transaction submitted with `sequence`.
pub fn ica_packet(sequence: u64) -> Packet {
  Packet {
    sequence,
    source_port: ICA_PORT.to_vec(),
    source_channel: ICA_CHANNEL.to_vec(),
    destination_port: b"icahost".to_vec(),
    destination_channel: b"channel-2".to_vec(),
    data: Vec::new(),
    timeout_timestamp: 0,
  }
}

/// Packet of the ICS-20 transfer sent with `sequence`.
pub fn transfer_packet(sequence: u64) -> Packet {
  let msg = SentTransfers::get(sequence).expect("transfer was sent");
  Packet {
    sequence,
    source_port: msg.source_port,
    source_channel: msg.source_channel,
    destination_port: b"transfer".to_vec(),
    destination_channel: b"channel-100".to_vec(),
    data: Vec::new(),
    timeout_timestamp: msg.timeout_timestamp,
  }
}

pub fn ica_success(sequence: u64, msg_responses: Vec<Vec<u8>>) -> DispatchResult {
  let ack = Acknowledgement::Result(TxMsgData { msg_responses }.encode()).to_bytes();
  Icacallbacks::on_acknowledgement_packet(&ica_packet(sequence), &ack, true)
}

pub fn ica_failure(sequence: u64) -> DispatchResult {
  let ack = Acknowledgement::error("host execution failed").to_bytes();
  Icacallbacks::on_acknowledgement_packet(&ica_packet(sequence), &ack, true)
}

pub fn ica_timeout(sequence: u64) -> DispatchResult {
  Icacallbacks::on_timeout_packet(&ica_packet(sequence))
}

pub fn transfer_success(sequence: u64) -> DispatchResult {
  Icacallbacks::on_acknowledgement_packet(
    &transfer_packet(sequence),
    &Acknowledgement::success().to_bytes(),
    false,
  )
}

pub fn transfer_failure(sequence: u64) -> DispatchResult {
  Icacallbacks::on_acknowledgement_packet(
    &transfer_packet(sequence),
    &Acknowledgement::error("receiver rejected").to_bytes(),
    false,
  )
}

pub fn set_now(secs: u64) {
  Timestamp::set_timestamp(secs * 1_000);
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  pallet_stakeibc::GenesisConfig::<Test> {
    host_zones: vec![host_zone_config()],
    _marker: Default::default(),
  }
  .assimilate_storage(&mut t)
  .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| {
    System::set_block_number(1);
    set_now(NOW);
  });
  ext
}
