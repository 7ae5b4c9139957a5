use crate as pallet_autopilot;
use crate::AutopilotParams;
use alloc::{
  format,
  string::{String, ToString},
  vec,
  vec::Vec,
};
use polkadot_sdk::frame_support::{
  construct_runtime, derive_impl, parameter_types, pallet_prelude::ValueQuery, storage_alias,
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
  epoch_ids::{DAY_EPOCH, STRIDE_EPOCH},
  ibc_denom, strip_source_prefix, AddressCodec, AirdropApi, DenomTrace, DenomTraceResolver,
  EpochHooks, FungibleTokenPacketData, HostMsg, IbcModule, IcaAccountType, IcaApi, MsgTransfer,
  Packet, PacketId, TokenBank, TransferApi, Acknowledgement,
};

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Timestamp: pallet_timestamp,
    Icacallbacks: pallet_icacallbacks,
    Records: pallet_records,
    Stakeibc: pallet_stakeibc,
    Autopilot: pallet_autopilot,
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
  type CallbackHandler = (Records, Stakeibc, Autopilot);
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

/// Holds the tokens of outbound transfers until their packet settles.
pub const ESCROW: u64 = 999;

// ICS-20

#[storage_alias]
pub type SentTransfers = StorageMap<MockTransfers, Twox64Concat, u64, MsgTransfer<u64>>;

#[storage_alias]
pub type LastTransferSequence = StorageValue<MockTransfers, u64, ValueQuery>;

pub struct MockTransfers;

impl TransferApi<u64> for MockTransfers {
  fn transfer(msg: MsgTransfer<u64>) -> Result<u64, DispatchError> {
    MockBank::transfer(&msg.sender, &ESCROW, &msg.denom, msg.amount)?;
    let sequence = LastTransferSequence::mutate(|last| {
      *last += 1;
      *last
    });
    SentTransfers::insert(sequence, msg);
    Ok(sequence)
  }
}

/// Settles inbound transfers by crediting the receiver, and refunds escrow on failed or timed
/// out outbound ones.
pub struct MockTransferApp;

impl MockTransferApp {
  fn refund(packet: &Packet) -> DispatchResult {
    let data = FungibleTokenPacketData::from_json(&packet.data)
      .ok_or(DispatchError::Other("undecodable packet"))?;
    let sender = MockAddressCodec::decode(data.sender.as_bytes())
      .ok_or(DispatchError::Other("foreign sender"))?;
    let amount: u128 = data.amount.parse().map_err(|_| DispatchError::Other("bad amount"))?;
    MockBank::transfer(&ESCROW, &sender, data.denom.as_bytes(), amount)
  }
}

impl IbcModule for MockTransferApp {
  fn on_recv_packet(packet: &Packet) -> Acknowledgement {
    let Some(data) = FungibleTokenPacketData::from_json(&packet.data) else {
      return Acknowledgement::error("cannot decode packet data");
    };
    let Some(receiver) = MockAddressCodec::decode(data.receiver.as_bytes()) else {
      return Acknowledgement::error("invalid receiver");
    };
    let Ok(amount) = data.amount.parse::<u128>() else {
      return Acknowledgement::error("invalid amount");
    };
    let denom = data.denom.as_bytes();
    let local_denom =
      match strip_source_prefix(&packet.source_port, &packet.source_channel, denom) {
        Some(native) => native.to_vec(),
        None => ibc_denom(&packet.destination_port, &packet.destination_channel, denom),
      };
    match MockBank::mint(&receiver, &local_denom, amount) {
      Ok(()) => Acknowledgement::success(),
      Err(_) => Acknowledgement::error("mint failed"),
    }
  }

  fn on_acknowledgement_packet(packet: &Packet, acknowledgement: &[u8]) -> DispatchResult {
    match Acknowledgement::from_bytes(acknowledgement) {
      Some(ack) if ack.is_success() => Ok(()),
      _ => Self::refund(packet),
    }
  }

  fn on_timeout_packet(packet: &Packet) -> DispatchResult {
    Self::refund(packet)
  }
}

// Interchain accounts

#[storage_alias]
pub type LastIcaSequence = StorageValue<MockIca, u64, ValueQuery>;

pub struct MockIca;

impl IcaApi for MockIca {
  fn submit_tx(
    _chain_id: &[u8],
    _account: IcaAccountType,
    _msgs: Vec<HostMsg>,
    _timeout_timestamp: u64,
  ) -> Result<PacketId, DispatchError> {
    let sequence = LastIcaSequence::mutate(|last| {
      *last += 1;
      *last
    });
    Ok(PacketId {
      port_id: b"icacontroller-cosmoshub-4".to_vec(),
      channel_id: b"channel-1".to_vec(),
      sequence,
    })
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

pub struct MockDenomTraces;

impl DenomTraceResolver for MockDenomTraces {
  fn resolve(_ibc_denom: &[u8]) -> Option<DenomTrace> {
    None
  }
}

#[cfg(feature = "runtime-benchmarks")]
impl pallet_stakeibc::BenchmarkHelper for MockDenomTraces {
  fn register_denom_trace(_ibc_denom: &[u8], _path: &[u8], _base_denom: &[u8]) {}
}

// Airdrop

/// Claim record owner by host sender and airdrop id.
#[storage_alias]
pub type AirdropClaims =
  StorageDoubleMap<MockAirdrop, Blake2_128Concat, Vec<u8>, Blake2_128Concat, Vec<u8>, u64>;

pub struct MockAirdrop;

impl AirdropApi<u64> for MockAirdrop {
  fn update_airdrop_address(
    host_sender: &[u8],
    new_address: &u64,
    airdrop_id: &[u8],
  ) -> DispatchResult {
    AirdropClaims::try_mutate(host_sender.to_vec(), airdrop_id.to_vec(), |owner| {
      let owner = owner.as_mut().ok_or(DispatchError::Other("no claim record"))?;
      *owner = *new_address;
      Ok(())
    })
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

impl pallet_autopilot::Config for Test {
  type TransferApp = pallet_icacallbacks::TransferCallbacks<Test, MockTransferApp>;
  type Transfers = MockTransfers;
  type Callbacks = Icacallbacks;
  type Bank = MockBank;
  type LiquidStaking = Stakeibc;
  type Airdrop = MockAirdrop;
  type AddressCodec = MockAddressCodec;
  type UnixTime = Timestamp;
  type ForwardTransferTimeout = ConstU64<1_800>;
  type AdminOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type WeightInfo = ();
}

pub const NOW: u64 = 1_700_000_000;
pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CHAIN: &[u8] = b"cosmoshub-4";
pub const HOST_DENOM: &[u8] = b"uatom";
pub const ST_DENOM: &[u8] = b"stuatom";
pub const IBC_DENOM: &[u8] = b"ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";
/// Local end of the transfer channel to the host zone.
pub const TRANSFER_CHANNEL: &[u8] = b"channel-0";
/// Host end of the same channel.
pub const HOST_CHANNEL: &[u8] = b"channel-100";

pub fn host_zone_config() -> pallet_stakeibc::HostZoneConfig {
  pallet_stakeibc::HostZoneConfig {
    chain_id: CHAIN.to_vec(),
    host_denom: HOST_DENOM.to_vec(),
    ibc_denom: IBC_DENOM.to_vec(),
    transfer_channel_id: TRANSFER_CHANNEL.to_vec(),
    connection_id: b"connection-0".to_vec(),
    bech32_prefix: b"cosmos".to_vec(),
    delegation_ica_address: b"cosmos1delegation".to_vec(),
    redemption_ica_address: b"cosmos1redemption".to_vec(),
    validators: vec![(b"cosmosvaloper1a".to_vec(), 1), (b"cosmosvaloper1b".to_vec(), 1)],
    unbonding_period_seconds: 21 * 24 * 60 * 60,
  }
}

pub fn address(who: u64) -> String {
  String::from_utf8(MockAddressCodec::encode(&who)).unwrap()
}

/// Inbound transfer from the host zone over the host zone's channel.
pub fn inbound_packet(sequence: u64, data: FungibleTokenPacketData) -> Packet {
  Packet {
    sequence,
    source_port: b"transfer".to_vec(),
    source_channel: HOST_CHANNEL.to_vec(),
    destination_port: b"transfer".to_vec(),
    destination_channel: TRANSFER_CHANNEL.to_vec(),
    data: data.to_json(),
    timeout_timestamp: 0,
  }
}

pub fn transfer_data(denom: &str, amount: &str, receiver: &str, memo: &str) -> FungibleTokenPacketData {
  FungibleTokenPacketData {
    denom: denom.into(),
    amount: amount.into(),
    sender: "cosmos1sender".into(),
    receiver: receiver.into(),
    memo: memo.into(),
  }
}

/// Packet of the outbound transfer sent with `sequence`.
pub fn sent_packet(sequence: u64) -> Packet {
  let msg = SentTransfers::get(sequence).expect("transfer was sent");
  let data = FungibleTokenPacketData {
    denom: String::from_utf8(msg.denom).unwrap(),
    amount: msg.amount.to_string(),
    sender: address(msg.sender),
    receiver: String::from_utf8(msg.receiver).unwrap(),
    memo: String::from_utf8(msg.memo).unwrap(),
  };
  Packet {
    sequence,
    source_port: msg.source_port,
    source_channel: msg.source_channel,
    destination_port: b"transfer".to_vec(),
    destination_channel: HOST_CHANNEL.to_vec(),
    data: data.to_json(),
    timeout_timestamp: msg.timeout_timestamp,
  }
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
  pallet_autopilot::GenesisConfig::<Test> {
    params: AutopilotParams { stakeibc_active: true, claim_active: true },
    _marker: Default::default(),
  }
  .assimilate_storage(&mut t)
  .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| {
    System::set_block_number(1);
    set_now(NOW);
    <Stakeibc as EpochHooks>::before_epoch_start(STRIDE_EPOCH, 1).unwrap();
    <Stakeibc as EpochHooks>::before_epoch_start(DAY_EPOCH, 1).unwrap();
  });
  ext
}
