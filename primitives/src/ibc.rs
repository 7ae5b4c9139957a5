//! Packet payloads exchanged with the transfer and interchain-account collaborators.
//!
//! ICS-20 packet data and acknowledgements are JSON, as on the wire. Interchain-account
//! messages and their responses are SCALE-encoded and opaque to the transport.

use crate::types::{ChannelId, Denom, PortId, RemoteAddress};
use alloc::{format, string::String, vec, vec::Vec};
use base64::Engine as _;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::sp_runtime::DispatchResult;
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// A packet as delivered by the transport, either inbound or as the subject of an ack.
#[derive(Clone, Debug, Decode, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct Packet {
  pub sequence: u64,
  pub source_port: Vec<u8>,
  pub source_channel: Vec<u8>,
  pub destination_port: Vec<u8>,
  pub destination_channel: Vec<u8>,
  pub data: Vec<u8>,
  pub timeout_timestamp: u64,
}

/// ICS-20 fungible token packet data.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FungibleTokenPacketData {
  pub denom: String,
  pub amount: String,
  pub sender: String,
  pub receiver: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub memo: String,
}

impl FungibleTokenPacketData {
  pub fn from_json(data: &[u8]) -> Option<Self> {
    serde_json::from_slice(data).ok()
  }

  pub fn to_json(&self) -> Vec<u8> {
    serde_json::to_vec(self).unwrap_or_default()
  }
}

/// Outbound ICS-20 transfer request.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct MsgTransfer<AccountId> {
  pub source_port: Vec<u8>,
  pub source_channel: Vec<u8>,
  pub denom: Vec<u8>,
  pub amount: u128,
  pub sender: AccountId,
  pub receiver: Vec<u8>,
  /// Absolute timeout in nanoseconds.
  pub timeout_timestamp: u64,
  pub memo: Vec<u8>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum AcknowledgementJson {
  Result(String),
  Error(String),
}

/// Channel-level acknowledgement: a result blob or an error string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Acknowledgement {
  Result(Vec<u8>),
  Error(String),
}

impl Acknowledgement {
  /// The ICS-20 success acknowledgement.
  pub fn success() -> Self {
    Self::Result(vec![1])
  }

  pub fn error(message: &str) -> Self {
    Self::Error(message.into())
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Self::Result(_))
  }

  pub fn to_bytes(&self) -> Vec<u8> {
    let json = match self {
      Self::Result(result) => {
        AcknowledgementJson::Result(base64::engine::general_purpose::STANDARD.encode(result))
      },
      Self::Error(message) => AcknowledgementJson::Error(message.clone()),
    };
    serde_json::to_vec(&json).unwrap_or_default()
  }

  pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
    match serde_json::from_slice::<AcknowledgementJson>(bytes).ok()? {
      AcknowledgementJson::Result(encoded) => base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()
        .map(Self::Result),
      AcknowledgementJson::Error(message) => Some(Self::Error(message)),
    }
  }
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum AckStatus {
  Success,
  Failure,
  Timeout,
}

/// Parsed outcome of a packet, handed to callback handlers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AckResponse {
  pub status: AckStatus,
  /// Per-message responses of an interchain-account transaction.
  pub msg_responses: Vec<Vec<u8>>,
  pub error: String,
}

impl AckResponse {
  pub fn success(msg_responses: Vec<Vec<u8>>) -> Self {
    Self { status: AckStatus::Success, msg_responses, error: String::new() }
  }

  pub fn failure(error: String) -> Self {
    Self { status: AckStatus::Failure, msg_responses: Vec::new(), error }
  }

  pub fn timeout() -> Self {
    Self { status: AckStatus::Timeout, msg_responses: Vec::new(), error: String::new() }
  }
}

/// Result body of an interchain-account acknowledgement.
#[derive(Clone, Debug, Decode, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct TxMsgData {
  pub msg_responses: Vec<Vec<u8>>,
}

/// Messages executed on a host zone by an interchain account.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub enum HostMsg {
  Delegate { delegator: RemoteAddress, validator: RemoteAddress, denom: Denom, amount: u128 },
  Undelegate { delegator: RemoteAddress, validator: RemoteAddress, denom: Denom, amount: u128 },
  Transfer {
    source_port: PortId,
    source_channel: ChannelId,
    denom: Denom,
    amount: u128,
    sender: RemoteAddress,
    receiver: Vec<u8>,
    timeout_timestamp: u64,
  },
  RedeemTokensForShares { delegator: RemoteAddress, denom: Denom, amount: u128 },
}

/// Host response to an undelegation, one per message.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct UndelegateResponse {
  /// Unix seconds at which the unbond completes on the host.
  pub completion_time: u64,
}

/// Which interchain account on the host signs a transaction.
#[derive(Clone, Copy, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub enum IcaAccountType {
  Delegation,
  Redemption,
}

/// Identity of a submitted packet.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct PacketId {
  pub port_id: Vec<u8>,
  pub channel_id: Vec<u8>,
  pub sequence: u64,
}

/// Tag of a registered callback; each pallet handles the kinds it owns.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum CallbackKind {
  NativeTransfer,
  LsmTransfer,
  Delegate,
  Undelegate,
  Redemption,
  Claim,
  Detokenize,
  AutopilotTransfer,
}

/// Channel-level packet callbacks of a module in a transfer stack.
pub trait IbcModule {
  fn on_recv_packet(packet: &Packet) -> Acknowledgement;

  fn on_acknowledgement_packet(packet: &Packet, acknowledgement: &[u8]) -> DispatchResult;

  fn on_timeout_packet(packet: &Packet) -> DispatchResult;
}

/// Voucher denom for `base_denom` received over `port/channel`.
pub fn ibc_denom(port: &[u8], channel: &[u8], base_denom: &[u8]) -> Vec<u8> {
  let mut path = Vec::with_capacity(port.len() + channel.len() + base_denom.len() + 2);
  path.extend_from_slice(port);
  path.push(b'/');
  path.extend_from_slice(channel);
  path.push(b'/');
  path.extend_from_slice(base_denom);
  let hash = polkadot_sdk::sp_io::hashing::sha2_256(&path);
  format!("ibc/{}", hex::encode_upper(hash)).into_bytes()
}

fn source_prefix(port: &[u8], channel: &[u8]) -> Vec<u8> {
  let mut prefix = Vec::with_capacity(port.len() + channel.len() + 2);
  prefix.extend_from_slice(port);
  prefix.push(b'/');
  prefix.extend_from_slice(channel);
  prefix.push(b'/');
  prefix
}

/// True when the denom originated on the receiving chain and is travelling back home.
pub fn receiver_chain_is_source(source_port: &[u8], source_channel: &[u8], denom: &[u8]) -> bool {
  denom.starts_with(&source_prefix(source_port, source_channel))
}

/// Strips the `port/channel/` hop added by the sending chain.
pub fn strip_source_prefix<'a>(
  source_port: &[u8],
  source_channel: &[u8],
  denom: &'a [u8],
) -> Option<&'a [u8]> {
  denom.strip_prefix(source_prefix(source_port, source_channel).as_slice())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn success_ack_is_base64_encoded() {
    let ack = Acknowledgement::success();
    assert_eq!(ack.to_bytes(), br#"{"result":"AQ=="}"#.to_vec());
    assert_eq!(Acknowledgement::from_bytes(br#"{"result":"AQ=="}"#), Some(ack));
  }

  #[test]
  fn error_ack_round_trips_message() {
    let bytes = Acknowledgement::error("InvalidPacketMetadata").to_bytes();
    assert_eq!(bytes, br#"{"error":"InvalidPacketMetadata"}"#.to_vec());
    assert!(!Acknowledgement::from_bytes(&bytes).unwrap().is_success());
    assert_eq!(Acknowledgement::from_bytes(b"not json"), None);
  }

  #[test]
  fn packet_data_keeps_unknown_memo_content() {
    let raw = br#"{"denom":"uatom","amount":"10","sender":"cosmos1x","receiver":"stride1","memo":"{\"forward\":{}}","extra":1}"#;
    let data = FungibleTokenPacketData::from_json(raw).unwrap();
    assert_eq!(data.memo, r#"{"forward":{}}"#);
    let again = FungibleTokenPacketData::from_json(&data.to_json()).unwrap();
    assert_eq!(again, data);
  }

  #[test]
  fn ibc_denom_is_uppercase_sha256_of_trace() {
    let denom = ibc_denom(b"transfer", b"channel-0", b"uatom");
    assert!(denom.starts_with(b"ibc/"));
    assert_eq!(denom.len(), 4 + 64);
    assert!(denom[4..].iter().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
    assert_ne!(denom, ibc_denom(b"transfer", b"channel-1", b"uatom"));
  }

  #[test]
  fn source_prefix_detection() {
    assert!(receiver_chain_is_source(b"transfer", b"channel-5", b"transfer/channel-5/stuatom"));
    assert!(!receiver_chain_is_source(b"transfer", b"channel-5", b"uatom"));
    assert_eq!(
      strip_source_prefix(b"transfer", b"channel-5", b"transfer/channel-5/stuatom"),
      Some(&b"stuatom"[..])
    );
  }
}
