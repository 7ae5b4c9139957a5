use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Feature switches of the router.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Deserialize,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  Serialize,
  TypeInfo,
)]
pub struct AutopilotParams {
  /// Liquid stake and redeem routes.
  pub stakeibc_active: bool,
  /// Airdrop address updates.
  pub claim_active: bool,
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum AutopilotAction {
  LiquidStake,
  RedeemStake,
  UpdateAirdropAddress,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StakeibcAction {
  LiquidStake,
  RedeemStake,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakeibcMetadata {
  pub action: StakeibcAction,
  /// Remote recipient of a forward transfer or of redeemed tokens.
  pub ibc_receiver: Option<Vec<u8>>,
  /// Channel of the forward transfer; the host zone's channel when absent.
  pub transfer_channel: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimMetadata<AccountId> {
  pub stride_address: AccountId,
  pub airdrop_id: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Route<AccountId> {
  Stakeibc(StakeibcMetadata),
  Claim(ClaimMetadata<AccountId>),
}

/// Validated `autopilot` block of an inbound packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketMetadata<AccountId> {
  /// Local address the inbound tokens are credited to.
  pub receiver: Vec<u8>,
  pub route: Route<AccountId>,
}
