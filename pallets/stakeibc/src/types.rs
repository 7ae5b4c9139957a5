use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::frame_support::{traits::ConstU32, BoundedVec};
use primitives::{ChainId, ChannelId, ConnectionId, Dec, Denom, RedemptionId, RemoteAddress};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Validators tracked per host zone.
pub type MaxValidators = ConstU32<64>;

pub type Bech32Prefix = BoundedVec<u8, ConstU32<32>>;

#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct Validator {
  pub address: RemoteAddress,
  /// Share of new delegations, relative to the other validators of the host.
  pub weight: u64,
  /// Tokens delegated to this validator by the delegation account.
  pub delegation: u128,
}

/// A remote proof-of-stake chain whose stake backs a derivative token.
#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct HostZone<AccountId> {
  pub chain_id: ChainId,
  pub host_denom: Denom,
  /// Voucher denom of the host token on this chain.
  pub ibc_denom: Denom,
  pub transfer_channel_id: ChannelId,
  pub connection_id: ConnectionId,
  pub bech32_prefix: Bech32Prefix,
  /// Local account collecting deposits, escrowed stTokens and claimable tokens.
  pub deposit_address: AccountId,
  pub delegation_ica_address: RemoteAddress,
  pub redemption_ica_address: RemoteAddress,
  pub validators: BoundedVec<Validator, MaxValidators>,
  pub total_delegations: u128,
  pub redemption_rate: Dec,
  pub min_redemption_rate: Dec,
  pub max_redemption_rate: Dec,
  pub redemptions_enabled: bool,
  pub unbonding_period_seconds: u64,
  pub halted: bool,
}

impl<AccountId> HostZone<AccountId> {
  pub fn rate_within_bounds(&self) -> bool {
    self.redemption_rate >= self.min_redemption_rate &&
      self.redemption_rate <= self.max_redemption_rate
  }

  pub fn validator_mut(&mut self, address: &[u8]) -> Option<&mut Validator> {
    self.validators.iter_mut().find(|v| v.address.as_slice() == address)
  }
}

/// Registration parameters of a host zone, as submitted by the operator or set at genesis.
#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Deserialize,
  Encode,
  Eq,
  PartialEq,
  Serialize,
  TypeInfo,
)]
pub struct HostZoneConfig {
  pub chain_id: Vec<u8>,
  pub host_denom: Vec<u8>,
  pub ibc_denom: Vec<u8>,
  pub transfer_channel_id: Vec<u8>,
  pub connection_id: Vec<u8>,
  pub bech32_prefix: Vec<u8>,
  pub delegation_ica_address: Vec<u8>,
  pub redemption_ica_address: Vec<u8>,
  /// `(address, weight)` of every validator.
  pub validators: Vec<(Vec<u8>, u64)>,
  pub unbonding_period_seconds: u64,
}

/// Portion of a delegation or undelegation assigned to one validator.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct SplitDelegation {
  pub validator: RemoteAddress,
  pub amount: u128,
}

#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct DelegateCallback {
  pub host_zone_id: ChainId,
  pub deposit_record_id: u64,
  pub splits: Vec<SplitDelegation>,
}

#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct UndelegateCallback {
  pub host_zone_id: ChainId,
  pub epoch_numbers: Vec<u64>,
  pub splits: Vec<SplitDelegation>,
}

/// Exit transfer of unbonded tokens back to the deposit address.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct RedemptionCallback {
  pub host_zone_id: ChainId,
  pub epoch_numbers: Vec<u64>,
}

#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct ClaimCallback {
  pub user_redemption_record_id: RedemptionId,
  pub chain_id: ChainId,
  pub epoch_number: u64,
}

#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct DetokenizeCallback {
  pub chain_id: ChainId,
  pub denom: Denom,
}
