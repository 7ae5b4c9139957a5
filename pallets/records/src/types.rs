use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::frame_support::{traits::ConstU32, BoundedVec};
use primitives::{ChainId, Coin, Denom, RedemptionId, RemoteAddress};
use scale_info::TypeInfo;

/// Host zones tracked per epoch-unbonding record.
pub type MaxHostZoneUnbondings = ConstU32<32>;

/// Redemption records attached to a single host zone unbonding.
pub type MaxUserRedemptionIds = ConstU32<1_000>;

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum DepositRecordSource {
  Stride,
  WithdrawalIca,
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum DepositRecordStatus {
  TransferQueue,
  TransferInProgress,
  DelegationQueue,
  DelegationInProgress,
}

/// Native tokens collected on this chain for one host zone and deposit epoch.
#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct DepositRecord {
  pub id: u64,
  pub amount: u128,
  /// Host denom of the deposited tokens.
  pub denom: Denom,
  pub host_zone_id: ChainId,
  pub deposit_epoch_number: u64,
  pub source: DepositRecordSource,
  pub status: DepositRecordStatus,
  pub delegation_txs_in_progress: u64,
}

/// Unbonding state of one host zone within one epoch.
///
/// Variants are append-only: the SCALE index of each status is part of the stored format.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum HostZoneUnbondingStatus {
  UnbondingQueue,
  UnbondingInProgress,
  ExitTransferQueue,
  ExitTransferInProgress,
  Claimable,
  UnbondingRetryQueue,
}

#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct HostZoneUnbonding {
  pub host_zone_id: ChainId,
  pub st_token_amount: u128,
  pub native_token_amount: u128,
  pub st_tokens_to_burn: u128,
  pub native_tokens_to_unbond: u128,
  pub claimable_native_tokens: u128,
  pub undelegation_txs_in_progress: u64,
  pub user_redemption_record_ids: BoundedVec<RedemptionId, MaxUserRedemptionIds>,
  pub status: HostZoneUnbondingStatus,
  /// Unix seconds after which the unbonded tokens can leave the host.
  pub unbonding_time: u64,
}

impl HostZoneUnbonding {
  pub fn new(host_zone_id: ChainId) -> Self {
    Self {
      host_zone_id,
      st_token_amount: 0,
      native_token_amount: 0,
      st_tokens_to_burn: 0,
      native_tokens_to_unbond: 0,
      claimable_native_tokens: 0,
      undelegation_txs_in_progress: 0,
      user_redemption_record_ids: BoundedVec::new(),
      status: HostZoneUnbondingStatus::UnbondingQueue,
      unbonding_time: 0,
    }
  }

  /// Queued for a fresh undelegation attempt at the next unbonding epoch.
  pub fn should_retry(&self) -> bool {
    self.status == HostZoneUnbondingStatus::UnbondingRetryQueue
      && self.undelegation_txs_in_progress == 0
      && self.st_token_amount > 0
  }

  /// Nothing left to claim and nothing left to track.
  pub fn is_drained(&self) -> bool {
    self.status == HostZoneUnbondingStatus::Claimable
      && self.claimable_native_tokens == 0
      && self.user_redemption_record_ids.is_empty()
  }
}

#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct EpochUnbondingRecord {
  pub epoch_number: u64,
  pub host_zone_unbondings: BoundedVec<HostZoneUnbonding, MaxHostZoneUnbondings>,
}

impl EpochUnbondingRecord {
  pub fn new(epoch_number: u64) -> Self {
    Self { epoch_number, host_zone_unbondings: BoundedVec::new() }
  }

  pub fn host_zone_unbonding(&self, chain_id: &[u8]) -> Option<&HostZoneUnbonding> {
    self
      .host_zone_unbondings
      .iter()
      .find(|cell| cell.host_zone_id.as_slice() == chain_id)
  }
}

/// One user's share of an epoch's unbonding on a host zone.
#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct UserRedemptionRecord<AccountId> {
  /// `"<chain_id>.<epoch_number>.<claimant>"`
  pub id: RedemptionId,
  pub chain_id: ChainId,
  pub epoch_number: u64,
  pub st_token_amount: u128,
  pub native_token_amount: u128,
  pub claimant: AccountId,
  /// Host-zone address the claim is paid to.
  pub receiver: RemoteAddress,
  pub claim_is_pending: bool,
}

#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum LsmTokenDepositStatus {
  DepositPending,
  TransferInProgress,
  TransferFailed,
  DetokenizationQueue,
  DetokenizationInProgress,
  DetokenizationFailed,
}

/// Tokenized delegation shares escrowed on this chain in exchange for stTokens.
#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct LsmTokenDeposit<AccountId> {
  pub deposit_id: [u8; 32],
  pub chain_id: ChainId,
  /// Share denom on the host, `"<valoper>/<record id>"`.
  pub denom: Denom,
  /// Voucher denom of the share on this chain.
  pub ibc_denom: Denom,
  pub validator_address: RemoteAddress,
  pub amount: u128,
  pub staker: AccountId,
  pub st_token: Coin,
  pub transfer_attempts: u32,
  pub status: LsmTokenDepositStatus,
}

/// Callback payload of a deposit transfer.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct TransferCallback {
  pub deposit_record_id: u64,
}

/// Callback payload of an LSM share transfer.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct LsmTransferCallback {
  pub chain_id: ChainId,
  pub denom: Denom,
}
