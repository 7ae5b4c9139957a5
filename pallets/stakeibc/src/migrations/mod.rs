//! Storage migrations of the stakeibc pallet.

pub mod v1;
pub mod v2;

/// Host zone layout of storage versions 0 and 1, before redemptions could be toggled.
pub mod v0 {
  use crate::{Bech32Prefix, Config, HostZone, MaxValidators, Pallet, Validator};
  use codec::{Decode, Encode, MaxEncodedLen};
  use polkadot_sdk::frame_support::{storage_alias, Blake2_128Concat, BoundedVec};
  use primitives::{ChainId, ChannelId, ConnectionId, Dec, Denom, RemoteAddress};
  use scale_info::TypeInfo;

  #[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
  pub struct HostZoneV0<AccountId> {
    pub chain_id: ChainId,
    pub host_denom: Denom,
    pub ibc_denom: Denom,
    pub transfer_channel_id: ChannelId,
    pub connection_id: ConnectionId,
    pub bech32_prefix: Bech32Prefix,
    pub deposit_address: AccountId,
    pub delegation_ica_address: RemoteAddress,
    pub redemption_ica_address: RemoteAddress,
    pub validators: BoundedVec<Validator, MaxValidators>,
    pub total_delegations: u128,
    pub redemption_rate: Dec,
    pub min_redemption_rate: Dec,
    pub max_redemption_rate: Dec,
    pub unbonding_period_seconds: u64,
    pub halted: bool,
  }

  #[storage_alias]
  pub type HostZones<T: Config> = StorageMap<
    Pallet<T>,
    Blake2_128Concat,
    ChainId,
    HostZoneV0<<T as polkadot_sdk::frame_system::Config>::AccountId>,
  >;

  impl<AccountId> HostZoneV0<AccountId> {
    pub fn upgrade(self, redemptions_enabled: bool) -> HostZone<AccountId> {
      HostZone {
        chain_id: self.chain_id,
        host_denom: self.host_denom,
        ibc_denom: self.ibc_denom,
        transfer_channel_id: self.transfer_channel_id,
        connection_id: self.connection_id,
        bech32_prefix: self.bech32_prefix,
        deposit_address: self.deposit_address,
        delegation_ica_address: self.delegation_ica_address,
        redemption_ica_address: self.redemption_ica_address,
        validators: self.validators,
        total_delegations: self.total_delegations,
        redemption_rate: self.redemption_rate,
        min_redemption_rate: self.min_redemption_rate,
        max_redemption_rate: self.max_redemption_rate,
        redemptions_enabled,
        unbonding_period_seconds: self.unbonding_period_seconds,
        halted: self.halted,
      }
    }
  }
}
