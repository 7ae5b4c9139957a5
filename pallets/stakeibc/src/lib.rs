//! Stakeibc Pallet
//!
//! Liquid staking against remote proof-of-stake host zones.
//!
//! ## Deposit pipeline
//! `liquid_stake` escrows host tokens in the host zone's deposit address and mints stTokens at
//! the redemption rate. Every stride epoch the collected deposits are transferred to the
//! delegation account on the host and delegated across its validators. LSM shares follow a
//! parallel path: escrowed and rewarded at once, then transferred and detokenized.
//!
//! ## Unbonding pipeline
//! `redeem_stake` escrows stTokens into the current day epoch's batch. Every day epoch the
//! queued batches are undelegated on the host, matured undelegations are transferred back to
//! the deposit address, and users claim their share with `claim_undelegated_tokens`.
//!
//! Both pipelines advance through [`primitives::CallbackHandler`] as acknowledgements arrive.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod callbacks;
pub mod deposits;
pub mod hooks;
pub mod migrations;
pub mod types;
pub mod unbonding;
pub use types::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::stakeibc";

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper {
  /// Makes `ibc_denom` resolve to `base_denom` received over the `path` hops.
  fn register_denom_trace(ibc_denom: &[u8], path: &[u8], base_denom: &[u8]);
}

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::vec::Vec;
  use frame::deps::{frame_support::PalletId, sp_runtime::traits::AccountIdConversion};
  use frame::prelude::*;
  use polkadot_sdk::frame_support::traits::UnixTime;
  use primitives::{
    bounded,
    staking::{DEFAULT_MAX_REDEMPTION_RATE, DEFAULT_MIN_REDEMPTION_RATE},
    timeouts::packet_timeout,
    AddressCodec, ChainId, Dec, DenomTraceResolver, EpochIdentifier, IcaApi, RemoteAddress,
    TokenBank,
  };

  pub(crate) const STORAGE_VERSION: StorageVersion = StorageVersion::new(2);

  #[pallet::config]
  pub trait Config:
    frame_system::Config<RuntimeEvent: From<Event<Self>>> + pallet_records::Config
  {
    /// Balances of host vouchers, LSM shares and stTokens.
    type Bank: TokenBank<Self::AccountId>;

    /// Interchain-account controller driving the delegation and redemption accounts.
    type Ica: IcaApi;

    /// Textual form of local accounts in redemption record ids and packets.
    type AddressCodec: AddressCodec<Self::AccountId>;

    /// Resolves LSM share vouchers to their host denom.
    type DenomTraces: DenomTraceResolver;

    /// Seed of every host zone's deposit address.
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Relative timeout of interchain-account transactions, in seconds.
    #[pallet::constant]
    type IcaTimeout: Get<u64>;

    /// Origin allowed to register host zones, post redemption rates and recover stuck state.
    type OperatorOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    type WeightInfo: WeightInfo;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper;
  }

  #[pallet::pallet]
  #[pallet::storage_version(STORAGE_VERSION)]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  #[pallet::getter(fn host_zones)]
  pub type HostZones<T: Config> =
    StorageMap<_, Blake2_128Concat, ChainId, HostZone<T::AccountId>, OptionQuery>;

  /// Latest epoch number seen per epoch identifier.
  #[pallet::storage]
  #[pallet::getter(fn epoch_trackers)]
  pub type EpochTrackers<T: Config> =
    StorageMap<_, Blake2_128Concat, EpochIdentifier, u64, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    HostZoneRegistered {
      chain_id: ChainId,
      deposit_address: T::AccountId,
    },
    LiquidStaked {
      staker: T::AccountId,
      chain_id: ChainId,
      native_amount: u128,
      st_amount: u128,
    },
    LsmLiquidStaked {
      staker: T::AccountId,
      chain_id: ChainId,
      validator: RemoteAddress,
      amount: u128,
      st_amount: u128,
    },
    DelegationSubmitted {
      chain_id: ChainId,
      deposit_record_id: u64,
      amount: u128,
    },
    RedemptionRequested {
      redeemer: T::AccountId,
      chain_id: ChainId,
      epoch_number: u64,
      st_amount: u128,
      receiver: RemoteAddress,
    },
    UnbondingSubmitted {
      chain_id: ChainId,
      epoch_numbers: Vec<u64>,
      native_amount: u128,
    },
    ExitTransferSubmitted {
      chain_id: ChainId,
      epoch_numbers: Vec<u64>,
      native_amount: u128,
    },
    ClaimSubmitted {
      claimant: T::AccountId,
      chain_id: ChainId,
      epoch_number: u64,
      amount: u128,
    },
    RedemptionRateUpdated {
      chain_id: ChainId,
      redemption_rate: Dec,
    },
    /// The posted redemption rate left the safety bounds; staking on the host zone stops.
    HostZoneHalted {
      chain_id: ChainId,
      redemption_rate: Dec,
    },
    HostZoneResumed {
      chain_id: ChainId,
    },
    RedemptionsToggled {
      chain_id: ChainId,
      enabled: bool,
    },
    UnbondingRecordsRestored {
      chain_id: ChainId,
      epoch_numbers: Vec<u64>,
    },
    EpochUnbondingRecordRemoved {
      epoch_number: u64,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    HostZoneNotFound,
    HostZoneAlreadyExists,
    HostZoneHalted,
    /// Zero amount, or an amount worth zero tokens at the current rate.
    InvalidAmount,
    InsufficientFunds,
    RedemptionsDisabled,
    /// Receiver is not an address of the host zone.
    InvalidReceiver,
    RedemptionRateOutOfBounds,
    /// Identifier too long, validator list too long or validators without weight.
    InvalidHostZone,
    NoValidators,
    ValidatorNotFound,
    /// Undelegation exceeds the tokens delegated on the host.
    InsufficientDelegations,
    /// The current epoch's host zone unbonding is no longer collecting redemptions.
    UnbondingNotQueued,
    ClaimNotReady,
    ClaimPending,
    /// The voucher is not an LSM share of a registered host zone.
    InvalidLsmDenom,
    LsmDepositAlreadyExists,
    ICATxFailed,
    IBCTransferFailed,
    InvalidCallbackArgs,
    EpochNotStarted,
    InternalInvariant,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    #[pallet::call_index(0)]
    #[pallet::weight(<T as Config>::WeightInfo::register_host_zone())]
    pub fn register_host_zone(origin: OriginFor<T>, config: HostZoneConfig) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      Self::do_register_host_zone(config)
    }

    /// Deposits `amount` of the host zone's voucher and mints stTokens at the redemption rate.
    #[pallet::call_index(1)]
    #[pallet::weight(<T as Config>::WeightInfo::liquid_stake())]
    pub fn liquid_stake(origin: OriginFor<T>, amount: u128, host_denom: Vec<u8>) -> DispatchResult {
      let staker = ensure_signed(origin)?;
      Self::do_liquid_stake(&staker, amount, &host_denom).map(|_| ())
    }

    /// Queues `amount` stTokens for unbonding in the current day epoch, paid out to `receiver`
    /// on the host zone.
    #[pallet::call_index(2)]
    #[pallet::weight(<T as Config>::WeightInfo::redeem_stake())]
    pub fn redeem_stake(
      origin: OriginFor<T>,
      amount: u128,
      host_zone: ChainId,
      receiver: RemoteAddress,
    ) -> DispatchResult {
      let redeemer = ensure_signed(origin)?;
      Self::do_redeem_stake(&redeemer, amount, &host_zone, &receiver)
    }

    /// Sends the claimant's unbonded tokens of `epoch_number` to their receiver. Anyone may
    /// trigger a claim.
    #[pallet::call_index(3)]
    #[pallet::weight(<T as Config>::WeightInfo::claim_undelegated_tokens())]
    pub fn claim_undelegated_tokens(
      origin: OriginFor<T>,
      host_zone: ChainId,
      epoch_number: u64,
      claimant: T::AccountId,
    ) -> DispatchResult {
      ensure_signed(origin)?;
      Self::do_claim_undelegated_tokens(&host_zone, epoch_number, &claimant)
    }

    /// Exchanges tokenized delegation shares for stTokens.
    #[pallet::call_index(4)]
    #[pallet::weight(<T as Config>::WeightInfo::lsm_liquid_stake())]
    pub fn lsm_liquid_stake(
      origin: OriginFor<T>,
      amount: u128,
      lsm_ibc_denom: Vec<u8>,
    ) -> DispatchResult {
      let staker = ensure_signed(origin)?;
      Self::do_lsm_liquid_stake(&staker, amount, &lsm_ibc_denom)
    }

    /// Posts a new redemption rate. A rate outside the host zone's bounds halts the zone.
    #[pallet::call_index(5)]
    #[pallet::weight(<T as Config>::WeightInfo::update_redemption_rate())]
    pub fn update_redemption_rate(
      origin: OriginFor<T>,
      host_zone: ChainId,
      redemption_rate: Dec,
    ) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      HostZones::<T>::try_mutate(&host_zone, |maybe| -> DispatchResult {
        let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
        zone.redemption_rate = redemption_rate;
        if !zone.rate_within_bounds() {
          zone.halted = true;
          log::warn!(
            target: LOG_TARGET,
            "redemption rate {:?} outside [{:?}, {:?}], halting host zone",
            redemption_rate,
            zone.min_redemption_rate,
            zone.max_redemption_rate
          );
          Self::deposit_event(Event::HostZoneHalted {
            chain_id: host_zone.clone(),
            redemption_rate,
          });
        }
        Ok(())
      })?;
      Self::deposit_event(Event::RedemptionRateUpdated { chain_id: host_zone, redemption_rate });
      Ok(())
    }

    #[pallet::call_index(6)]
    #[pallet::weight(<T as Config>::WeightInfo::resume_host_zone())]
    pub fn resume_host_zone(origin: OriginFor<T>, host_zone: ChainId) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      HostZones::<T>::try_mutate(&host_zone, |maybe| -> DispatchResult {
        let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
        ensure!(zone.rate_within_bounds(), Error::<T>::RedemptionRateOutOfBounds);
        zone.halted = false;
        Ok(())
      })?;
      Self::deposit_event(Event::HostZoneResumed { chain_id: host_zone });
      Ok(())
    }

    #[pallet::call_index(7)]
    #[pallet::weight(<T as Config>::WeightInfo::set_redemptions_enabled())]
    pub fn set_redemptions_enabled(
      origin: OriginFor<T>,
      host_zone: ChainId,
      enabled: bool,
    ) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      HostZones::<T>::try_mutate(&host_zone, |maybe| -> DispatchResult {
        let zone = maybe.as_mut().ok_or(Error::<T>::HostZoneNotFound)?;
        zone.redemptions_enabled = enabled;
        Ok(())
      })?;
      Self::deposit_event(Event::RedemptionsToggled { chain_id: host_zone, enabled });
      Ok(())
    }

    /// Moves undelegations that timed out back into the retry queue.
    #[pallet::call_index(8)]
    #[pallet::weight(<T as Config>::WeightInfo::restore_unbonding_records())]
    pub fn restore_unbonding_records(origin: OriginFor<T>, host_zone: ChainId) -> DispatchResult {
      T::OperatorOrigin::ensure_origin(origin)?;
      Self::do_restore_unbonding_records(&host_zone)
    }
  }

  impl<T: Config> Pallet<T> {
    /// Local account holding the deposits and escrow of `chain_id`.
    pub fn deposit_address(chain_id: &[u8]) -> T::AccountId {
      T::PalletId::get().into_sub_account_truncating(chain_id)
    }

    pub fn get_host_zone(chain_id: &[u8]) -> Result<HostZone<T::AccountId>, DispatchError> {
      let key: ChainId = bounded(chain_id).ok_or(Error::<T>::HostZoneNotFound)?;
      HostZones::<T>::get(key).ok_or_else(|| Error::<T>::HostZoneNotFound.into())
    }

    /// A host zone that accepts new stake: registered, not halted, rate within bounds.
    pub(crate) fn active_host_zone(
      chain_id: &[u8],
    ) -> Result<HostZone<T::AccountId>, DispatchError> {
      let zone = Self::get_host_zone(chain_id)?;
      ensure!(!zone.halted, Error::<T>::HostZoneHalted);
      ensure!(zone.rate_within_bounds(), Error::<T>::RedemptionRateOutOfBounds);
      Ok(zone)
    }

    pub fn host_zone_by_denom(host_denom: &[u8]) -> Option<HostZone<T::AccountId>> {
      HostZones::<T>::iter_values().find(|zone| zone.host_denom.as_slice() == host_denom)
    }

    pub fn host_zone_by_transfer_channel(channel_id: &[u8]) -> Option<HostZone<T::AccountId>> {
      HostZones::<T>::iter_values()
        .find(|zone| zone.transfer_channel_id.as_slice() == channel_id)
    }

    pub fn current_epoch(identifier: &[u8]) -> Option<u64> {
      let key: EpochIdentifier = bounded(identifier)?;
      EpochTrackers::<T>::get(key)
    }

    pub(crate) fn now_secs() -> u64 {
      <T as pallet_records::Config>::UnixTime::now().as_secs()
    }

    pub(crate) fn ica_timeout() -> u64 {
      packet_timeout(Self::now_secs(), T::IcaTimeout::get())
    }

    pub(crate) fn decrement(counter: u64) -> Result<u64, DispatchError> {
      counter.checked_sub(1).ok_or_else(|| {
        polkadot_sdk::frame_support::defensive!("stakeibc: in-flight counter underflow");
        Error::<T>::InternalInvariant.into()
      })
    }

    pub(crate) fn do_register_host_zone(config: HostZoneConfig) -> DispatchResult {
      let invalid = || Error::<T>::InvalidHostZone;
      let chain_id: ChainId = bounded(&config.chain_id).ok_or_else(invalid)?;
      ensure!(!HostZones::<T>::contains_key(&chain_id), Error::<T>::HostZoneAlreadyExists);
      ensure!(
        Self::host_zone_by_denom(&config.host_denom).is_none(),
        Error::<T>::HostZoneAlreadyExists
      );

      let validators = config
        .validators
        .iter()
        .map(|(address, weight)| {
          Ok(Validator { address: bounded(address).ok_or_else(invalid)?, weight: *weight, delegation: 0 })
        })
        .collect::<Result<Vec<_>, Error<T>>>()?;
      ensure!(validators.iter().any(|v| v.weight > 0), Error::<T>::NoValidators);

      let deposit_address = Self::deposit_address(&chain_id);
      let zone = HostZone {
        chain_id: chain_id.clone(),
        host_denom: bounded(&config.host_denom).ok_or_else(invalid)?,
        ibc_denom: bounded(&config.ibc_denom).ok_or_else(invalid)?,
        transfer_channel_id: bounded(&config.transfer_channel_id).ok_or_else(invalid)?,
        connection_id: bounded(&config.connection_id).ok_or_else(invalid)?,
        bech32_prefix: bounded(&config.bech32_prefix).ok_or_else(invalid)?,
        deposit_address: deposit_address.clone(),
        delegation_ica_address: bounded(&config.delegation_ica_address).ok_or_else(invalid)?,
        redemption_ica_address: bounded(&config.redemption_ica_address).ok_or_else(invalid)?,
        validators: BoundedVec::try_from(validators).map_err(|_| invalid())?,
        total_delegations: 0,
        redemption_rate: Dec::from_u32(1),
        min_redemption_rate: DEFAULT_MIN_REDEMPTION_RATE,
        max_redemption_rate: DEFAULT_MAX_REDEMPTION_RATE,
        redemptions_enabled: true,
        unbonding_period_seconds: config.unbonding_period_seconds,
        halted: false,
      };
      HostZones::<T>::insert(&chain_id, zone);

      log::info!(target: LOG_TARGET, "registered host zone {:?}", chain_id);
      Self::deposit_event(Event::HostZoneRegistered { chain_id, deposit_address });
      Ok(())
    }

    /// Consistency of host zones and the records they drive.
    pub fn do_try_state() -> Result<(), DispatchError> {
      for zone in HostZones::<T>::iter_values() {
        let delegated = zone
          .validators
          .iter()
          .fold(0u128, |sum, v| sum.saturating_add(v.delegation));
        ensure!(
          delegated == zone.total_delegations,
          "validator delegations disagree with the host zone total"
        );
      }
      pallet_records::Pallet::<T>::do_try_state()
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    pub host_zones: Vec<HostZoneConfig>,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      for config in &self.host_zones {
        Pallet::<T>::do_register_host_zone(config.clone())
          .expect("genesis host zone must be valid");
      }
    }
  }
}

impl<T: Config> primitives::LiquidStaking<T::AccountId> for Pallet<T> {
  fn host_zone_by_host_denom(host_denom: &[u8]) -> Option<primitives::HostZoneSummary> {
    Self::host_zone_by_denom(host_denom).map(|zone| primitives::HostZoneSummary {
      chain_id: zone.chain_id,
      host_denom: zone.host_denom,
      ibc_denom: zone.ibc_denom,
      transfer_channel_id: zone.transfer_channel_id,
    })
  }

  fn liquid_stake(
    staker: &T::AccountId,
    amount: u128,
    host_denom: &[u8],
  ) -> Result<primitives::Coin, polkadot_sdk::sp_runtime::DispatchError> {
    Self::do_liquid_stake(staker, amount, host_denom)
  }

  fn redeem_stake(
    redeemer: &T::AccountId,
    amount: u128,
    chain_id: &[u8],
    receiver: &[u8],
  ) -> polkadot_sdk::sp_runtime::DispatchResult {
    Self::do_redeem_stake(redeemer, amount, chain_id, receiver)
  }
}
