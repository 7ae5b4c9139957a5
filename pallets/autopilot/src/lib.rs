//! Autopilot Pallet
//!
//! Transfer-stack middleware that reads an `autopilot` block from inbound ICS-20 packets and
//! turns the received tokens into a follow-on action:
//! - `LiquidStake`: stakes the received host tokens for the receiver, optionally forwarding the
//!   minted stTokens to a remote recipient;
//! - `RedeemStake`: redeems returning stTokens to a remote recipient;
//! - airdrop claims: re-points the sender's airdrop record at a local address.
//!
//! The inbound transfer and the action commit together or not at all. Forward transfers keep a
//! fallback address: a failed forward refunds the local receiver, a timed out one is resent.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod fallback;
pub mod parser;
pub mod router;
pub mod types;
pub use types::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::autopilot";

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::vec::Vec;
  use frame::prelude::*;
  use polkadot_sdk::frame_support::traits::UnixTime;
  use primitives::{
    AddressCodec, AirdropApi, BigEndianU64, CallbackRegistry, ChannelSlot, IbcModule,
    LiquidStaking, TokenBank, TransferApi,
  };

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// The transfer stack below the router; settles inbound packets.
    type TransferApp: IbcModule;

    /// Outbound ICS-20 transfers for forwards and their retries.
    type Transfers: TransferApi<Self::AccountId>;

    /// Registry that routes forward acknowledgements back to this pallet.
    type Callbacks: CallbackRegistry;

    type Bank: TokenBank<Self::AccountId>;

    type LiquidStaking: LiquidStaking<Self::AccountId>;

    type Airdrop: AirdropApi<Self::AccountId>;

    /// Textual form of local accounts in packets.
    type AddressCodec: AddressCodec<Self::AccountId>;

    type UnixTime: UnixTime;

    /// Relative timeout of forward transfers, in seconds.
    #[pallet::constant]
    type ForwardTransferTimeout: Get<u64>;

    /// Origin allowed to switch routes on and off.
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  #[pallet::getter(fn params)]
  pub type Params<T: Config> = StorageValue<_, AutopilotParams, ValueQuery>;

  /// Local address refunded when the forward transfer sent on a channel with a sequence fails.
  #[pallet::storage]
  #[pallet::getter(fn transfer_fallback_address)]
  pub type TransferFallbackAddresses<T: Config> = StorageDoubleMap<
    _,
    Identity,
    ChannelSlot,
    Identity,
    BigEndianU64,
    T::AccountId,
    OptionQuery,
  >;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    ParamsUpdated {
      params: AutopilotParams,
    },
    AutopilotActionExecuted {
      receiver: T::AccountId,
      action: AutopilotAction,
      amount: u128,
    },
    /// Minted stTokens left for a remote recipient.
    LiquidStakeForwarded {
      receiver: T::AccountId,
      channel_id: Vec<u8>,
      sequence: u64,
      amount: u128,
    },
    FallbackRefunded {
      fallback: T::AccountId,
      denom: Vec<u8>,
      amount: u128,
    },
    TransferResubmitted {
      channel_id: Vec<u8>,
      old_sequence: u64,
      new_sequence: u64,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Malformed `autopilot` block, receiver or forwarded packet.
    InvalidPacketMetadata,
    /// Unknown stakeibc action, or a native token sent to be staked.
    UnsupportedAction,
    HostZoneNotFound,
    /// The requested route is switched off.
    NotActive,
    InvalidAmount,
    InsufficientFunds,
    IBCTransferFailed,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::set_params())]
    pub fn set_params(
      origin: OriginFor<T>,
      stakeibc_active: bool,
      claim_active: bool,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let params = AutopilotParams { stakeibc_active, claim_active };
      Params::<T>::put(params);
      Self::deposit_event(Event::ParamsUpdated { params });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    pub(crate) fn now_secs() -> u64 {
      T::UnixTime::now().as_secs()
    }

    pub(crate) fn fallback_key(
      channel_id: &[u8],
      sequence: u64,
    ) -> Option<(ChannelSlot, BigEndianU64)> {
      Some((ChannelSlot::from_channel_id(channel_id)?, BigEndianU64::from(sequence)))
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    pub params: AutopilotParams,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      Params::<T>::put(self.params);
    }
  }
}
