//! Epochs Pallet
//!
//! Keeps one clock per epoch identifier and advances it from block time. Subscribers implement
//! [`primitives::EpochHooks`] and receive `after_epoch_end` / `before_epoch_start` at every
//! boundary. A failing subscriber loses its writes for that signal; the clock still advances.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::epochs";

#[frame::pallet]
pub mod pallet {
  use super::{WeightInfo, LOG_TARGET};
  use alloc::vec::Vec;
  use frame::prelude::*;
  use polkadot_sdk::frame_support::{storage::with_storage_layer, traits::UnixTime};
  use primitives::{bounded, EpochHooks, EpochIdentifier};

  #[derive(
    Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
  )]
  pub struct EpochInfo<BlockNumber> {
    pub identifier: EpochIdentifier,
    /// Unix seconds at which epoch 1 begins.
    pub start_time: u64,
    /// Epoch length in seconds.
    pub duration: u64,
    pub current_epoch: u64,
    pub current_epoch_start_time: u64,
    pub current_epoch_start_height: BlockNumber,
    pub epoch_counting_started: bool,
  }

  impl<BlockNumber: Default> EpochInfo<BlockNumber> {
    pub fn new(identifier: EpochIdentifier, start_time: u64, duration: u64) -> Self {
      Self {
        identifier,
        start_time,
        duration,
        current_epoch: 0,
        current_epoch_start_time: start_time,
        current_epoch_start_height: BlockNumber::default(),
        epoch_counting_started: false,
      }
    }
  }

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// Block time source.
    type UnixTime: UnixTime;

    /// Subscribers notified at every epoch boundary.
    type EpochHooks: EpochHooks;

    /// Origin allowed to register new epoch identifiers.
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  #[pallet::getter(fn epoch_info)]
  pub type EpochInfos<T: Config> =
    StorageMap<_, Blake2_128Concat, EpochIdentifier, EpochInfo<BlockNumberFor<T>>, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    EpochStarted {
      identifier: EpochIdentifier,
      epoch_number: u64,
      start_time: u64,
    },
    EpochEnded {
      identifier: EpochIdentifier,
      epoch_number: u64,
    },
    EpochAdded {
      identifier: EpochIdentifier,
      start_time: u64,
      duration: u64,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    EpochAlreadyExists,
    /// Epochs must last at least one second.
    InvalidDuration,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn on_initialize(n: BlockNumberFor<T>) -> Weight {
      let now = T::UnixTime::now().as_secs();
      let infos: Vec<_> = EpochInfos::<T>::iter_values().collect();
      let mut weight = T::DbWeight::get().reads(infos.len() as u64);

      for info in infos {
        if Self::tick(info, now, n) {
          weight = weight.saturating_add(T::WeightInfo::epoch_transition());
        }
      }
      weight
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Registers a new epoch clock. Counting starts at the first block at or after
    /// `start_time`.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::add_epoch())]
    pub fn add_epoch(
      origin: OriginFor<T>,
      identifier: EpochIdentifier,
      start_time: u64,
      duration: u64,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(duration > 0, Error::<T>::InvalidDuration);
      ensure!(!EpochInfos::<T>::contains_key(&identifier), Error::<T>::EpochAlreadyExists);

      EpochInfos::<T>::insert(&identifier, EpochInfo::new(identifier.clone(), start_time, duration));
      Self::deposit_event(Event::EpochAdded { identifier, start_time, duration });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Number of the running epoch, `None` before counting starts.
    pub fn current_epoch(identifier: &[u8]) -> Option<u64> {
      let key: EpochIdentifier = bounded(identifier)?;
      EpochInfos::<T>::get(key)
        .filter(|info| info.epoch_counting_started)
        .map(|info| info.current_epoch)
    }

    /// Advances one clock by at most one epoch. Returns whether a boundary was crossed.
    pub(crate) fn tick(mut info: EpochInfo<BlockNumberFor<T>>, now: u64, n: BlockNumberFor<T>) -> bool {
      if !info.epoch_counting_started {
        if now < info.start_time {
          return false;
        }
        info.epoch_counting_started = true;
        info.current_epoch = 1;
        info.current_epoch_start_time = info.start_time;
      } else {
        let epoch_end = info.current_epoch_start_time.saturating_add(info.duration);
        if now <= epoch_end {
          return false;
        }
        Self::notify(&info.identifier, info.current_epoch, false);
        Self::deposit_event(Event::EpochEnded {
          identifier: info.identifier.clone(),
          epoch_number: info.current_epoch,
        });
        info.current_epoch = info.current_epoch.saturating_add(1);
        info.current_epoch_start_time = epoch_end;
      }
      info.current_epoch_start_height = n;

      log::info!(
        target: LOG_TARGET,
        "epoch {:?} #{} started",
        core::str::from_utf8(&info.identifier).unwrap_or_default(),
        info.current_epoch
      );
      EpochInfos::<T>::insert(&info.identifier, &info);
      Self::deposit_event(Event::EpochStarted {
        identifier: info.identifier.clone(),
        epoch_number: info.current_epoch,
        start_time: info.current_epoch_start_time,
      });
      Self::notify(&info.identifier, info.current_epoch, true);
      true
    }

    fn notify(identifier: &[u8], epoch_number: u64, starting: bool) {
      let result = with_storage_layer(|| {
        if starting {
          T::EpochHooks::before_epoch_start(identifier, epoch_number)
        } else {
          T::EpochHooks::after_epoch_end(identifier, epoch_number)
        }
      });
      if let Err(err) = result {
        log::error!(
          target: LOG_TARGET,
          "epoch hook for {:?} #{} failed: {:?}",
          core::str::from_utf8(identifier).unwrap_or_default(),
          epoch_number,
          err
        );
      }
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    /// `(identifier, start_time, duration)` of every clock.
    pub epochs: Vec<(Vec<u8>, u64, u64)>,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      for (identifier, start_time, duration) in &self.epochs {
        let identifier: EpochIdentifier =
          bounded(identifier).expect("genesis epoch identifier exceeds 32 bytes");
        assert!(*duration > 0, "genesis epoch duration must be positive");
        EpochInfos::<T>::insert(
          &identifier,
          EpochInfo::new(identifier.clone(), *start_time, *duration),
        );
      }
    }
  }
}
