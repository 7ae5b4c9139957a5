//! Records Pallet
//!
//! Owns the state machines of the liquid staking pipelines:
//! - deposit records, one per host zone and deposit epoch while tokens wait to be transferred;
//! - epoch-unbonding records, holding one host zone unbonding per host zone and unbonding epoch;
//! - user redemption records, each a claim on part of a host zone unbonding;
//! - LSM token deposits, tokenized shares waiting to be detokenized on the host.
//!
//! The pallet also submits the ICS-20 transfers that move deposits and LSM shares to the host
//! and consumes their acknowledgements through [`primitives::CallbackHandler`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod callbacks;
pub mod migrations;
pub mod types;
pub use types::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::records";

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::{format, vec::Vec};
  use frame::prelude::*;
  use polkadot_sdk::frame_support::traits::UnixTime;
  use primitives::{
    bounded, constants::ports::TRANSFER_PORT, timeouts::packet_timeout, AckStatus, BigEndianU64,
    CallbackKind, CallbackRegistry, ChainId, Denom, MsgTransfer, RedemptionId, TransferApi,
  };

  const STORAGE_VERSION: StorageVersion = StorageVersion::new(1);

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// Outbound ICS-20 transfers.
    type Transfers: TransferApi<Self::AccountId>;

    /// Registry that routes transfer acknowledgements back to this pallet.
    type Callbacks: CallbackRegistry;

    /// Wall clock used for packet timeouts.
    type UnixTime: UnixTime;

    /// Origin allowed to recover failed LSM deposits.
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Relative timeout of deposit transfers, in seconds.
    #[pallet::constant]
    type TransferTimeout: Get<u64>;

    /// Relative timeout of LSM share transfers, in seconds.
    #[pallet::constant]
    type LsmTransferTimeout: Get<u64>;

    /// Timed out LSM transfers are retried until this many attempts were made.
    #[pallet::constant]
    type MaxLsmTransferAttempts: Get<u32>;

    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  #[pallet::storage_version(STORAGE_VERSION)]
  pub struct Pallet<T>(_);

  /// Deposit records keyed by big-endian id, iterated in id order.
  #[pallet::storage]
  #[pallet::getter(fn deposit_records)]
  pub type DepositRecords<T: Config> =
    StorageMap<_, Identity, BigEndianU64, DepositRecord, OptionQuery>;

  /// Id assigned to the next appended deposit record.
  #[pallet::storage]
  #[pallet::getter(fn deposit_record_count)]
  pub type DepositRecordCount<T: Config> = StorageValue<_, u64, ValueQuery>;

  /// Epoch-unbonding records keyed by big-endian epoch number, iterated in epoch order.
  #[pallet::storage]
  #[pallet::getter(fn epoch_unbonding_records)]
  pub type EpochUnbondingRecords<T: Config> =
    StorageMap<_, Identity, BigEndianU64, EpochUnbondingRecord, OptionQuery>;

  #[pallet::storage]
  #[pallet::getter(fn user_redemption_records)]
  pub type UserRedemptionRecords<T: Config> =
    StorageMap<_, Blake2_128Concat, RedemptionId, UserRedemptionRecord<T::AccountId>, OptionQuery>;

  /// LSM deposits by host zone and share denom.
  #[pallet::storage]
  #[pallet::getter(fn lsm_token_deposits)]
  pub type LsmTokenDeposits<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    ChainId,
    Blake2_128Concat,
    Denom,
    LsmTokenDeposit<T::AccountId>,
    OptionQuery,
  >;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    DepositRecordCreated {
      id: u64,
      host_zone_id: ChainId,
      deposit_epoch_number: u64,
    },
    DepositRecordUpdated {
      id: u64,
      status: DepositRecordStatus,
    },
    DepositRecordRemoved {
      id: u64,
    },
    NativeTransferAcknowledged {
      deposit_record_id: u64,
      status: AckStatus,
    },
    LsmTransferAcknowledged {
      chain_id: ChainId,
      denom: Denom,
      status: AckStatus,
    },
    /// A failed LSM deposit was put back into its pipeline.
    LsmTokenDepositReset {
      chain_id: ChainId,
      denom: Denom,
      status: LsmTokenDepositStatus,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    UnknownDepositRecord,
    UnknownLsmDeposit,
    EpochUnbondingRecordNotFound,
    HostZoneUnbondingNotFound,
    UserRedemptionRecordNotFound,
    /// An epoch-unbonding record cannot track more host zones.
    TooManyHostZoneUnbondings,
    /// A host zone unbonding cannot track more redemption records.
    TooManyUserRedemptions,
    IBCTransferFailed,
    InvalidCallbackArgs,
    /// Only failed LSM deposits can be reset.
    InvalidLsmDepositStatus,
    /// Stored amounts disagree with each other.
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
    /// Puts a failed LSM deposit back into its pipeline.
    ///
    /// A failed transfer returns to `DepositPending` with a fresh attempt budget; a failed
    /// detokenization returns to `DetokenizationQueue`.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::reset_lsm_token_deposit())]
    pub fn reset_lsm_token_deposit(
      origin: OriginFor<T>,
      chain_id: ChainId,
      denom: Denom,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;

      let status = LsmTokenDeposits::<T>::try_mutate(&chain_id, &denom, |maybe| {
        let deposit = maybe.as_mut().ok_or(Error::<T>::UnknownLsmDeposit)?;
        deposit.status = match deposit.status {
          LsmTokenDepositStatus::TransferFailed => {
            deposit.transfer_attempts = 0;
            LsmTokenDepositStatus::DepositPending
          },
          LsmTokenDepositStatus::DetokenizationFailed => LsmTokenDepositStatus::DetokenizationQueue,
          _ => return Err(Error::<T>::InvalidLsmDepositStatus),
        };
        Ok(deposit.status)
      })?;

      Self::deposit_event(Event::LsmTokenDepositReset { chain_id, denom, status });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    // Deposit records

    pub fn get_deposit_record(id: u64) -> Option<DepositRecord> {
      DepositRecords::<T>::get(BigEndianU64::from(id))
    }

    pub fn set_deposit_record(record: DepositRecord) {
      DepositRecords::<T>::insert(BigEndianU64::from(record.id), record);
    }

    pub fn remove_deposit_record(id: u64) {
      DepositRecords::<T>::remove(BigEndianU64::from(id));
      Self::deposit_event(Event::DepositRecordRemoved { id });
    }

    /// Stores `record` under the next free id and returns that id.
    pub fn append_deposit_record(mut record: DepositRecord) -> u64 {
      let id = DepositRecordCount::<T>::mutate(|count| {
        let id = *count;
        *count = count.saturating_add(1);
        id
      });
      record.id = id;
      Self::deposit_event(Event::DepositRecordCreated {
        id,
        host_zone_id: record.host_zone_id.clone(),
        deposit_epoch_number: record.deposit_epoch_number,
      });
      Self::set_deposit_record(record);
      id
    }

    pub fn all_deposit_records() -> Vec<DepositRecord> {
      DepositRecords::<T>::iter_values().collect()
    }

    pub fn deposit_record_by_epoch_and_chain(
      epoch_number: u64,
      chain_id: &[u8],
    ) -> Option<DepositRecord> {
      DepositRecords::<T>::iter_values().find(|record| {
        record.deposit_epoch_number == epoch_number && record.host_zone_id.as_slice() == chain_id
      })
    }

    /// The record still collecting deposits for `(chain_id, epoch_number)`.
    pub fn transfer_queue_record(chain_id: &[u8], epoch_number: u64) -> Option<DepositRecord> {
      DepositRecords::<T>::iter_values().find(|record| {
        record.status == DepositRecordStatus::TransferQueue
          && record.deposit_epoch_number == epoch_number
          && record.host_zone_id.as_slice() == chain_id
      })
    }

    pub(crate) fn update_deposit_status(mut record: DepositRecord, status: DepositRecordStatus) {
      let id = record.id;
      record.status = status;
      Self::set_deposit_record(record);
      Self::deposit_event(Event::DepositRecordUpdated { id, status });
    }

    // Epoch-unbonding records

    pub fn get_epoch_unbonding_record(epoch_number: u64) -> Option<EpochUnbondingRecord> {
      EpochUnbondingRecords::<T>::get(BigEndianU64::from(epoch_number))
    }

    pub fn set_epoch_unbonding_record(record: EpochUnbondingRecord) {
      EpochUnbondingRecords::<T>::insert(BigEndianU64::from(record.epoch_number), record);
    }

    pub fn remove_epoch_unbonding_record(epoch_number: u64) {
      EpochUnbondingRecords::<T>::remove(BigEndianU64::from(epoch_number));
    }

    /// Creates an empty record for `epoch_number`, keeping an existing one.
    pub fn create_epoch_unbonding_record(epoch_number: u64) {
      let key = BigEndianU64::from(epoch_number);
      if !EpochUnbondingRecords::<T>::contains_key(key) {
        EpochUnbondingRecords::<T>::insert(key, EpochUnbondingRecord::new(epoch_number));
      }
    }

    pub fn all_epoch_unbonding_records() -> Vec<EpochUnbondingRecord> {
      EpochUnbondingRecords::<T>::iter_values().collect()
    }

    pub fn get_host_zone_unbonding(epoch_number: u64, chain_id: &[u8]) -> Option<HostZoneUnbonding> {
      Self::get_epoch_unbonding_record(epoch_number)?
        .host_zone_unbonding(chain_id)
        .cloned()
    }

    /// Replaces the host zone unbonding of `unbonding.host_zone_id`, or appends it.
    pub fn set_host_zone_unbonding(epoch_number: u64, unbonding: HostZoneUnbonding) -> DispatchResult {
      EpochUnbondingRecords::<T>::try_mutate(BigEndianU64::from(epoch_number), |maybe| {
        let record = maybe
          .as_mut()
          .ok_or(Error::<T>::EpochUnbondingRecordNotFound)?;
        match record
          .host_zone_unbondings
          .iter_mut()
          .find(|cell| cell.host_zone_id == unbonding.host_zone_id)
        {
          Some(existing) => *existing = unbonding,
          None => record
            .host_zone_unbondings
            .try_push(unbonding)
            .map_err(|_| Error::<T>::TooManyHostZoneUnbondings)?,
        }
        Ok(())
      })
    }

    /// Host zone unbondings of `chain_id` in any of `statuses`, with their epoch, in epoch order.
    pub fn host_zone_unbondings_by_status(
      chain_id: &[u8],
      statuses: &[HostZoneUnbondingStatus],
    ) -> Vec<(u64, HostZoneUnbonding)> {
      EpochUnbondingRecords::<T>::iter_values()
        .filter_map(|record| {
          record
            .host_zone_unbonding(chain_id)
            .filter(|cell| statuses.contains(&cell.status))
            .map(|cell| (record.epoch_number, cell.clone()))
        })
        .collect()
    }

    // User redemption records

    /// Formats `"<chain_id>.<epoch_number>.<claimant>"`.
    pub fn user_redemption_record_id(
      chain_id: &[u8],
      epoch_number: u64,
      claimant: &[u8],
    ) -> Option<RedemptionId> {
      let mut id = chain_id.to_vec();
      id.extend_from_slice(format!(".{}.", epoch_number).as_bytes());
      id.extend_from_slice(claimant);
      bounded(&id)
    }

    pub fn get_user_redemption_record(id: &[u8]) -> Option<UserRedemptionRecord<T::AccountId>> {
      let key: RedemptionId = bounded(id)?;
      UserRedemptionRecords::<T>::get(key)
    }

    pub fn set_user_redemption_record(record: UserRedemptionRecord<T::AccountId>) {
      UserRedemptionRecords::<T>::insert(record.id.clone(), record);
    }

    pub fn remove_user_redemption_record(id: &RedemptionId) {
      UserRedemptionRecords::<T>::remove(id);
    }

    pub fn all_user_redemption_records() -> Vec<UserRedemptionRecord<T::AccountId>> {
      UserRedemptionRecords::<T>::iter_values().collect()
    }

    // LSM token deposits

    pub fn get_lsm_deposit(chain_id: &ChainId, denom: &Denom) -> Option<LsmTokenDeposit<T::AccountId>> {
      LsmTokenDeposits::<T>::get(chain_id, denom)
    }

    pub fn set_lsm_deposit(deposit: LsmTokenDeposit<T::AccountId>) {
      LsmTokenDeposits::<T>::insert(deposit.chain_id.clone(), deposit.denom.clone(), deposit);
    }

    pub fn remove_lsm_deposit(chain_id: &ChainId, denom: &Denom) {
      LsmTokenDeposits::<T>::remove(chain_id, denom);
    }

    pub fn lsm_deposits_for_chain(chain_id: &ChainId) -> Vec<LsmTokenDeposit<T::AccountId>> {
      LsmTokenDeposits::<T>::iter_prefix_values(chain_id).collect()
    }

    pub fn lsm_deposits_with_status(
      chain_id: &ChainId,
      status: LsmTokenDepositStatus,
    ) -> Vec<LsmTokenDeposit<T::AccountId>> {
      LsmTokenDeposits::<T>::iter_prefix_values(chain_id)
        .filter(|deposit| deposit.status == status)
        .collect()
    }

    pub fn update_lsm_deposit_status(
      chain_id: &ChainId,
      denom: &Denom,
      status: LsmTokenDepositStatus,
    ) -> DispatchResult {
      LsmTokenDeposits::<T>::try_mutate(chain_id, denom, |maybe| {
        let deposit = maybe.as_mut().ok_or(Error::<T>::UnknownLsmDeposit)?;
        deposit.status = status;
        Ok(())
      })
    }

    // Outbound transfers

    /// Sends the tokens of a `TransferQueue` deposit record from `sender` to the host.
    pub fn transfer_native_tokens(
      deposit_record_id: u64,
      sender: &T::AccountId,
      receiver: &[u8],
      channel_id: &[u8],
      ibc_denom: &[u8],
    ) -> DispatchResult {
      let record =
        Self::get_deposit_record(deposit_record_id).ok_or(Error::<T>::UnknownDepositRecord)?;

      let msg = MsgTransfer {
        source_port: TRANSFER_PORT.to_vec(),
        source_channel: channel_id.to_vec(),
        denom: ibc_denom.to_vec(),
        amount: record.amount,
        sender: sender.clone(),
        receiver: receiver.to_vec(),
        timeout_timestamp: packet_timeout(T::UnixTime::now().as_secs(), T::TransferTimeout::get()),
        memo: Vec::new(),
      };
      let sequence = T::Transfers::transfer(msg).map_err(|err| {
        log::error!(
          target: LOG_TARGET,
          "deposit record {} transfer submission failed: {:?}",
          deposit_record_id,
          err
        );
        Error::<T>::IBCTransferFailed
      })?;

      T::Callbacks::register_callback(
        TRANSFER_PORT,
        channel_id,
        sequence,
        CallbackKind::NativeTransfer,
        TransferCallback { deposit_record_id }.encode(),
      )?;

      log::info!(
        target: LOG_TARGET,
        "deposit record {} transferring {} with sequence {}",
        deposit_record_id,
        record.amount,
        sequence
      );
      Self::update_deposit_status(record, DepositRecordStatus::TransferInProgress);
      Ok(())
    }

    /// Sends an escrowed LSM share from `sender` to the host for detokenization.
    pub fn transfer_lsm_token(
      chain_id: &ChainId,
      denom: &Denom,
      sender: &T::AccountId,
      receiver: &[u8],
      channel_id: &[u8],
    ) -> DispatchResult {
      let mut deposit =
        Self::get_lsm_deposit(chain_id, denom).ok_or(Error::<T>::UnknownLsmDeposit)?;

      let msg = MsgTransfer {
        source_port: TRANSFER_PORT.to_vec(),
        source_channel: channel_id.to_vec(),
        denom: deposit.ibc_denom.to_vec(),
        amount: deposit.amount,
        sender: sender.clone(),
        receiver: receiver.to_vec(),
        timeout_timestamp: packet_timeout(
          T::UnixTime::now().as_secs(),
          T::LsmTransferTimeout::get(),
        ),
        memo: Vec::new(),
      };
      let sequence = T::Transfers::transfer(msg).map_err(|err| {
        log::error!(target: LOG_TARGET, "LSM share transfer submission failed: {:?}", err);
        Error::<T>::IBCTransferFailed
      })?;

      T::Callbacks::register_callback(
        TRANSFER_PORT,
        channel_id,
        sequence,
        CallbackKind::LsmTransfer,
        LsmTransferCallback { chain_id: chain_id.clone(), denom: denom.clone() }.encode(),
      )?;

      deposit.transfer_attempts = deposit.transfer_attempts.saturating_add(1);
      deposit.status = LsmTokenDepositStatus::TransferInProgress;
      Self::set_lsm_deposit(deposit);
      Ok(())
    }

    /// `a - b`, reporting an underflow as a broken invariant.
    pub fn checked_sub(a: u128, b: u128) -> Result<u128, DispatchError> {
      a.checked_sub(b).ok_or_else(|| {
        polkadot_sdk::frame_support::defensive!("records: amount underflow");
        Error::<T>::InternalInvariant.into()
      })
    }

    /// Consistency of the stored records.
    pub fn do_try_state() -> Result<(), DispatchError> {
      for record in DepositRecords::<T>::iter_values() {
        ensure!(
          (record.status == DepositRecordStatus::DelegationInProgress)
            == (record.delegation_txs_in_progress > 0),
          "deposit record delegation counter disagrees with its status"
        );
      }

      for record in EpochUnbondingRecords::<T>::iter_values() {
        for cell in record.host_zone_unbondings.iter() {
          if cell.undelegation_txs_in_progress > 0 {
            ensure!(
              cell.status == HostZoneUnbondingStatus::UnbondingInProgress,
              "undelegations in flight outside UnbondingInProgress"
            );
          }
          if cell.status == HostZoneUnbondingStatus::Claimable {
            ensure!(
              cell.st_tokens_to_burn == 0 && cell.native_tokens_to_unbond == 0,
              "claimable host zone unbonding still has tokens to burn or unbond"
            );
          }

          let users: Vec<_> = cell
            .user_redemption_record_ids
            .iter()
            .filter_map(|id| UserRedemptionRecords::<T>::get(id))
            .collect();
          if cell.status == HostZoneUnbondingStatus::UnbondingQueue {
            let user_st = users
              .iter()
              .fold(0u128, |sum, user| sum.saturating_add(user.st_token_amount));
            ensure!(
              user_st == cell.st_token_amount,
              "queued host zone unbonding disagrees with its redemption records"
            );
          }
          let user_native = users
            .iter()
            .fold(0u128, |sum, user| sum.saturating_add(user.native_token_amount));
          ensure!(
            user_native <= cell.native_token_amount,
            "redemption records claim more than their host zone unbonding"
          );
          ensure!(
            cell
              .claimable_native_tokens
              .saturating_add(cell.native_tokens_to_unbond)
              <= cell.native_token_amount,
            "host zone unbonding holds more than it unbonded"
          );
        }
      }
      Ok(())
    }
  }
}
