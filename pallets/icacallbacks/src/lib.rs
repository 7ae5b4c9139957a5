//! ICA Callbacks Pallet
//!
//! Outbound packets whose outcome matters to local state register a callback under the
//! packet's `(port, channel, sequence)`. When the acknowledgement or timeout comes back the
//! callback is looked up, handed to the [`primitives::CallbackHandler`] that owns its kind,
//! and removed. Each callback runs at most once.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub const LOG_TARGET: &str = "runtime::icacallbacks";

#[frame::pallet]
pub mod pallet {
  use super::LOG_TARGET;
  use alloc::vec::Vec;
  use codec::Decode;
  use core::marker::PhantomData;
  use frame::prelude::*;
  use polkadot_sdk::frame_support::storage::with_storage_layer;
  use primitives::{
    bounded, AckResponse, AckStatus, Acknowledgement, CallbackArgs, CallbackHandler, CallbackKind,
    CallbackRegistry, ChannelId, IbcModule, Packet, PortId, TxMsgData,
  };

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// Handlers of every callback kind registered through this pallet.
    type CallbackHandler: CallbackHandler;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
  pub struct CallbackData {
    pub kind: CallbackKind,
    pub args: CallbackArgs,
  }

  /// Pending callbacks by source port, source channel and packet sequence.
  #[pallet::storage]
  #[pallet::getter(fn callback_entries)]
  pub type CallbackEntries<T: Config> = StorageNMap<
    _,
    (
      NMapKey<Blake2_128Concat, PortId>,
      NMapKey<Blake2_128Concat, ChannelId>,
      NMapKey<Twox64Concat, u64>,
    ),
    CallbackData,
    OptionQuery,
  >;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    CallbackRegistered {
      port_id: PortId,
      channel_id: ChannelId,
      sequence: u64,
      kind: CallbackKind,
    },
    CallbackInvoked {
      port_id: PortId,
      channel_id: ChannelId,
      sequence: u64,
      kind: CallbackKind,
      status: AckStatus,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// The acknowledgement is neither a result nor an error, or its result is empty.
    InvalidAcknowledgement,
    /// No configured handler owns the callback kind.
    CallbackHandlerNotFound,
    CallbackArgsTooLong,
    /// Port or channel identifier exceeds its bound.
    InvalidPacketId,
  }

  impl<T: Config> CallbackRegistry for Pallet<T> {
    fn register_callback(
      port_id: &[u8],
      channel_id: &[u8],
      sequence: u64,
      kind: CallbackKind,
      args: Vec<u8>,
    ) -> DispatchResult {
      let port_id: PortId = bounded(port_id).ok_or(Error::<T>::InvalidPacketId)?;
      let channel_id: ChannelId = bounded(channel_id).ok_or(Error::<T>::InvalidPacketId)?;
      let args: CallbackArgs = args
        .try_into()
        .map_err(|_| Error::<T>::CallbackArgsTooLong)?;

      CallbackEntries::<T>::insert(
        (port_id.clone(), channel_id.clone(), sequence),
        CallbackData { kind, args },
      );
      Self::deposit_event(Event::CallbackRegistered { port_id, channel_id, sequence, kind });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Interprets raw acknowledgement bytes.
    ///
    /// Interchain-account results carry a SCALE `TxMsgData`; transfer results are opaque.
    pub fn parse_acknowledgement(ack: &[u8], is_ica: bool) -> Result<AckResponse, DispatchError> {
      match Acknowledgement::from_bytes(ack).ok_or(Error::<T>::InvalidAcknowledgement)? {
        Acknowledgement::Error(message) => Ok(AckResponse::failure(message)),
        Acknowledgement::Result(result) => {
          ensure!(!result.is_empty(), Error::<T>::InvalidAcknowledgement);
          if !is_ica {
            return Ok(AckResponse::success(Vec::new()));
          }
          let data = TxMsgData::decode(&mut &result[..])
            .map_err(|_| Error::<T>::InvalidAcknowledgement)?;
          Ok(AckResponse::success(data.msg_responses))
        },
      }
    }

    pub fn on_acknowledgement_packet(packet: &Packet, ack: &[u8], is_ica: bool) -> DispatchResult {
      let response = Self::parse_acknowledgement(ack, is_ica)?;
      Self::dispatch(packet, &response)
    }

    pub fn on_timeout_packet(packet: &Packet) -> DispatchResult {
      Self::dispatch(packet, &AckResponse::timeout())
    }

    /// Runs and reaps the callback registered for `packet`, if any.
    pub fn dispatch(packet: &Packet, ack: &AckResponse) -> DispatchResult {
      let (Some(port_id), Some(channel_id)) = (
        bounded::<ConstU32<128>>(&packet.source_port),
        bounded::<ConstU32<64>>(&packet.source_channel),
      ) else {
        log::debug!(target: LOG_TARGET, "no callback for packet with oversized identifiers");
        return Ok(());
      };
      let Some(CallbackData { kind, args }) =
        CallbackEntries::<T>::get((&port_id, &channel_id, packet.sequence))
      else {
        log::debug!(target: LOG_TARGET, "no callback registered for sequence {}", packet.sequence);
        return Ok(());
      };
      ensure!(T::CallbackHandler::handles(kind), Error::<T>::CallbackHandlerNotFound);

      with_storage_layer(|| {
        T::CallbackHandler::call(kind, packet, ack, &args)?;
        CallbackEntries::<T>::remove((&port_id, &channel_id, packet.sequence));
        Ok::<_, DispatchError>(())
      })?;

      log::info!(
        target: LOG_TARGET,
        "{:?} callback for sequence {} ran with {:?}",
        kind,
        packet.sequence,
        ack.status
      );
      Self::deposit_event(Event::CallbackInvoked {
        port_id,
        channel_id,
        sequence: packet.sequence,
        kind,
        status: ack.status,
      });
      Ok(())
    }
  }

  /// Transfer-stack middleware: lets `App` settle the packet, then runs the registered callback.
  pub struct TransferCallbacks<T, App>(PhantomData<(T, App)>);

  impl<T: Config, App: IbcModule> IbcModule for TransferCallbacks<T, App> {
    fn on_recv_packet(packet: &Packet) -> Acknowledgement {
      App::on_recv_packet(packet)
    }

    fn on_acknowledgement_packet(packet: &Packet, acknowledgement: &[u8]) -> DispatchResult {
      with_storage_layer(|| {
        App::on_acknowledgement_packet(packet, acknowledgement)?;
        Pallet::<T>::on_acknowledgement_packet(packet, acknowledgement, false)
      })
    }

    fn on_timeout_packet(packet: &Packet) -> DispatchResult {
      with_storage_layer(|| {
        App::on_timeout_packet(packet)?;
        Pallet::<T>::on_timeout_packet(packet)
      })
    }
  }
}
