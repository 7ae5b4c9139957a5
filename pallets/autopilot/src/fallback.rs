//! Outcome handling of forward transfers.
//!
//! A failed forward moves the refunded tokens from the forward's sender to the fallback
//! address. A timed out forward is sent again with a fresh timeout, as often as it takes.

use crate::{Config, Error, Event, Pallet, TransferFallbackAddresses, LOG_TARGET};
use polkadot_sdk::frame_support::traits::Get;
use polkadot_sdk::sp_runtime::{DispatchError, DispatchResult};
use primitives::{
  parse_amount, timeouts::packet_timeout, AckResponse, AckStatus, AddressCodec, BigEndianU64,
  CallbackHandler, CallbackKind, ChannelSlot, FungibleTokenPacketData, MsgTransfer, Packet,
  TokenBank,
};

/// Token movement carried by a forward packet.
struct Forwarded<AccountId> {
  data: FungibleTokenPacketData,
  sender: AccountId,
  amount: u128,
}

impl<T: Config> CallbackHandler for Pallet<T> {
  fn handles(kind: CallbackKind) -> bool {
    matches!(kind, CallbackKind::AutopilotTransfer)
  }

  fn call(_kind: CallbackKind, packet: &Packet, ack: &AckResponse, _args: &[u8]) -> DispatchResult {
    let Some((slot, sequence)) = Self::fallback_key(&packet.source_channel, packet.sequence) else {
      return Ok(());
    };
    let Some(fallback) = TransferFallbackAddresses::<T>::get(slot, sequence) else {
      log::debug!(target: LOG_TARGET, "no fallback for forward {}", packet.sequence);
      return Ok(());
    };

    match ack.status {
      AckStatus::Success => {
        TransferFallbackAddresses::<T>::remove(slot, sequence);
        Ok(())
      },
      AckStatus::Failure => Self::refund_fallback(packet, slot, sequence, fallback),
      AckStatus::Timeout => Self::resubmit_forward(packet, slot, sequence, fallback),
    }
  }
}

impl<T: Config> Pallet<T> {
  fn decode_forward(packet: &Packet) -> Result<Forwarded<T::AccountId>, DispatchError> {
    let data = FungibleTokenPacketData::from_json(&packet.data)
      .ok_or(Error::<T>::InvalidPacketMetadata)?;
    let sender =
      T::AddressCodec::decode(data.sender.as_bytes()).ok_or(Error::<T>::InvalidPacketMetadata)?;
    let amount = parse_amount(&data.amount).ok_or(Error::<T>::InvalidAmount)?;
    Ok(Forwarded { data, sender, amount })
  }

  fn refund_fallback(
    packet: &Packet,
    slot: ChannelSlot,
    sequence: BigEndianU64,
    fallback: T::AccountId,
  ) -> DispatchResult {
    let Forwarded { data, sender, amount } = Self::decode_forward(packet)?;
    let denom = data.denom.into_bytes();
    T::Bank::transfer(&sender, &fallback, &denom, amount)
      .map_err(|_| Error::<T>::InsufficientFunds)?;
    TransferFallbackAddresses::<T>::remove(slot, sequence);

    log::info!(
      target: LOG_TARGET,
      "forward {} failed, refunded {} to the fallback address",
      packet.sequence,
      amount
    );
    Self::deposit_event(Event::FallbackRefunded { fallback, denom, amount });
    Ok(())
  }

  fn resubmit_forward(
    packet: &Packet,
    slot: ChannelSlot,
    sequence: BigEndianU64,
    fallback: T::AccountId,
  ) -> DispatchResult {
    let Forwarded { data, sender, amount } = Self::decode_forward(packet)?;
    let msg = MsgTransfer {
      source_port: packet.source_port.clone(),
      source_channel: packet.source_channel.clone(),
      denom: data.denom.into_bytes(),
      amount,
      sender,
      receiver: data.receiver.into_bytes(),
      timeout_timestamp: packet_timeout(Self::now_secs(), T::ForwardTransferTimeout::get()),
      memo: data.memo.into_bytes(),
    };
    TransferFallbackAddresses::<T>::remove(slot, sequence);
    let new_sequence = Self::submit_with_fallback(msg, fallback)?;

    log::info!(
      target: LOG_TARGET,
      "forward {} timed out, resent as {}",
      packet.sequence,
      new_sequence
    );
    Self::deposit_event(Event::TransferResubmitted {
      channel_id: packet.source_channel.clone(),
      old_sequence: packet.sequence,
      new_sequence,
    });
    Ok(())
  }
}
