//! Inbound packet routing and the actions behind it.

use crate::{
  AutopilotAction, Config, Error, Event, Pallet, Params, Route, StakeibcAction, StakeibcMetadata,
  TransferFallbackAddresses, LOG_TARGET,
};
use alloc::{string::String, vec::Vec};
use polkadot_sdk::frame_support::{ensure, storage::with_storage_layer, traits::Get};
use polkadot_sdk::sp_runtime::{DispatchError, DispatchResult};
use primitives::{
  host_denom_from_st_denom, ibc_denom, parse_amount, ports::TRANSFER_PORT,
  receiver_chain_is_source, strip_source_prefix, timeouts::packet_timeout, Acknowledgement,
  AddressCodec, AirdropApi, CallbackKind, CallbackRegistry, ChannelSlot, FungibleTokenPacketData,
  IbcModule, LiquidStaking, MsgTransfer, Packet, TransferApi,
};

enum RecvError {
  /// The transfer app refused the packet.
  App(Acknowledgement),
  Action(DispatchError),
}

impl From<DispatchError> for RecvError {
  fn from(err: DispatchError) -> Self {
    Self::Action(err)
  }
}

/// Error acknowledgement carrying the error's name.
fn error_ack(err: impl Into<DispatchError>) -> Acknowledgement {
  let err: DispatchError = err.into();
  Acknowledgement::error(err.into())
}

impl<T: Config> IbcModule for Pallet<T> {
  fn on_recv_packet(packet: &Packet) -> Acknowledgement {
    let Some(mut data) = FungibleTokenPacketData::from_json(&packet.data) else {
      return T::TransferApp::on_recv_packet(packet);
    };
    let metadata = match Self::parse_receiver_and_memo(&data.receiver, &data.memo) {
      Ok(Some(metadata)) => metadata,
      Ok(None) => return T::TransferApp::on_recv_packet(packet),
      Err(err) => {
        log::warn!(target: LOG_TARGET, "rejecting packet {}: {:?}", packet.sequence, err);
        return error_ack(err);
      },
    };
    let Some(receiver) = T::AddressCodec::decode(&metadata.receiver) else {
      return error_ack(Error::<T>::InvalidPacketMetadata);
    };

    data.receiver = String::from_utf8_lossy(&metadata.receiver).into_owned();
    let settled = Packet { data: data.to_json(), ..packet.clone() };

    let result = with_storage_layer(|| -> Result<Acknowledgement, RecvError> {
      let ack = T::TransferApp::on_recv_packet(&settled);
      if !ack.is_success() {
        return Err(RecvError::App(ack));
      }
      Self::run_action(packet, &data, &receiver, metadata.route)?;
      Ok(ack)
    });

    match result {
      Ok(ack) => ack,
      Err(RecvError::App(ack)) => ack,
      Err(RecvError::Action(err)) => {
        log::warn!(
          target: LOG_TARGET,
          "autopilot action of packet {} failed: {:?}",
          packet.sequence,
          err
        );
        error_ack(err)
      },
    }
  }

  fn on_acknowledgement_packet(packet: &Packet, acknowledgement: &[u8]) -> DispatchResult {
    T::TransferApp::on_acknowledgement_packet(packet, acknowledgement)
  }

  fn on_timeout_packet(packet: &Packet) -> DispatchResult {
    T::TransferApp::on_timeout_packet(packet)
  }
}

impl<T: Config> Pallet<T> {
  fn run_action(
    packet: &Packet,
    data: &FungibleTokenPacketData,
    receiver: &T::AccountId,
    route: Route<T::AccountId>,
  ) -> DispatchResult {
    let params = Params::<T>::get();
    match route {
      Route::Stakeibc(metadata) => {
        ensure!(params.stakeibc_active, Error::<T>::NotActive);
        let amount = parse_amount(&data.amount)
          .filter(|amount| *amount > 0)
          .ok_or(Error::<T>::InvalidAmount)?;
        match metadata.action {
          StakeibcAction::LiquidStake =>
            Self::autopilot_liquid_stake(packet, data.denom.as_bytes(), amount, receiver, metadata),
          StakeibcAction::RedeemStake =>
            Self::autopilot_redeem_stake(packet, data.denom.as_bytes(), amount, receiver, metadata),
        }
      },
      Route::Claim(claim) => {
        ensure!(params.claim_active, Error::<T>::NotActive);
        T::Airdrop::update_airdrop_address(
          data.sender.as_bytes(),
          &claim.stride_address,
          &claim.airdrop_id,
        )?;
        Self::deposit_event(Event::AutopilotActionExecuted {
          receiver: claim.stride_address,
          action: AutopilotAction::UpdateAirdropAddress,
          amount: 0,
        });
        Ok(())
      },
    }
  }

  fn autopilot_liquid_stake(
    packet: &Packet,
    denom: &[u8],
    amount: u128,
    receiver: &T::AccountId,
    metadata: StakeibcMetadata,
  ) -> DispatchResult {
    ensure!(
      !receiver_chain_is_source(&packet.source_port, &packet.source_channel, denom),
      Error::<T>::UnsupportedAction
    );
    let zone =
      T::LiquidStaking::host_zone_by_host_denom(denom).ok_or(Error::<T>::HostZoneNotFound)?;
    let voucher = ibc_denom(&packet.destination_port, &packet.destination_channel, denom);
    ensure!(voucher == zone.ibc_denom.to_vec(), Error::<T>::InvalidPacketMetadata);

    let minted = T::LiquidStaking::liquid_stake(receiver, amount, denom)?;
    Self::deposit_event(Event::AutopilotActionExecuted {
      receiver: receiver.clone(),
      action: AutopilotAction::LiquidStake,
      amount,
    });

    let Some(ibc_receiver) = metadata.ibc_receiver else {
      return Ok(());
    };
    let channel_id = metadata
      .transfer_channel
      .unwrap_or_else(|| zone.transfer_channel_id.to_vec());
    let msg = MsgTransfer {
      source_port: TRANSFER_PORT.to_vec(),
      source_channel: channel_id.clone(),
      denom: minted.denom.to_vec(),
      amount: minted.amount,
      sender: receiver.clone(),
      receiver: ibc_receiver,
      timeout_timestamp: packet_timeout(Self::now_secs(), T::ForwardTransferTimeout::get()),
      memo: Vec::new(),
    };
    let sequence = Self::submit_with_fallback(msg, receiver.clone())?;
    Self::deposit_event(Event::LiquidStakeForwarded {
      receiver: receiver.clone(),
      channel_id,
      sequence,
      amount: minted.amount,
    });
    Ok(())
  }

  fn autopilot_redeem_stake(
    packet: &Packet,
    denom: &[u8],
    amount: u128,
    receiver: &T::AccountId,
    metadata: StakeibcMetadata,
  ) -> DispatchResult {
    let st_denom = strip_source_prefix(&packet.source_port, &packet.source_channel, denom)
      .ok_or(Error::<T>::UnsupportedAction)?;
    let host_denom = host_denom_from_st_denom(st_denom).ok_or(Error::<T>::InvalidPacketMetadata)?;
    let zone =
      T::LiquidStaking::host_zone_by_host_denom(host_denom).ok_or(Error::<T>::HostZoneNotFound)?;
    let ibc_receiver = metadata.ibc_receiver.ok_or(Error::<T>::InvalidPacketMetadata)?;

    T::LiquidStaking::redeem_stake(receiver, amount, &zone.chain_id, &ibc_receiver)?;
    Self::deposit_event(Event::AutopilotActionExecuted {
      receiver: receiver.clone(),
      action: AutopilotAction::RedeemStake,
      amount,
    });
    Ok(())
  }

  /// Sends `msg` and remembers who is refunded should it fail.
  pub(crate) fn submit_with_fallback(
    msg: MsgTransfer<T::AccountId>,
    fallback: T::AccountId,
  ) -> Result<u64, DispatchError> {
    let slot =
      ChannelSlot::from_channel_id(&msg.source_channel).ok_or(Error::<T>::InvalidPacketMetadata)?;
    let port_id = msg.source_port.clone();
    let channel_id = msg.source_channel.clone();

    let sequence = T::Transfers::transfer(msg).map_err(|err| {
      log::error!(target: LOG_TARGET, "forward transfer on {:?} failed: {:?}", channel_id, err);
      Error::<T>::IBCTransferFailed
    })?;
    TransferFallbackAddresses::<T>::insert(slot, primitives::BigEndianU64::from(sequence), fallback);
    T::Callbacks::register_callback(
      &port_id,
      &channel_id,
      sequence,
      CallbackKind::AutopilotTransfer,
      Vec::new(),
    )?;
    Ok(sequence)
  }
}
