//! Seams between the pallets and the collaborators they drive.
//!
//! The bank, the ICS-20 implementation, the interchain-account controller, the airdrop
//! module and the address codec live outside these pallets; runtimes plug them in here.

use crate::{
  ibc::{AckResponse, CallbackKind, HostMsg, IcaAccountType, MsgTransfer, Packet, PacketId},
  types::{ChainId, ChannelId, Coin, Denom},
};
use alloc::vec::Vec;
use polkadot_sdk::sp_runtime::{DispatchError, DispatchResult};

/// Local token balances keyed by denom.
pub trait TokenBank<AccountId> {
  fn transfer(from: &AccountId, to: &AccountId, denom: &[u8], amount: u128) -> DispatchResult;

  fn mint(to: &AccountId, denom: &[u8], amount: u128) -> DispatchResult;

  fn burn(from: &AccountId, denom: &[u8], amount: u128) -> DispatchResult;

  fn balance(who: &AccountId, denom: &[u8]) -> u128;
}

/// Submission side of the ICS-20 implementation.
pub trait TransferApi<AccountId> {
  /// Escrows the tokens and sends the packet, returning its sequence on the source channel.
  fn transfer(msg: MsgTransfer<AccountId>) -> Result<u64, DispatchError>;
}

/// Interchain-account controller.
pub trait IcaApi {
  fn submit_tx(
    chain_id: &[u8],
    account: IcaAccountType,
    msgs: Vec<HostMsg>,
    timeout_timestamp: u64,
  ) -> Result<PacketId, DispatchError>;
}

/// Textual form of local accounts as it appears in packets and record ids.
pub trait AddressCodec<AccountId> {
  fn encode(who: &AccountId) -> Vec<u8>;

  fn decode(address: &[u8]) -> Option<AccountId>;
}

/// Resolved trace of an IBC voucher denom.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DenomTrace {
  /// `port/channel` hops, e.g. `transfer/channel-0`.
  pub path: Vec<u8>,
  pub base_denom: Vec<u8>,
}

pub trait DenomTraceResolver {
  fn resolve(ibc_denom: &[u8]) -> Option<DenomTrace>;
}

/// Subscribers to the epoch driver.
///
/// Errors are logged by the driver and the subscriber's writes for that signal are dropped.
pub trait EpochHooks {
  fn before_epoch_start(identifier: &[u8], epoch_number: u64) -> DispatchResult;

  fn after_epoch_end(identifier: &[u8], epoch_number: u64) -> DispatchResult;
}

impl EpochHooks for () {
  fn before_epoch_start(_: &[u8], _: u64) -> DispatchResult {
    Ok(())
  }

  fn after_epoch_end(_: &[u8], _: u64) -> DispatchResult {
    Ok(())
  }
}

impl<A: EpochHooks, B: EpochHooks> EpochHooks for (A, B) {
  fn before_epoch_start(identifier: &[u8], epoch_number: u64) -> DispatchResult {
    A::before_epoch_start(identifier, epoch_number)?;
    B::before_epoch_start(identifier, epoch_number)
  }

  fn after_epoch_end(identifier: &[u8], epoch_number: u64) -> DispatchResult {
    A::after_epoch_end(identifier, epoch_number)?;
    B::after_epoch_end(identifier, epoch_number)
  }
}

/// Stores callback payloads against outbound packets.
pub trait CallbackRegistry {
  fn register_callback(
    port_id: &[u8],
    channel_id: &[u8],
    sequence: u64,
    kind: CallbackKind,
    args: Vec<u8>,
  ) -> DispatchResult;
}

/// Handler for the callback kinds a pallet owns.
pub trait CallbackHandler {
  fn handles(kind: CallbackKind) -> bool;

  fn call(kind: CallbackKind, packet: &Packet, ack: &AckResponse, args: &[u8]) -> DispatchResult;
}

impl CallbackHandler for () {
  fn handles(_: CallbackKind) -> bool {
    false
  }

  fn call(_: CallbackKind, _: &Packet, _: &AckResponse, _: &[u8]) -> DispatchResult {
    Err(DispatchError::Other("no callback handler"))
  }
}

macro_rules! impl_callback_handler_for_tuples {
  ($($handler:ident),+) => {
    impl<$($handler: CallbackHandler),+> CallbackHandler for ($($handler,)+) {
      fn handles(kind: CallbackKind) -> bool {
        $($handler::handles(kind))||+
      }

      fn call(
        kind: CallbackKind,
        packet: &Packet,
        ack: &AckResponse,
        args: &[u8],
      ) -> DispatchResult {
        $(
          if $handler::handles(kind) {
            return $handler::call(kind, packet, ack, args);
          }
        )+
        Err(DispatchError::Other("no callback handler"))
      }
    }
  };
}

impl_callback_handler_for_tuples!(A);
impl_callback_handler_for_tuples!(A, B);
impl_callback_handler_for_tuples!(A, B, C);
impl_callback_handler_for_tuples!(A, B, C, D);

/// Host zone attributes the router needs to validate inbound denoms.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostZoneSummary {
  pub chain_id: ChainId,
  pub host_denom: Denom,
  pub ibc_denom: Denom,
  pub transfer_channel_id: ChannelId,
}

/// Entry points of the liquid staking pipelines consumed by the autopilot router.
pub trait LiquidStaking<AccountId> {
  fn host_zone_by_host_denom(host_denom: &[u8]) -> Option<HostZoneSummary>;

  /// Issues derivative tokens for `amount` of the host zone's voucher held by `staker`.
  fn liquid_stake(staker: &AccountId, amount: u128, host_denom: &[u8]) -> Result<Coin, DispatchError>;

  /// Queues a redemption of `amount` derivative tokens held by `redeemer`.
  fn redeem_stake(
    redeemer: &AccountId,
    amount: u128,
    chain_id: &[u8],
    receiver: &[u8],
  ) -> DispatchResult;
}

/// Airdrop claim records.
pub trait AirdropApi<AccountId> {
  /// Re-points the claim record of `host_sender` for `airdrop_id` at `new_address`.
  fn update_airdrop_address(
    host_sender: &[u8],
    new_address: &AccountId,
    airdrop_id: &[u8],
  ) -> DispatchResult;
}
