//! Memo parsing.
//!
//! The `autopilot` block is read from the packet memo, or from the receiver field when the
//! memo is empty:
//!
//! ```json
//! { "autopilot": { "receiver": "<local address>",
//!                  "stakeibc": { "action": "LiquidStake", "ibc_receiver": "...", "transfer_channel": "..." },
//!                  "claim": { "stride_address": "<local address>", "airdrop_id": "..." } },
//!   "forward": { ... } }
//! ```
//!
//! Unknown keys are ignored at every level.

use crate::{
  ClaimMetadata, Config, Error, PacketMetadata, Pallet, Route, StakeibcAction, StakeibcMetadata,
};
use alloc::{string::String, vec::Vec};
use primitives::AddressCodec;
use serde::Deserialize;

#[derive(Deserialize)]
struct RawMetadata {
  #[serde(default)]
  autopilot: Option<RawAutopilot>,
}

#[derive(Deserialize)]
struct RawAutopilot {
  #[serde(default)]
  receiver: Option<String>,
  #[serde(default)]
  stakeibc: Option<RawStakeibc>,
  #[serde(default)]
  claim: Option<RawClaim>,
}

#[derive(Deserialize)]
struct RawStakeibc {
  #[serde(default)]
  action: String,
  #[serde(default)]
  ibc_receiver: String,
  #[serde(default)]
  transfer_channel: String,
}

#[derive(Deserialize)]
struct RawClaim {
  #[serde(default)]
  stride_address: String,
  #[serde(default)]
  airdrop_id: String,
}

fn non_empty(value: String) -> Option<Vec<u8>> {
  (!value.is_empty()).then(|| value.into_bytes())
}

impl<T: Config> Pallet<T> {
  /// Autopilot metadata of an inbound packet.
  ///
  /// `Ok(None)` when the packet carries none and passes through untouched.
  pub fn parse_receiver_and_memo(
    receiver: &str,
    memo: &str,
  ) -> Result<Option<PacketMetadata<T::AccountId>>, Error<T>> {
    let metadata = if memo.is_empty() { receiver } else { memo };
    let Ok(raw) = serde_json::from_str::<RawMetadata>(metadata) else {
      return Ok(None);
    };
    let Some(autopilot) = raw.autopilot else {
      return Ok(None);
    };

    let receiver = autopilot
      .receiver
      .and_then(non_empty)
      .ok_or(Error::<T>::InvalidPacketMetadata)?;

    let route = match (autopilot.stakeibc, autopilot.claim) {
      (Some(stakeibc), None) => {
        let action = match stakeibc.action.as_str() {
          "LiquidStake" => StakeibcAction::LiquidStake,
          "RedeemStake" => StakeibcAction::RedeemStake,
          _ => return Err(Error::<T>::UnsupportedAction),
        };
        Route::Stakeibc(StakeibcMetadata {
          action,
          ibc_receiver: non_empty(stakeibc.ibc_receiver),
          transfer_channel: non_empty(stakeibc.transfer_channel),
        })
      },
      (None, Some(claim)) => {
        if claim.airdrop_id.trim().is_empty() {
          return Err(Error::<T>::InvalidPacketMetadata);
        }
        let stride_address = T::AddressCodec::decode(claim.stride_address.as_bytes())
          .ok_or(Error::<T>::InvalidPacketMetadata)?;
        Route::Claim(ClaimMetadata { stride_address, airdrop_id: claim.airdrop_id.into_bytes() })
      },
      _ => return Err(Error::<T>::InvalidPacketMetadata),
    };

    Ok(Some(PacketMetadata { receiver, route }))
  }
}
