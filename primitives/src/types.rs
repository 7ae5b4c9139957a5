//! Bounded identifiers, ordered storage keys and fixed-point helpers shared by every pallet.

use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::frame_support::{traits::ConstU32, BoundedVec};
use scale_info::TypeInfo;
use sp_arithmetic::{
  helpers_128bit::multiply_by_rational_with_rounding, traits::Zero, FixedPointNumber, FixedU128,
  Rounding,
};

/// Fixed-point decimal with 18 fractional digits.
pub type Dec = FixedU128;

pub type ChainId = BoundedVec<u8, ConstU32<64>>;
pub type Denom = BoundedVec<u8, ConstU32<128>>;
pub type RemoteAddress = BoundedVec<u8, ConstU32<128>>;
pub type ChannelId = BoundedVec<u8, ConstU32<64>>;
pub type PortId = BoundedVec<u8, ConstU32<128>>;
pub type ConnectionId = BoundedVec<u8, ConstU32<64>>;
pub type EpochIdentifier = BoundedVec<u8, ConstU32<32>>;
pub type RedemptionId = BoundedVec<u8, ConstU32<256>>;
pub type CallbackArgs = BoundedVec<u8, ConstU32<16_384>>;

/// Copies a byte slice into a bounded vector, `None` when it does not fit.
pub fn bounded<S: polkadot_sdk::frame_support::traits::Get<u32>>(
  bytes: &[u8],
) -> Option<BoundedVec<u8, S>> {
  BoundedVec::try_from(bytes.to_vec()).ok()
}

/// A `u64` stored big-endian so that `Identity`-hashed maps iterate in numeric order.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
)]
pub struct BigEndianU64(pub [u8; 8]);

impl BigEndianU64 {
  pub fn get(&self) -> u64 {
    u64::from_be_bytes(self.0)
  }
}

impl From<u64> for BigEndianU64 {
  fn from(value: u64) -> Self {
    Self(value.to_be_bytes())
  }
}

impl From<BigEndianU64> for u64 {
  fn from(key: BigEndianU64) -> Self {
    key.get()
  }
}

pub const CHANNEL_SLOT_LEN: usize = 16;

/// Channel id zero-padded into a fixed 16-byte key slot.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
)]
pub struct ChannelSlot(pub [u8; CHANNEL_SLOT_LEN]);

impl ChannelSlot {
  pub fn from_channel_id(channel_id: &[u8]) -> Option<Self> {
    if channel_id.is_empty() || channel_id.len() > CHANNEL_SLOT_LEN {
      return None;
    }
    let mut slot = [0u8; CHANNEL_SLOT_LEN];
    slot[..channel_id.len()].copy_from_slice(channel_id);
    Some(Self(slot))
  }

  pub fn channel_id(&self) -> Vec<u8> {
    let end = self
      .0
      .iter()
      .position(|b| *b == 0)
      .unwrap_or(CHANNEL_SLOT_LEN);
    self.0[..end].to_vec()
  }
}

/// A denom and amount pair.
#[derive(
  Clone, Debug, Decode, DecodeWithMemTracking, Default, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct Coin {
  pub denom: Denom,
  pub amount: u128,
}

/// `floor(amount × rate)`.
pub fn mul_trunc(rate: Dec, amount: u128) -> Option<u128> {
  multiply_by_rational_with_rounding(amount, rate.into_inner(), Dec::DIV, Rounding::Down)
}

/// `floor(amount / rate)`, `None` for a zero rate.
pub fn div_trunc(amount: u128, rate: Dec) -> Option<u128> {
  if rate.is_zero() {
    return None;
  }
  multiply_by_rational_with_rounding(amount, Dec::DIV, rate.into_inner(), Rounding::Down)
}

/// `floor(amount × part / total)`, `None` for a zero total.
pub fn pro_rata(amount: u128, part: u128, total: u128) -> Option<u128> {
  if total == 0 {
    return None;
  }
  multiply_by_rational_with_rounding(amount, part, total, Rounding::Down)
}

/// Arithmetic mean of two rates, truncated at the 18th decimal.
pub fn dec_midpoint(a: Dec, b: Dec) -> Dec {
  let sum = a.into_inner().saturating_add(b.into_inner());
  Dec::from_inner(sum / 2)
}

/// Parses a plain decimal string such as `"1.025236900070852"`.
///
/// At most 18 fractional digits are accepted; signs and exponents are rejected.
pub fn parse_dec(s: &str) -> Option<Dec> {
  let (int_part, frac_part) = match s.split_once('.') {
    Some((i, f)) => (i, f),
    None => (s, ""),
  };
  if int_part.is_empty() || frac_part.len() > 18 {
    return None;
  }
  if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
  {
    return None;
  }
  let int: u128 = int_part.parse().ok()?;
  let mut frac: u128 = 0;
  for b in frac_part.bytes() {
    frac = frac * 10 + u128::from(b - b'0');
  }
  for _ in frac_part.len()..18 {
    frac *= 10;
  }
  int
    .checked_mul(Dec::DIV)?
    .checked_add(frac)
    .map(Dec::from_inner)
}

/// Parses a non-negative decimal integer amount as carried in transfer packets.
pub fn parse_amount(s: &str) -> Option<u128> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn big_endian_keys_sort_numerically() {
    let mut keys: Vec<BigEndianU64> = [256u64, 1, 255, 65_536]
      .into_iter()
      .map(Into::into)
      .collect();
    keys.sort_by(|a, b| a.encode().cmp(&b.encode()));
    let values: Vec<u64> = keys.iter().map(BigEndianU64::get).collect();
    assert_eq!(values, vec![1, 255, 256, 65_536]);
  }

  #[test]
  fn channel_slot_pads_and_recovers() {
    let slot = ChannelSlot::from_channel_id(b"channel-0").unwrap();
    assert_eq!(&slot.0[..9], b"channel-0");
    assert!(slot.0[9..].iter().all(|b| *b == 0));
    assert_eq!(slot.channel_id(), b"channel-0".to_vec());
    assert!(ChannelSlot::from_channel_id(b"channel-1234567890").is_none());
    assert!(ChannelSlot::from_channel_id(b"").is_none());
  }

  #[test]
  fn parse_dec_handles_precision() {
    assert_eq!(parse_dec("1"), Some(Dec::from_u32(1)));
    assert_eq!(
      parse_dec("1.025900897761638723"),
      Some(Dec::from_inner(1_025_900_897_761_638_723))
    );
    assert_eq!(parse_dec("0.05"), Some(Dec::from_rational(5, 100)));
    assert_eq!(parse_dec("1.0000000000000000001"), None);
    assert_eq!(parse_dec("-1"), None);
    assert_eq!(parse_dec(".5"), None);
  }

  #[test]
  fn truncating_conversions_round_down() {
    let rate = parse_dec("1.025236900070852").unwrap();
    assert_eq!(mul_trunc(rate, 1_000_000), Some(1_025_236));

    let rate = parse_dec("1.5").unwrap();
    assert_eq!(div_trunc(1_000_000, rate), Some(666_666));
    assert_eq!(div_trunc(10, Dec::zero()), None);
  }

  #[test]
  fn midpoint_matches_imputed_rate() {
    let prop = parse_dec("1.025900897761638723").unwrap();
    let upgrade = parse_dec("1.03").unwrap();
    let mid = dec_midpoint(prop, upgrade);
    assert_eq!(mid, Dec::from_inner(1_027_950_448_880_819_361));
    assert_eq!(mul_trunc(mid, 1_000_000), Some(1_027_950));
  }

  #[test]
  fn parse_amount_rejects_signs_and_blanks() {
    assert_eq!(parse_amount("1000000"), Some(1_000_000));
    assert_eq!(parse_amount(""), None);
    assert_eq!(parse_amount("-5"), None);
    assert_eq!(parse_amount("1.5"), None);
  }
}
