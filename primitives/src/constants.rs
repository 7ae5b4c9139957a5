//! Protocol-wide constants: epoch identifiers, ports, timeouts and derivative naming.

use alloc::vec::Vec;

/// Epoch identifiers emitted by the epoch driver.
pub mod epoch_ids {
  /// Unbonding epoch: batch submission, maturity sweep and record cleanup.
  pub const DAY_EPOCH: &[u8] = b"day";

  /// Deposit epoch: transfers, delegations and the LSM pipeline.
  pub const STRIDE_EPOCH: &[u8] = b"stride_epoch";
}

pub mod ports {
  /// ICS-20 port on both sides of every transfer channel.
  pub const TRANSFER_PORT: &[u8] = b"transfer";
}

/// Packet timeouts, relative to the local block time.
pub mod timeouts {
  pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

  /// Default relative timeout for outbound transfers.
  pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 30 * 60;

  /// LSM share transfers wait for a full day.
  pub const LSM_TRANSFER_TIMEOUT_SECS: u64 = 24 * 60 * 60;

  /// Interchain-account transactions.
  pub const DEFAULT_ICA_TIMEOUT_SECS: u64 = 60 * 60;

  /// Converts a relative timeout into an absolute packet timeout in nanoseconds.
  pub fn packet_timeout(now_secs: u64, relative_secs: u64) -> u64 {
    now_secs
      .saturating_add(relative_secs)
      .saturating_mul(NANOS_PER_SECOND)
  }
}

pub mod staking {
  use crate::Dec;

  /// Prefix the derivative denom carries in front of the host denom.
  pub const ST_PREFIX: &[u8] = b"st";

  /// Redemption-rate safety bounds applied when a host zone registers without explicit ones.
  pub const DEFAULT_MIN_REDEMPTION_RATE: Dec = Dec::from_rational(9, 10);
  pub const DEFAULT_MAX_REDEMPTION_RATE: Dec = Dec::from_rational(3, 2);
}

/// Derivative denom of a host denom: `uatom` becomes `stuatom`.
pub fn st_denom(host_denom: &[u8]) -> Vec<u8> {
  let mut denom = staking::ST_PREFIX.to_vec();
  denom.extend_from_slice(host_denom);
  denom
}

/// Host denom behind a derivative denom, if it carries the derivative prefix.
pub fn host_denom_from_st_denom(st_denom: &[u8]) -> Option<&[u8]> {
  st_denom
    .strip_prefix(staking::ST_PREFIX)
    .filter(|rest| !rest.is_empty())
}
