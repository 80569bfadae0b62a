//! Shared helpers: TAI timestamping and the checksum routines used by the
//! Gill wind sensor and the SPS30 binary protocol.

use std::time::{SystemTime, UNIX_EPOCH};

/// TAI-UTC offset as of 2017-01-01, in whole seconds. The controller only
/// needs a monotonic-ish wall clock stamp per sample (spec.md Non-goals
/// exclude "time synchronization beyond recording a timestamp per sample"),
/// so a fixed leap-second offset is sufficient; it is not meant to track
/// future leap seconds.
const TAI_UTC_OFFSET_SECONDS: f64 = 37.0;

/// Returns the current time as TAI seconds (see GLOSSARY).
pub fn current_tai() -> f64 {
  let now = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default();
  now.as_secs_f64() + TAI_UTC_OFFSET_SECONDS
}

/// XOR checksum of the bytes between a wind frame's STX and ETX, expressed
/// over the already-assembled checksum string (`Q,<dir>,<speed>,M,<status>,`).
pub fn xor_checksum(bytes: &[u8]) -> u8 {
  bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// SPS30 SHDLC checksum: `255 - (sum(bytes) mod 256)`.
pub fn sps30_checksum(bytes: &[u8]) -> u8 {
  let sum: u32 = bytes.iter().map(|b| *b as u32).sum();
  255u8.wrapping_sub((sum % 256) as u8)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn xor_checksum_of_empty_is_zero() {
    assert_eq!(xor_checksum(&[]), 0);
  }

  #[test]
  fn sps30_checksum_matches_known_frame() {
    // ADDR=0x00, CMD=0x03 (read), STATE=0x00, LEN=0x00 -> checksum 0xFC
    let bytes = [0x00u8, 0x03, 0x00, 0x00];
    assert_eq!(sps30_checksum(&bytes), 0xFC);
  }
}
