//! Sensor frame decoders (spec.md §4.5).
//!
//! Each decoder turns one raw sensor frame into a fixed-width vector of
//! `f64` channel values. Modeled as tagged variants rather than a trait
//! object, per spec.md §9's preference for closed sum types over dynamic
//! dispatch at this seam -- the sensor set is fixed at compile time and the
//! `CommandHandler` only ever needs to match on it once, at `Sensor::create`.

mod csat3b;
mod hx85a;
mod hx85ba;
mod sps30;
mod temperature;
mod wind;

pub use csat3b::Csat3bDecoder;
pub use hx85a::Hx85aDecoder;
pub use hx85ba::Hx85baDecoder;
pub use sps30::Sps30Decoder;
pub use temperature::TemperatureDecoder;
pub use wind::WindDecoder;

use crate::config::{DeviceConfig, SensorType};
use crate::constants::{self, DEFAULT_TERMINATOR};
use crate::device::transport::Transport;
use crate::error::{Error, Result};

#[derive(Debug)]
pub enum Sensor {
  Temperature(TemperatureDecoder),
  Hx85a(Hx85aDecoder),
  Hx85ba(Hx85baDecoder),
  Wind(WindDecoder),
  Sps30(Sps30Decoder),
  Csat3b(Csat3bDecoder),
}

impl Sensor {
  /// Builds the decoder named by a validated device entry. CSAT3B is
  /// accepted by the configuration schema (spec.md §3) but has no decoder
  /// yet (spec.md Open Questions); configuring one fails at device-open
  /// time rather than at `configure` time, so every other device in the
  /// same configuration can still start.
  pub fn create(config: &DeviceConfig) -> Result<Sensor> {
    match config.sensor_type {
      SensorType::Temperature => {
        let channels = config.channels.ok_or_else(|| {
          Error::Configuration(format!(
            "device {:?}: sensor_type=Temperature requires channels",
            config.name
          ))
        })? as usize;
        Ok(Sensor::Temperature(TemperatureDecoder::new(channels)))
      }
      SensorType::Hx85a => Ok(Sensor::Hx85a(Hx85aDecoder::new())),
      SensorType::Hx85ba => Ok(Sensor::Hx85ba(Hx85baDecoder::new())),
      SensorType::Wind => Ok(Sensor::Wind(WindDecoder::new())),
      SensorType::Sps30 => Ok(Sensor::Sps30(Sps30Decoder::new())),
      SensorType::Csat3b => Ok(Sensor::Csat3b(Csat3bDecoder::new())),
    }
  }

  /// Number of telemetry channels this sensor reports, used to size the
  /// all-`NaN` frame emitted on a read failure (spec.md §4.3, §8).
  pub fn channel_count(&self) -> usize {
    match self {
      Sensor::Temperature(d) => d.channels(),
      Sensor::Hx85a(_) => hx85a::CHANNELS,
      Sensor::Hx85ba(_) => hx85ba::CHANNELS,
      Sensor::Wind(_) => wind::CHANNELS,
      Sensor::Sps30(_) => constants::sps30::NUM_CHANNELS,
      Sensor::Csat3b(_) => 0,
    }
  }

  /// Reads one complete raw frame from `transport`, using whichever framing
  /// rule this sensor's wire format needs (spec.md §4.3).
  pub async fn read_frame(&self, transport: &mut Transport) -> Result<Vec<u8>> {
    match self {
      Sensor::Sps30(_) => sps30::read_frame(transport).await,
      Sensor::Csat3b(_) => Err(Error::Decode("CSAT3B framing is not implemented".into())),
      _ => read_until_terminator(transport, self.terminator()).await,
    }
  }

  /// The line terminator this sensor's ASCII/STX-ETX frames end with
  /// (spec.md §4.5). SPS30 and CSAT3B don't use this path at all.
  fn terminator(&self) -> &'static [u8] {
    match self {
      Sensor::Temperature(_) => DEFAULT_TERMINATOR.as_bytes(),
      // HX85A/HX85BA terminate with "\n\r", the reverse of every other
      // ASCII sensor in this pack (spec.md §4.5).
      Sensor::Hx85a(_) => b"\n\r",
      Sensor::Hx85ba(_) => b"\n\r",
      // The Gill frame's checksum and terminator follow ETX (spec.md §4.5),
      // so reading simply runs to the CRLF like the other ASCII sensors.
      Sensor::Wind(_) => b"\r\n",
      Sensor::Sps30(_) | Sensor::Csat3b(_) => b"",
    }
  }

  pub fn extract_telemetry(&self, frame: &[u8]) -> Result<Vec<f64>> {
    match self {
      Sensor::Temperature(d) => d.extract(frame),
      Sensor::Hx85a(d) => d.extract(frame),
      Sensor::Hx85ba(d) => d.extract(frame),
      Sensor::Wind(d) => d.extract(frame),
      Sensor::Sps30(d) => d.extract(frame),
      Sensor::Csat3b(d) => d.extract(frame),
    }
  }
}

/// Upper bound on bytes collected for a single ASCII or STX/ETX-framed read,
/// guarding against a silent wire that never produces a terminator.
const MAX_FRAME_BYTES: usize = 4096;

/// True if `buf` ends with `terminator`, or with `terminator` interrupted by
/// exactly one stray `NUL` byte between its characters -- the one framing
/// quirk spec.md §4.3 calls out by name.
fn ends_with_terminator(buf: &[u8], terminator: &[u8]) -> bool {
  if buf.ends_with(terminator) {
    return true;
  }
  if terminator.len() == 2 {
    let padded = [terminator[0], 0x00, terminator[1]];
    if buf.ends_with(&padded) {
      return true;
    }
  }
  false
}

async fn read_until_terminator(transport: &mut Transport, terminator: &[u8]) -> Result<Vec<u8>> {
  let mut buf = Vec::new();
  loop {
    buf.push(transport.read_byte().await?);
    if ends_with_terminator(&buf, terminator) {
      return Ok(buf);
    }
    if buf.len() > MAX_FRAME_BYTES {
      return Err(Error::Decode("frame exceeded maximum length without a terminator".into()));
    }
  }
}

/// Decodes `bytes` as ISO-8859-1 (Latin-1), the charset HX85A/HX85BA use
/// for their `°` degree-sign field labels (spec.md §4.5). Every Latin-1
/// code point maps directly onto the identically-numbered Unicode scalar
/// value, so this never fails the way a UTF-8 decode of the same bytes
/// would on a raw `0xB0` byte.
fn decode_latin1(bytes: &[u8]) -> String {
  bytes.iter().map(|&b| b as char).collect()
}

/// Left-pads `values` with `NaN` up to `expected` length. A partial read
/// after a reconnect can lose the earliest fields of a fixed-order ASCII
/// frame (HX85A/HX85BA); since the remaining fields still align to the tail
/// of the expected sequence, padding recovers a partial sample instead of
/// discarding it outright (spec.md §8).
fn pad_leading_nan(mut values: Vec<f64>, expected: usize) -> Result<Vec<f64>> {
  if values.len() > expected {
    return Err(Error::Decode(format!(
      "expected at most {} fields, got {}",
      expected,
      values.len()
    )));
  }
  while values.len() < expected {
    values.insert(0, f64::NAN);
  }
  Ok(values)
}

/// Parses the numeric part of a `KEY=value` token, treating the shared
/// disconnected-sentinel string as `NaN` (spec.md GLOSSARY, §8) so that a
/// sensor-reported disconnection and a transport read failure look the same
/// to the supervisor.
fn parse_sentinel_aware(value: &str) -> Result<f64> {
  if value == constants::DISCONNECTED_VALUE {
    return Ok(f64::NAN);
  }
  value
    .parse::<f64>()
    .map_err(|e| Error::Decode(format!("invalid numeric field {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ends_with_terminator_tolerates_stray_nul() {
    assert!(ends_with_terminator(b"abc\r\x00\n", b"\r\n"));
    assert!(ends_with_terminator(b"abc\r\n", b"\r\n"));
    assert!(!ends_with_terminator(b"abc\r\x01\n", b"\r\n"));
  }

  #[test]
  fn pad_leading_nan_pads_missing_prefix() {
    let padded = pad_leading_nan(vec![1.0], 3).unwrap();
    assert!(padded[0].is_nan() && padded[1].is_nan());
    assert_eq!(padded[2], 1.0);
  }

  #[test]
  fn pad_leading_nan_rejects_too_many_fields() {
    assert!(pad_leading_nan(vec![1.0, 2.0, 3.0], 2).is_err());
  }

  #[test]
  fn parse_sentinel_aware_maps_disconnected_value_to_nan() {
    assert!(parse_sentinel_aware(constants::DISCONNECTED_VALUE).unwrap().is_nan());
    assert_eq!(parse_sentinel_aware("21.5").unwrap(), 21.5);
  }
}
