//! Gill Instruments Polar-Continuous wind sensor decoder, grounded on
//! `original_source/.../sensor/wind_sensor.py` (the `ess.sensors` variant;
//! the `envsensors` copy is an unimplemented stub). Frame shape:
//! `STX Q,<direction>,<speed>,M,<status>, ETX <checksum> CRLF`, where
//! `<checksum>` is two ASCII hex digits carrying the XOR of every byte from
//! just after `STX` through `ETX` inclusive, and the frame is terminated by
//! `\r\n` the same as every other ASCII sensor in this pack. No `regex`
//! dependency exists anywhere in the reference pack, so the frame is split
//! by hand.

use crate::constants::wind::{
  DEFAULT_DIRECTION_VAL, DEFAULT_SPEED_VAL, END_CHARACTER, GOOD_STATUS, START_CHARACTER,
  UNIT_IDENTIFIER, WINDSPEED_UNIT,
};
use crate::error::{Error, Result};
use crate::util::xor_checksum;

pub const CHANNELS: usize = 2;

#[derive(Debug)]
pub struct WindDecoder;

impl WindDecoder {
  pub fn new() -> WindDecoder {
    WindDecoder
  }

  pub fn extract(&self, frame: &[u8]) -> Result<Vec<f64>> {
    let without_terminator = Self::strip_terminator(frame)?;

    if without_terminator.len() < 2 {
      return Err(Error::Decode("wind frame too short to carry a checksum".into()));
    }
    let (stx_through_etx, checksum_hex) =
      without_terminator.split_at(without_terminator.len() - 2);

    let checksum_str = std::str::from_utf8(checksum_hex)
      .map_err(|e| Error::Decode(format!("non-ascii wind checksum: {}", e)))?;
    let expected = u8::from_str_radix(checksum_str, 16)
      .map_err(|e| Error::Decode(format!("malformed wind checksum {:?}: {}", checksum_str, e)))?;

    if stx_through_etx.len() < 2
      || stx_through_etx[0] != START_CHARACTER
      || stx_through_etx[stx_through_etx.len() - 1] != END_CHARACTER
    {
      return Err(Error::Decode("wind frame missing STX/ETX framing".into()));
    }
    let body = &stx_through_etx[1..stx_through_etx.len() - 1];

    let actual = xor_checksum(body);
    if actual != expected {
      return Err(Error::Decode(format!(
        "wind checksum mismatch: frame says {:#04x}, computed {:#04x}",
        expected, actual
      )));
    }

    let body_str =
      std::str::from_utf8(body).map_err(|e| Error::Decode(format!("non-utf8 wind frame: {}", e)))?;
    let fields: Vec<&str> = body_str.split(',').collect();
    // `Q,<dir>,<speed>,M,<status>,` splits into 6 tokens, the last empty
    // from the trailing comma.
    if fields.len() != 6 || fields[5] != "" {
      return Err(Error::Decode(format!("malformed wind fields: {:?}", fields)));
    }
    if fields[0] != UNIT_IDENTIFIER {
      return Err(Error::Decode(format!("unexpected unit identifier {:?}", fields[0])));
    }
    if fields[3] != WINDSPEED_UNIT {
      return Err(Error::Decode(format!("unexpected windspeed unit {:?}", fields[3])));
    }

    let status = fields[4];
    if status != GOOD_STATUS {
      // Older Gill firmware in the field reports non-"00" status codes for
      // conditions (heater fault, marginal signal) that still carry a usable
      // reading; only a checksum failure is treated as a hard decode error.
      warn!("wind sensor reported non-OK status {:?}; passing reading through", status);
    }

    let direction = if fields[1].is_empty() || fields[1] == DEFAULT_DIRECTION_VAL {
      f64::NAN
    } else {
      fields[1]
        .parse::<f64>()
        .map_err(|e| Error::Decode(format!("invalid wind direction {:?}: {}", fields[1], e)))?
    };
    let speed = if fields[2] == DEFAULT_SPEED_VAL {
      f64::NAN
    } else {
      fields[2]
        .parse::<f64>()
        .map_err(|e| Error::Decode(format!("invalid wind speed {:?}: {}", fields[2], e)))?
    };

    Ok(vec![speed, direction])
  }

  /// Strips the frame's `\r\n` terminator (or its stray-`NUL` variant),
  /// leaving `STX ... ETX <checksum>`.
  fn strip_terminator(frame: &[u8]) -> Result<&[u8]> {
    if frame.ends_with(b"\r\n") {
      return Ok(&frame[..frame.len() - 2]);
    }
    if frame.len() >= 3 && frame.ends_with(&[b'\r', 0x00, b'\n']) {
      return Ok(&frame[..frame.len() - 3]);
    }
    Err(Error::Decode("wind frame missing CRLF terminator".into()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build_frame(dir: &str, speed: &str, status: &str) -> Vec<u8> {
    let body = format!("Q,{},{},M,{},", dir, speed, status);
    let checksum = xor_checksum(body.as_bytes());

    let mut frame = vec![START_CHARACTER];
    frame.extend_from_slice(body.as_bytes());
    frame.push(END_CHARACTER);
    frame.extend_from_slice(format!("{:02X}", checksum).as_bytes());
    frame.extend_from_slice(b"\r\n");
    frame
  }

  #[test]
  fn decodes_valid_frame_as_speed_then_direction() {
    let decoder = WindDecoder::new();
    let frame = build_frame("010", "015.00", "00");
    let values = decoder.extract(&frame).unwrap();
    assert_eq!(values, vec![15.0, 10.0]);
  }

  #[test]
  fn rejects_checksum_mismatch() {
    let decoder = WindDecoder::new();
    let mut frame = build_frame("010", "015.00", "00");
    let etx_pos = frame.iter().position(|&b| b == END_CHARACTER).unwrap();
    frame[etx_pos + 1] = b'0';
    frame[etx_pos + 2] = b'0';
    assert!(decoder.extract(&frame).is_err());
  }

  #[test]
  fn low_wind_reports_empty_direction_as_nan() {
    let decoder = WindDecoder::new();
    let frame = build_frame("", "000.10", "00");
    let values = decoder.extract(&frame).unwrap();
    assert_eq!(values[0], 0.10);
    assert!(values[1].is_nan());
  }

  #[test]
  fn sentinel_direction_and_speed_map_to_nan() {
    let decoder = WindDecoder::new();
    let frame = build_frame(DEFAULT_DIRECTION_VAL, DEFAULT_SPEED_VAL, "00");
    let values = decoder.extract(&frame).unwrap();
    assert!(values[0].is_nan());
    assert!(values[1].is_nan());
  }

  #[test]
  fn tolerates_non_ok_status() {
    let decoder = WindDecoder::new();
    let frame = build_frame("090", "005.00", "08");
    let values = decoder.extract(&frame).unwrap();
    assert_eq!(values, vec![5.0, 90.0]);
  }
}
