//! Sensirion SPS30 particulate sensor decoder, grounded on
//! `original_source/.../device/sensirion_sps30.py` for the command/reply
//! shape and cross-checked against the SHDLC checksum in
//! `examples/dvdsk-sps30-async/src/lib.rs`. Frame: `7E ADDR CMD STATE LEN
//! DATA.. CHECKSUM 7E`, with a 40-byte `DATA` holding ten big-endian IEEE754
//! floats for a measurement reply. Byte de-stuffing is left to the device;
//! the controller only validates length and checksum, treating that as
//! authoritative the way `original_source`'s command handler does.

use crate::constants::sps30::{
  ADDR, CMD_READ_MEASURED_VALUES, EMPTY_REPLY, FRAME_BOUNDARY, MEASUREMENT_REPLY_LEN, NUM_CHANNELS,
};
use crate::device::transport::Transport;
use crate::error::{Error, Result};
use crate::util::sps30_checksum;

use super::MAX_FRAME_BYTES;

#[derive(Debug)]
pub struct Sps30Decoder;

impl Sps30Decoder {
  pub fn new() -> Sps30Decoder {
    Sps30Decoder
  }

  pub fn extract(&self, frame: &[u8]) -> Result<Vec<f64>> {
    if frame == &EMPTY_REPLY[..] {
      return Ok(vec![f64::NAN; NUM_CHANNELS]);
    }

    if frame.len() != MEASUREMENT_REPLY_LEN {
      return Err(Error::Decode(format!(
        "unexpected SPS30 frame length {} (expected {})",
        frame.len(),
        MEASUREMENT_REPLY_LEN
      )));
    }
    if frame[0] != FRAME_BOUNDARY || frame[frame.len() - 1] != FRAME_BOUNDARY {
      return Err(Error::Decode("SPS30 frame missing delimiter bytes".into()));
    }

    let addr = frame[1];
    let cmd = frame[2];
    let state = frame[3];
    let len = frame[4] as usize;

    if addr != ADDR {
      return Err(Error::Decode(format!("unexpected SPS30 address {:#04x}", addr)));
    }
    if cmd != CMD_READ_MEASURED_VALUES {
      return Err(Error::Decode(format!("unexpected SPS30 command {:#04x}", cmd)));
    }
    if state != 0 {
      return Err(Error::Decode(format!("SPS30 reported error state {:#04x}", state)));
    }
    if len != NUM_CHANNELS * 4 {
      return Err(Error::Decode(format!("unexpected SPS30 data length {}", len)));
    }

    let data = &frame[5..5 + len];
    let checksum_region = &frame[1..5 + len];
    let expected = frame[5 + len];
    let actual = sps30_checksum(checksum_region);
    if actual != expected {
      return Err(Error::Decode(format!(
        "SPS30 checksum mismatch: frame says {:#04x}, computed {:#04x}",
        expected, actual
      )));
    }

    Ok(
      data
        .chunks_exact(4)
        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .collect(),
    )
  }
}

/// Syncs to the next `0x7E` delimiter, then reads through the matching
/// closing delimiter. SHDLC frames are not `\r\n`-terminated ASCII, so this
/// bypasses the generic terminator scanner entirely.
pub async fn read_frame(transport: &mut Transport) -> Result<Vec<u8>> {
  let mut byte = transport.read_byte().await?;
  while byte != FRAME_BOUNDARY {
    byte = transport.read_byte().await?;
  }
  let mut buf = vec![byte];
  loop {
    let next = transport.read_byte().await?;
    buf.push(next);
    if next == FRAME_BOUNDARY {
      return Ok(buf);
    }
    if buf.len() > MAX_FRAME_BYTES {
      return Err(Error::Decode("SPS30 frame exceeded maximum length".into()));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build_measurement_frame(values: &[f32; NUM_CHANNELS]) -> Vec<u8> {
    let mut data = Vec::with_capacity(NUM_CHANNELS * 4);
    for v in values {
      data.extend_from_slice(&v.to_be_bytes());
    }
    let mut checksum_region = vec![ADDR, CMD_READ_MEASURED_VALUES, 0x00, data.len() as u8];
    checksum_region.extend_from_slice(&data);
    let checksum = sps30_checksum(&checksum_region);

    let mut frame = vec![FRAME_BOUNDARY];
    frame.extend_from_slice(&checksum_region);
    frame.push(checksum);
    frame.push(FRAME_BOUNDARY);
    frame
  }

  #[test]
  fn decodes_valid_measurement_frame() {
    let decoder = Sps30Decoder::new();
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
    let frame = build_measurement_frame(&values);
    let decoded = decoder.extract(&frame).unwrap();
    assert_eq!(decoded, values.iter().map(|v| *v as f64).collect::<Vec<f64>>());
  }

  #[test]
  fn rejects_wrong_length() {
    let decoder = Sps30Decoder::new();
    assert!(decoder.extract(&[FRAME_BOUNDARY, 0x00, 0x03, 0x00, 0x00, FRAME_BOUNDARY]).is_err());
  }

  #[test]
  fn empty_reply_yields_all_nan() {
    let decoder = Sps30Decoder::new();
    let decoded = decoder.extract(&EMPTY_REPLY).unwrap();
    assert_eq!(decoded.len(), NUM_CHANNELS);
    assert!(decoded.iter().all(|v| v.is_nan()));
  }

  #[test]
  fn rejects_checksum_mismatch() {
    let decoder = Sps30Decoder::new();
    let values = [0.0; NUM_CHANNELS];
    let mut frame = build_measurement_frame(&values);
    let last = frame.len() - 2;
    frame[last] ^= 0xFF;
    assert!(decoder.extract(&frame).is_err());
  }
}
