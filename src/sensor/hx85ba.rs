//! Omega HX85BA humidity/temperature/barometric-pressure probe decoder.
//! No direct precedent exists in `original_source/` (only the stubbed
//! `ess.sensors` variant references it); built by analogy to
//! [`super::hx85a`], adding the barometric-pressure field the "BA" suffix
//! implies: `%RH=<v>,AT°C=<v>,BP=<v>`, ISO-8859-1, `\n\r`-terminated like
//! its sibling.

use crate::error::Result;

use super::{decode_latin1, pad_leading_nan, parse_sentinel_aware};

pub const CHANNELS: usize = 3;

#[derive(Debug)]
pub struct Hx85baDecoder;

impl Hx85baDecoder {
  pub fn new() -> Hx85baDecoder {
    Hx85baDecoder
  }

  pub fn extract(&self, frame: &[u8]) -> Result<Vec<f64>> {
    let text = decode_latin1(frame);
    let values = text
      .trim_end_matches(['\r', '\n'])
      .split(',')
      .filter(|f| !f.is_empty())
      .map(|field| {
        let value = field
          .splitn(2, '=')
          .nth(1)
          .ok_or_else(|| crate::error::Error::Decode(format!("malformed field {:?}", field)))?;
        parse_sentinel_aware(value)
      })
      .collect::<Result<Vec<f64>>>()?;

    pad_leading_nan(values, CHANNELS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_full_frame() {
    let decoder = Hx85baDecoder::new();
    let mut frame = b"%RH=45.10,AT".to_vec();
    frame.push(0xB0);
    frame.extend_from_slice(b"C=22.00,BP=1013.25\n\r");

    let values = decoder.extract(&frame).unwrap();
    assert_eq!(values, vec![45.10, 22.00, 1013.25]);
  }

  #[test]
  fn pads_partial_frame_missing_leading_field() {
    let decoder = Hx85baDecoder::new();
    let values = decoder.extract(b"BP=1013.25\n\r").unwrap();
    assert!(values[0].is_nan());
    assert!(values[1].is_nan());
    assert_eq!(values[2], 1013.25);
  }
}
