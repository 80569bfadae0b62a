//! Omega HX85A humidity/temperature probe decoder, grounded on
//! `original_source/.../sensor/omega_hx85a.py`: an ISO-8859-1, `\n\r`-
//! terminated line of `%RH=<v>,AT°C=<v>,DP°C=<v>` in fixed order (relative
//! humidity, air temperature, dew point).

use crate::error::Result;

use super::{decode_latin1, pad_leading_nan, parse_sentinel_aware};

pub const CHANNELS: usize = 3;

#[derive(Debug)]
pub struct Hx85aDecoder;

impl Hx85aDecoder {
  pub fn new() -> Hx85aDecoder {
    Hx85aDecoder
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

  fn frame_with_degree_sign(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut bytes = prefix.to_vec();
    bytes.push(0xB0); // Latin-1 degree sign, not valid on its own as UTF-8
    bytes.extend_from_slice(suffix);
    bytes
  }

  #[test]
  fn decodes_full_frame() {
    let decoder = Hx85aDecoder::new();
    let mut frame = b"%RH=38.86,AT".to_vec();
    frame.push(0xB0);
    frame.extend_from_slice(b"C=24.32,DP");
    frame.push(0xB0);
    frame.extend_from_slice(b"C=9.57\n\r");

    let values = decoder.extract(&frame).unwrap();
    assert_eq!(values, vec![38.86, 24.32, 9.57]);
  }

  #[test]
  fn pads_partial_frame_missing_leading_field() {
    let decoder = Hx85aDecoder::new();
    let frame = frame_with_degree_sign(b"DP", b"C=9.57\n\r");
    let values = decoder.extract(&frame).unwrap();
    assert!(values[0].is_nan());
    assert!(values[1].is_nan());
    assert_eq!(values[2], 9.57);
  }
}
