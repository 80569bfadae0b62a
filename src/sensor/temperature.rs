//! Multi-channel temperature probe decoder, grounded on
//! `original_source/.../sensor/temperature_sensor.py`: a `\r\n`-terminated
//! line of `C00=0021.1234,C01=0022.5678,...` fields, one per configured
//! channel.

use crate::error::{Error, Result};

use super::{pad_leading_nan, parse_sentinel_aware};

#[derive(Debug)]
pub struct TemperatureDecoder {
  channels: usize,
}

impl TemperatureDecoder {
  pub fn new(channels: usize) -> TemperatureDecoder {
    TemperatureDecoder { channels }
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn extract(&self, frame: &[u8]) -> Result<Vec<f64>> {
    let text = std::str::from_utf8(frame)
      .map_err(|e| Error::Decode(format!("non-utf8 temperature frame: {}", e)))?;
    let fields: Vec<&str> = text
      .trim_end_matches(['\r', '\n'])
      .split(',')
      .filter(|f| !f.is_empty())
      .collect();

    let values = fields
      .iter()
      .map(|field| {
        // No `=` at all means no reading was attached to this token; more
        // than one is a malformed field. Only the single-`=` case carries a
        // value to parse (original_source's `temperature_sensor.py`:
        // `len(temperature_items) == 1 -> nan`).
        match field.matches('=').count() {
          0 => Ok(f64::NAN),
          1 => {
            let value = field.splitn(2, '=').nth(1).unwrap();
            parse_sentinel_aware(value)
          }
          _ => Err(Error::Decode(format!("malformed channel field {:?}", field))),
        }
      })
      .collect::<Result<Vec<f64>>>()?;

    // A partial read after a reconnect can lose the earliest channels;
    // pad the missing prefix with NaN rather than rejecting the sample
    // outright (spec.md §4.5, §8).
    pad_leading_nan(values, self.channels)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_two_channel_frame() {
    let decoder = TemperatureDecoder::new(2);
    let values = decoder.extract(b"C00=0021.1234,C01=0022.5678\r\n").unwrap();
    assert_eq!(values, vec![21.1234, 22.5678]);
  }

  #[test]
  fn maps_disconnected_sentinel_to_nan() {
    let decoder = TemperatureDecoder::new(2);
    let values = decoder.extract(b"C00=0021.1234,C01=9999.9990\r\n").unwrap();
    assert_eq!(values[0], 21.1234);
    assert!(values[1].is_nan());
  }

  #[test]
  fn pads_partial_frame_missing_leading_channels() {
    let decoder = TemperatureDecoder::new(3);
    let values = decoder.extract(b"C02=0022.5678\r\n").unwrap();
    assert!(values[0].is_nan());
    assert!(values[1].is_nan());
    assert_eq!(values[2], 22.5678);
  }

  #[test]
  fn field_with_no_equals_sign_is_nan() {
    let decoder = TemperatureDecoder::new(2);
    let values = decoder.extract(b"C00,C01=0022.5678\r\n").unwrap();
    assert!(values[0].is_nan());
    assert_eq!(values[1], 22.5678);
  }

  #[test]
  fn rejects_field_with_multiple_equals_signs() {
    let decoder = TemperatureDecoder::new(2);
    assert!(decoder.extract(b"C00=00=21.1234,C01=0022.5678\r\n").is_err());
  }

  #[test]
  fn rejects_too_many_fields() {
    let decoder = TemperatureDecoder::new(1);
    assert!(decoder.extract(b"C00=0021.1234,C01=0022.5678\r\n").is_err());
  }
}
