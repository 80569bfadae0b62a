//! Campbell Scientific CSAT3B sonic anemometer decoder.
//!
//! `original_source/.../envsensors/sensor/wind_sensor.py` carries only a
//! `raise NotImplementedError` stub for this sensor, and no binary frame
//! format for it appears anywhere else in the reference pack. The
//! configuration schema still accepts `sensor_type: "CSAT3B"` (spec.md §3),
//! but a device configured with it fails at open time rather than at
//! `configure` time, leaving the rest of a mixed configuration startable.

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Csat3bDecoder;

impl Csat3bDecoder {
  pub fn new() -> Csat3bDecoder {
    Csat3bDecoder
  }

  pub fn extract(&self, _frame: &[u8]) -> Result<Vec<f64>> {
    Err(Error::Decode("CSAT3B decoding is not implemented".into()))
  }
}
