//! Configuration schema and validator (spec.md §3, §4.2, §6).
//!
//! Grounded on `CONFIG_JSCHEMA` in
//! `original_source/.../controller/schema/config_jschema.py`: the wire shape
//! is validated field-by-field rather than against a generic JSON-schema
//! document, since the set of rules is small and fixed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
  #[serde(rename = "FTDI")]
  Ftdi,
  #[serde(rename = "Serial")]
  Serial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorType {
  Temperature,
  #[serde(rename = "HX85A")]
  Hx85a,
  #[serde(rename = "HX85BA")]
  Hx85ba,
  Wind,
  #[serde(rename = "SPS30")]
  Sps30,
  #[serde(rename = "CSAT3B")]
  Csat3b,
}

impl SensorType {
  /// Sensor-type-dependent default baud rate, applied when a configuration
  /// entry omits `baud_rate` (spec.md §3). The SPS30 value is grounded on
  /// the UART settings documented in `sps30-async`'s `Sps30::from_tx_rx`;
  /// the ASCII sensors follow the RS-232 convention used throughout the
  /// rest of the pack (9600 8N1).
  pub fn default_baud_rate(&self) -> u32 {
    match self {
      SensorType::Sps30 => 115_200,
      _ => 9_600,
    }
  }
}

/// Wire shape of one `devices[]` entry, deserialized permissively (every
/// field that is conditionally required is `Option` here) so that
/// `Configuration::validate` can produce one `INVALID_CONFIGURATION` verdict
/// instead of a serde deserialization failure per missing field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDeviceConfig {
  pub name: String,
  pub device_type: DeviceType,
  pub sensor_type: SensorType,
  #[serde(default)]
  pub ftdi_id: Option<String>,
  #[serde(default)]
  pub serial_port: Option<String>,
  #[serde(default)]
  pub channels: Option<u32>,
  #[serde(default)]
  pub baud_rate: Option<u32>,
  #[serde(default)]
  pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfiguration {
  pub devices: Vec<RawDeviceConfig>,
}

/// A validated device entry: after `Configuration::validate` runs,
/// `device_id` is unconditionally populated from whichever of `ftdi_id` /
/// `serial_port` applies, and `baud_rate` carries either the configured or
/// the sensor-type default.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
  pub name: String,
  pub device_type: DeviceType,
  pub sensor_type: SensorType,
  pub device_id: String,
  pub channels: Option<u32>,
  pub baud_rate: u32,
  pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
  pub devices: Vec<DeviceConfig>,
}

impl Configuration {
  /// Validates a raw wire configuration against spec.md §4.2's five rules,
  /// returning `Error::Configuration` (surfaced as `INVALID_CONFIGURATION`)
  /// on the first violation found.
  pub fn validate(raw: RawConfiguration) -> Result<Configuration> {
    if raw.devices.is_empty() {
      return Err(Error::Configuration("devices list must be non-empty".into()));
    }

    let mut seen_names = std::collections::HashSet::new();
    let mut devices = Vec::with_capacity(raw.devices.len());

    for entry in raw.devices {
      if !seen_names.insert(entry.name.clone()) {
        return Err(Error::Configuration(format!(
          "duplicate device name {:?}",
          entry.name
        )));
      }

      let device_id = match entry.device_type {
        DeviceType::Ftdi => entry.ftdi_id.clone().ok_or_else(|| {
          Error::Configuration(format!(
            "device {:?}: device_type=FTDI requires ftdi_id",
            entry.name
          ))
        })?,
        DeviceType::Serial => entry.serial_port.clone().ok_or_else(|| {
          Error::Configuration(format!(
            "device {:?}: device_type=Serial requires serial_port",
            entry.name
          ))
        })?,
      };

      if entry.sensor_type == SensorType::Temperature {
        match entry.channels {
          Some(n) if n >= 1 => {}
          Some(_) => {
            return Err(Error::Configuration(format!(
              "device {:?}: channels must be >= 1",
              entry.name
            )))
          }
          None => {
            return Err(Error::Configuration(format!(
              "device {:?}: sensor_type=Temperature requires channels",
              entry.name
            )))
          }
        }
      }

      let baud_rate = entry.baud_rate.unwrap_or_else(|| entry.sensor_type.default_baud_rate());

      devices.push(DeviceConfig {
        name: entry.name,
        device_type: entry.device_type,
        sensor_type: entry.sensor_type,
        device_id,
        channels: entry.channels,
        baud_rate,
        location: entry.location,
      });
    }

    Ok(Configuration { devices })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(json: &str) -> Result<Configuration> {
    let raw: RawConfiguration = serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))?;
    Configuration::validate(raw)
  }

  #[test]
  fn rejects_empty_devices() {
    let err = parse(r#"{"devices": []}"#).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
  }

  #[test]
  fn rejects_duplicate_names() {
    let json = r#"{"devices": [
      {"name": "T", "device_type": "FTDI", "ftdi_id": "A", "sensor_type": "Temperature", "channels": 1},
      {"name": "T", "device_type": "FTDI", "ftdi_id": "B", "sensor_type": "Temperature", "channels": 1}
    ]}"#;
    assert!(parse(json).is_err());
  }

  #[test]
  fn rejects_missing_channels_for_temperature() {
    let json = r#"{"devices": [
      {"name": "T", "device_type": "FTDI", "ftdi_id": "A", "sensor_type": "Temperature"}
    ]}"#;
    assert!(parse(json).is_err());
  }

  #[test]
  fn rejects_serial_without_port() {
    let json = r#"{"devices": [
      {"name": "W", "device_type": "Serial", "sensor_type": "Wind"}
    ]}"#;
    assert!(parse(json).is_err());
  }

  #[test]
  fn accepts_valid_configuration_and_applies_default_baud() {
    let json = r#"{"devices": [
      {"name": "T", "device_type": "FTDI", "ftdi_id": "ABC", "sensor_type": "Temperature", "channels": 2}
    ]}"#;
    let cfg = parse(json).unwrap();
    assert_eq!(cfg.devices.len(), 1);
    assert_eq!(cfg.devices[0].baud_rate, 9600);
    assert_eq!(cfg.devices[0].device_id, "ABC");
  }
}
