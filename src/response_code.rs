//! Response codes carried both in command replies and inside telemetry
//! frames (spec.md §6). Grounded on `ResponseCode` /
//! `original_source/.../ess/sensors/response_code.py`-style enums used
//! throughout the command handler.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
  Ok,
  AlreadyStarted,
  NotConfigured,
  NotStarted,
  InvalidConfiguration,
  DeviceReadError,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_as_screaming_snake_case() {
    let json = serde_json::to_string(&ResponseCode::DeviceReadError).unwrap();
    assert_eq!(json, "\"DEVICE_READ_ERROR\"");
  }
}
