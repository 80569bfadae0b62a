//! Timing and protocol constants pulled from spec.md §4, §5 and §8.

use std::time::Duration;

/// Default per-read timeout (spec.md §4.3, §5).
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff applied after a transport failure before an acquisition task
/// re-opens its device (spec.md §4.3, §5).
pub const RECONNECT_SLEEP: Duration = Duration::from_secs(60);

/// Disconnected-sentinel string shared by the temperature, HX85A and HX85BA
/// decoders (spec.md GLOSSARY).
pub const DISCONNECTED_VALUE: &str = "9999.9990";

/// Default line terminator for ASCII sensor frames.
pub const DEFAULT_TERMINATOR: &str = "\r\n";

/// Default field delimiter for ASCII sensor frames.
pub const DEFAULT_DELIMITER: &str = ",";

/// Wire terminator for the supervisor JSON-lines protocol (spec.md §6).
pub const WIRE_TERMINATOR: &[u8] = b"\r\n";

pub mod wind {
  /// ASCII start-of-text character opening a Gill Polar-Continuous frame.
  pub const START_CHARACTER: u8 = 0x02;
  /// ASCII end-of-text character closing a Gill Polar-Continuous frame.
  pub const END_CHARACTER: u8 = 0x03;
  pub const UNIT_IDENTIFIER: &str = "Q";
  pub const WINDSPEED_UNIT: &str = "M";
  pub const GOOD_STATUS: &str = "00";
  pub const DEFAULT_DIRECTION_VAL: &str = "999";
  pub const DEFAULT_SPEED_VAL: &str = "9999.9990";
}

pub mod sps30 {
  use std::time::Duration;

  /// SHDLC frame delimiter.
  pub const FRAME_BOUNDARY: u8 = 0x7E;
  /// Fixed device address used for every command.
  pub const ADDR: u8 = 0x00;

  pub const CMD_START_MEASUREMENT: u8 = 0x00;
  pub const CMD_STOP_MEASUREMENT: u8 = 0x01;
  pub const CMD_READ_MEASURED_VALUES: u8 = 0x03;

  /// Reply shape `7E 00 <cmd> <err> <len> <data..> <csum> 7E` for a valid
  /// 10-float measurement is exactly this many bytes.
  pub const MEASUREMENT_REPLY_LEN: usize = 47;

  /// `7E 00 03 00 00 FC 7E`: the "no new data yet" reply.
  pub const EMPTY_REPLY: [u8; 7] = [0x7E, 0x00, 0x03, 0x00, 0x00, 0xFC, 0x7E];

  /// Upper bound on bytes collected for a single reply frame.
  pub const MAX_FRAME_BYTES: usize = 100;

  pub const MAX_NUM_START_STOP_ATTEMPS: usize = 5;
  pub const MAX_NUM_READ_ATTEMPTS: usize = 60;
  pub const READ_SLEEP_TIME: Duration = Duration::from_millis(900);
  pub const STOP_START_SLEEP: Duration = Duration::from_millis(20);

  pub const NUM_CHANNELS: usize = 10;
}
