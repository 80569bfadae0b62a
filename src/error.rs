//! Crate-wide error taxonomy.
//!
//! Grouped by kind rather than by source type, following spec.md's error
//! taxonomy (`ConfigurationError`, `TransportOpenError`, `TransportReadError`,
//! `DecodeError`, `ProtocolError`). `Cancelled` is deliberately not a variant
//! here: cancellation of an acquisition task is modeled as control flow, not
//! as an error (see `device::acquisition`).

use std::io;

use err_derive::Error;

#[derive(Debug, Error)]
#[error(no_from)]
pub enum Error {
  /// A configuration payload failed validation (spec.md §4.2).
  #[error(display = "invalid configuration: {}", _0)]
  Configuration(String),

  /// A device's transport failed to open. Fatal for `start`; rolls back any
  /// already-opened devices.
  #[error(display = "failed to open device {:?}: {}", name, reason)]
  TransportOpen { name: String, reason: String },

  /// A transient read failure from an already-open transport.
  #[error(display = "error reading device {:?}: {}", name, source)]
  TransportRead {
    name: String,
    #[error(source)]
    source: io::Error,
  },

  /// A serial port specific error, kept distinct since `serialport::Error`
  /// carries its own `ErrorKind`.
  #[error(display = "serial port error: {}", _0)]
  SerialPort(#[error(source)] serialport::Error),

  /// A sensor-specific frame failed to decode.
  #[error(display = "decode error: {}", _0)]
  Decode(String),

  /// A malformed JSON line was received from the supervisor; closes the peer.
  #[error(display = "protocol error: {}", _0)]
  Protocol(String),

  /// Generic I/O failure (binding a listener, writing a reply, etc).
  #[error(display = "I/O error: {}", _0)]
  Io(#[error(source)] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
