//! Supervisor-facing wire protocol (spec.md §6).
//!
//! One JSON object per line. Incoming: `{"command": ..., "parameters": {...}}`.
//! Outgoing: either `{"response": ResponseCode}` or
//! `{"telemetry": [name, tai, response, v1, v2, ...]}`. Grounded on the
//! `read_loop` dispatch in `original_source/.../ess/sensors/socket_server.py`
//! (`items["command"]` / `items["parameters"]`) and the `_process_sensor_telemetry`
//! array shape built in `original_source/.../envsensors/command_handler.py`.

use serde::Deserialize;

use crate::config::RawConfiguration;
use crate::error::{Error, Result};
use crate::response_code::ResponseCode;

/// Raw wire envelope, before the `command` string has been interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
  pub command: String,
  #[serde(default)]
  pub parameters: serde_json::Value,
}

/// Parameters accompanying a `configure` command.
#[derive(Debug, Clone, Deserialize)]
struct ConfigureParameters {
  configuration: RawConfiguration,
}

/// An interpreted command, ready for `CommandHandler::handle`.
#[derive(Debug, Clone)]
pub enum CommandKind {
  Configure(RawConfiguration),
  Start,
  Stop,
  Disconnect,
  Exit,
}

impl CommandMessage {
  /// Parses a single `\r\n`-terminated line into a `CommandMessage`.
  /// A JSON parse failure is a `ProtocolError` (spec.md §7): the caller
  /// closes the peer.
  pub fn parse_line(line: &str) -> Result<CommandMessage> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
      .map_err(|e| Error::Protocol(format!("malformed command line: {}", e)))
  }

  /// Interprets the raw envelope into a `CommandKind`, or a `ProtocolError`
  /// if the command name is unknown or its parameters don't match its shape.
  pub fn into_kind(self) -> Result<CommandKind> {
    match self.command.as_str() {
      "configure" => {
        let params: ConfigureParameters = serde_json::from_value(self.parameters)
          .map_err(|e| Error::Protocol(format!("invalid configure parameters: {}", e)))?;
        Ok(CommandKind::Configure(params.configuration))
      }
      "start" => Ok(CommandKind::Start),
      "stop" => Ok(CommandKind::Stop),
      "disconnect" => Ok(CommandKind::Disconnect),
      "exit" => Ok(CommandKind::Exit),
      other => Err(Error::Protocol(format!("unknown command {:?}", other))),
    }
  }
}

/// One frame of telemetry: `[name, tai_seconds, response_code, v1, v2, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
  pub name: String,
  pub tai: f64,
  pub response: ResponseCode,
  pub values: Vec<f64>,
}

/// Renders one f64 the way the field needs to appear on the wire. `serde_json`
/// refuses to serialize non-finite floats (JSON has no NaN token), but the
/// supervisor protocol needs to carry NaN for disconnected/failing channels
/// (spec.md §4.5, §8) -- following the reference controller's Python
/// `json.dumps` (which emits a bare `NaN` by default), we emit the same bare
/// token here rather than smuggling it through as a string.
fn render_f64(v: f64) -> String {
  if v.is_nan() {
    "NaN".to_string()
  } else {
    // finite floats always serialize successfully
    serde_json::to_string(&v).unwrap()
  }
}

/// A reply sent back to the supervisor: either a command acknowledgement or
/// an asynchronous telemetry frame. Mutually exclusive per spec.md §3.
#[derive(Debug, Clone)]
pub enum Reply {
  Response(ResponseCode),
  Telemetry(TelemetryFrame),
}

impl Reply {
  /// Renders this reply as a single `\r\n`-terminated JSON line.
  pub fn to_wire_line(&self) -> String {
    let body = match self {
      Reply::Response(code) => {
        format!(r#"{{"response":{}}}"#, serde_json::to_string(code).unwrap())
      }
      Reply::Telemetry(frame) => {
        let mut fields = Vec::with_capacity(3 + frame.values.len());
        fields.push(serde_json::to_string(&frame.name).unwrap());
        fields.push(render_f64(frame.tai));
        fields.push(serde_json::to_string(&frame.response).unwrap());
        fields.extend(frame.values.iter().map(|v| render_f64(*v)));
        format!(r#"{{"telemetry":[{}]}}"#, fields.join(","))
      }
    };
    format!("{}\r\n", body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn response_reply_serializes_with_response_key() {
    let reply = Reply::Response(ResponseCode::Ok);
    assert_eq!(reply.to_wire_line(), "{\"response\":\"OK\"}\r\n");
  }

  #[test]
  fn telemetry_reply_serializes_as_array_under_telemetry_key() {
    let frame = TelemetryFrame {
      name: "T".into(),
      tai: 12.5,
      response: ResponseCode::Ok,
      values: vec![21.0, 22.0],
    };
    let reply = Reply::Telemetry(frame);
    assert_eq!(
      reply.to_wire_line(),
      "{\"telemetry\":[\"T\",12.5,\"OK\",21.0,22.0]}\r\n"
    );
  }

  #[test]
  fn telemetry_reply_renders_nan_as_bare_token() {
    let frame = TelemetryFrame {
      name: "T".into(),
      tai: 12.5,
      response: ResponseCode::DeviceReadError,
      values: vec![f64::NAN, f64::NAN],
    };
    let reply = Reply::Telemetry(frame);
    assert_eq!(
      reply.to_wire_line(),
      "{\"telemetry\":[\"T\",12.5,\"DEVICE_READ_ERROR\",NaN,NaN]}\r\n"
    );
  }

  #[test]
  fn parses_configure_command() {
    let line = r#"{"command":"configure","parameters":{"configuration":{"devices":[{"name":"T","device_type":"FTDI","ftdi_id":"ABC","sensor_type":"Temperature","channels":2}]}}}"#;
    let msg = CommandMessage::parse_line(line).unwrap();
    let kind = msg.into_kind().unwrap();
    assert!(matches!(kind, CommandKind::Configure(_)));
  }

  #[test]
  fn rejects_unknown_command() {
    let msg = CommandMessage::parse_line(r#"{"command":"frobnicate","parameters":{}}"#).unwrap();
    assert!(msg.into_kind().is_err());
  }
}
