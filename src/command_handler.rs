//! Command dispatch and the `Unconfigured`/`Configured`/`Running` state
//! machine (spec.md §4.2). Grounded on the `configure`/`start`/`stop`
//! dispatch in both `original_source/.../envsensors/command_handler.py` and
//! its `ess.controller` counterpart; the three states are made explicit
//! here as an enum rather than the original's `_configuration` /
//! `_started` pair of fields, so an illegal combination (started but
//! unconfigured) cannot be represented at all.

use tokio::sync::mpsc;

use crate::config::Configuration;
use crate::device::Device;
use crate::error::Result;
use crate::protocol::{CommandKind, Reply};
use crate::response_code::ResponseCode;

enum State {
  Unconfigured,
  Configured(Configuration),
  Running { configuration: Configuration, devices: Vec<Device> },
}

/// Owns one client session's configuration and running devices. A new
/// `CommandHandler` is created for each accepted connection (spec.md §3:
/// session state is born on connect, dies on disconnect).
pub struct CommandHandler {
  state: State,
  reply_tx: mpsc::Sender<Reply>,
  simulation: bool,
}

impl CommandHandler {
  pub fn new(reply_tx: mpsc::Sender<Reply>, simulation: bool) -> CommandHandler {
    CommandHandler {
      state: State::Unconfigured,
      reply_tx,
      simulation,
    }
  }

  /// Dispatches one `configure`/`start`/`stop` command. `disconnect` and
  /// `exit` are handled by the session itself, since both also tear down
  /// the connection (spec.md §4.1).
  pub async fn handle(&mut self, kind: CommandKind) -> ResponseCode {
    match kind {
      CommandKind::Configure(raw) => self.configure(raw),
      CommandKind::Start => self.start().await,
      CommandKind::Stop => self.stop().await,
      CommandKind::Disconnect | CommandKind::Exit => {
        unreachable!("disconnect/exit are handled by the session before reaching the command handler")
      }
    }
  }

  fn configure(&mut self, raw: crate::config::RawConfiguration) -> ResponseCode {
    if matches!(self.state, State::Running { .. }) {
      return ResponseCode::AlreadyStarted;
    }
    match Configuration::validate(raw) {
      Ok(configuration) => {
        self.state = State::Configured(configuration);
        ResponseCode::Ok
      }
      Err(e) => {
        warn!("rejected configuration: {}", e);
        ResponseCode::InvalidConfiguration
      }
    }
  }

  async fn start(&mut self) -> ResponseCode {
    let configuration = match &self.state {
      State::Unconfigured => return ResponseCode::NotConfigured,
      State::Running { .. } => return ResponseCode::AlreadyStarted,
      State::Configured(configuration) => configuration.clone(),
    };

    match self.open_all_devices(&configuration).await {
      Ok(devices) => {
        self.state = State::Running { configuration, devices };
        ResponseCode::Ok
      }
      Err(e) => {
        warn!("failed to start devices: {}", e);
        self.state = State::Configured(configuration);
        ResponseCode::DeviceReadError
      }
    }
  }

  async fn stop(&mut self) -> ResponseCode {
    match std::mem::replace(&mut self.state, State::Unconfigured) {
      State::Running { configuration, devices } => {
        for mut device in devices {
          device.close().await;
        }
        self.state = State::Configured(configuration);
        ResponseCode::Ok
      }
      other => {
        self.state = other;
        ResponseCode::NotStarted
      }
    }
  }

  /// Idempotent full teardown, used on `disconnect` and `exit` (spec.md
  /// §5). Leaves the handler `Unconfigured`, matching session state dying
  /// with the connection.
  pub async fn stop_all(&mut self) {
    if let State::Running { devices, .. } = std::mem::replace(&mut self.state, State::Unconfigured) {
      for mut device in devices {
        device.close().await;
      }
    }
  }

  /// Opens every configured device, rolling back and returning the first
  /// error if any one fails to open -- `start` is all-or-nothing (spec.md
  /// §4.2).
  async fn open_all_devices(&self, configuration: &Configuration) -> Result<Vec<Device>> {
    let mut devices = Vec::with_capacity(configuration.devices.len());
    for device_config in &configuration.devices {
      match Device::open(device_config.clone(), self.simulation, self.reply_tx.clone()).await {
        Ok(device) => devices.push(device),
        Err(e) => {
          for mut opened in devices {
            opened.close().await;
          }
          return Err(e);
        }
      }
    }
    Ok(devices)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn configure_command(name: &str) -> CommandKind {
    let raw: crate::config::RawConfiguration = serde_json::from_str(&format!(
      r#"{{"devices": [{{"name": {:?}, "device_type": "FTDI", "ftdi_id": "sim", "sensor_type": "Temperature", "channels": 1}}]}}"#,
      name
    ))
    .unwrap();
    CommandKind::Configure(raw)
  }

  #[tokio::test]
  async fn start_without_configure_is_rejected() {
    let (tx, _rx) = mpsc::channel(8);
    let mut handler = CommandHandler::new(tx, true);
    assert!(matches!(handler.handle(CommandKind::Start).await, ResponseCode::NotConfigured));
  }

  #[tokio::test]
  async fn stop_without_start_is_rejected() {
    let (tx, _rx) = mpsc::channel(8);
    let mut handler = CommandHandler::new(tx, true);
    assert!(matches!(handler.handle(CommandKind::Stop).await, ResponseCode::NotStarted));
  }

  #[tokio::test]
  async fn configure_then_start_then_stop_round_trips() {
    let (tx, _rx) = mpsc::channel(8);
    let mut handler = CommandHandler::new(tx, true);

    assert!(matches!(
      handler.handle(configure_command("T")).await,
      ResponseCode::Ok
    ));
    assert!(matches!(handler.handle(CommandKind::Start).await, ResponseCode::Ok));
    assert!(matches!(
      handler.handle(CommandKind::Start).await,
      ResponseCode::AlreadyStarted
    ));
    assert!(matches!(handler.handle(CommandKind::Stop).await, ResponseCode::Ok));
    assert!(matches!(
      handler.handle(CommandKind::Stop).await,
      ResponseCode::NotStarted
    ));
  }

  #[tokio::test]
  async fn configure_while_running_is_rejected() {
    let (tx, _rx) = mpsc::channel(8);
    let mut handler = CommandHandler::new(tx, true);
    handler.handle(configure_command("T")).await;
    handler.handle(CommandKind::Start).await;
    assert!(matches!(
      handler.handle(configure_command("T2")).await,
      ResponseCode::AlreadyStarted
    ));
  }
}
