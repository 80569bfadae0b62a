//! Per-device acquisition task (spec.md §4.3, §5): owns one transport and
//! one sensor decoder, and feeds [`crate::protocol::Reply::Telemetry`]
//! frames back to the session through an `mpsc` channel until cancelled.
//! Grounded on the `read_thread`/`_run` loop shape in
//! `original_source/.../device/base_device.py`.

pub mod transport;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::DeviceConfig;
use crate::constants::{READ_TIMEOUT, RECONNECT_SLEEP};
use crate::protocol::{Reply, TelemetryFrame};
use crate::response_code::ResponseCode;
use crate::sensor::Sensor;
use crate::util::current_tai;
use crate::error::Result;

use transport::Transport;

/// A running acquisition task plus the handle needed to stop it. `close` is
/// idempotent and safe to call even if the task already exited on its own.
pub struct Device {
  name: String,
  task: Option<JoinHandle<()>>,
  shutdown: Option<oneshot::Sender<()>>,
}

impl Device {
  /// Opens the device's transport, builds its decoder, and spawns the
  /// acquisition task. On transport-open failure the caller is responsible
  /// for tearing down any devices already opened in the same `start`
  /// (spec.md §4.2: a failed `start` leaves no devices running).
  pub async fn open(config: DeviceConfig, simulation: bool, reply_tx: mpsc::Sender<Reply>) -> Result<Device> {
    let name = config.name.clone();
    let mut transport = Transport::create(&config, simulation)?;
    transport.open().await?;
    let sensor = Sensor::create(&config)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(acquisition_loop(name.clone(), transport, sensor, reply_tx, shutdown_rx));

    Ok(Device {
      name,
      task: Some(task),
      shutdown: Some(shutdown_tx),
    })
  }

  /// Signals the acquisition task to stop and waits for it to exit. Called
  /// for every device on `stop`, `disconnect` and `exit` (spec.md §5).
  pub async fn close(&mut self) {
    if let Some(tx) = self.shutdown.take() {
      let _ = tx.send(());
    }
    if let Some(task) = self.task.take() {
      if let Err(e) = task.await {
        warn!("{}: acquisition task panicked: {}", self.name, e);
      }
    }
  }
}

async fn acquisition_loop(
  name: String,
  mut transport: Transport,
  sensor: Sensor,
  reply_tx: mpsc::Sender<Reply>,
  mut shutdown: oneshot::Receiver<()>,
) {
  loop {
    let read_outcome = tokio::select! {
      _ = &mut shutdown => break,
      outcome = tokio::time::timeout(READ_TIMEOUT, sensor.read_frame(&mut transport)) => outcome,
    };
    let tai = current_tai();

    let failure = match read_outcome {
      Ok(Ok(frame)) => match sensor.extract_telemetry(&frame) {
        Ok(values) => {
          let frame = TelemetryFrame { name: name.clone(), tai, response: ResponseCode::Ok, values };
          let _ = reply_tx.send(Reply::Telemetry(frame)).await;
          None
        }
        Err(e) => {
          warn!("{}: decode error: {}", name, e);
          Some(())
        }
      },
      Ok(Err(e)) => {
        warn!("{}: transport read failed: {}", name, e);
        Some(())
      }
      Err(_elapsed) => {
        warn!("{}: read timed out after {:?}", name, READ_TIMEOUT);
        Some(())
      }
    };

    if failure.is_some() {
      let values = vec![f64::NAN; sensor.channel_count()];
      let frame = TelemetryFrame { name: name.clone(), tai, response: ResponseCode::DeviceReadError, values };
      let _ = reply_tx.send(Reply::Telemetry(frame)).await;

      if !reconnect(&name, &mut transport, &mut shutdown).await {
        break;
      }
    }
  }

  let _ = transport.close().await;
}

/// Sleeps for [`RECONNECT_SLEEP`] (cancellable by `shutdown`), then closes
/// and reopens the transport. Returns `false` if the loop should stop
/// because `shutdown` fired while waiting.
async fn reconnect(name: &str, transport: &mut Transport, shutdown: &mut oneshot::Receiver<()>) -> bool {
  tokio::select! {
    _ = &mut *shutdown => return false,
    _ = tokio::time::delay_for(RECONNECT_SLEEP) => {}
  }

  let _ = transport.close().await;
  if let Err(e) = transport.open().await {
    warn!("{}: reconnect attempt failed: {}", name, e);
  }
  true
}
