//! Environmental sensor controller.
//!
//! Sits between a set of attached instruments (temperature strings, humidity /
//! dew-point / pressure heads, ultrasonic anemometers, particulate counters)
//! and a single remote supervisor connected over TCP. Accepts a configuration,
//! opens the configured devices, and streams parsed telemetry frames back to
//! the supervisor until told to stop or until the connection drops.

#[macro_use] extern crate log;

pub mod command_handler;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod protocol;
pub mod response_code;
pub mod sensor;
pub mod session;
pub mod util;

pub use command_handler::CommandHandler;
pub use config::{Configuration, DeviceConfig, DeviceType, SensorType};
pub use error::{Error, Result};
pub use protocol::{CommandMessage, CommandKind, Reply};
pub use response_code::ResponseCode;
pub use session::SessionServer;
