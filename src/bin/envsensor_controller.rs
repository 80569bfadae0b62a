#[macro_use] extern crate log;

use anyhow::{Context, Result};
use structopt::StructOpt;

use envsensor_controller::SessionServer;

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "envsensor-controller")]
struct Options {
  /// interface to listen on
  #[structopt(long, default_value = "0.0.0.0", env = "ENVSENSOR_HOST")]
  host: String,

  /// port for the supervisor TCP session
  #[structopt(long, short, default_value = "5000", env = "ENVSENSOR_PORT")]
  port: u16,

  /// run every configured device against an in-memory canned transport
  /// instead of opening real FTDI/serial hardware
  #[structopt(long)]
  simulation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().filter_or("ENVSENSOR_LOG", "info"))
    .target(env_logger::Target::Stderr)
    .init();

  let opts = Options::from_args();

  if opts.simulation {
    info!("starting in simulation mode; no hardware will be opened");
  }

  let server = SessionServer::new(opts.simulation);
  server
    .run(&opts.host, opts.port)
    .await
    .context("session server exited with an error")?;

  Ok(())
}
