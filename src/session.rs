//! Single-client TCP session server (spec.md §3, §4.1, §6). One client at a
//! time: `Idle -> Listening -> Connected -> Idle`, with session state (the
//! `CommandHandler` and anything it started) born on connect and torn down
//! on disconnect. Grounded on the accept/read loop in
//! `original_source/.../ess/sensors/socket_server.py`.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

use std::sync::Arc;

use crate::command_handler::CommandHandler;
use crate::error::{Error, Result};
use crate::protocol::{CommandMessage, Reply};
use crate::response_code::ResponseCode;

/// Bound on an inbound command or outbound telemetry/response backlog
/// before a slow peer starts applying backpressure.
const CHANNEL_CAPACITY: usize = 256;

pub struct SessionServer {
  simulation: bool,
}

impl SessionServer {
  pub fn new(simulation: bool) -> SessionServer {
    SessionServer { simulation }
  }

  /// Binds `host:port` and serves clients one at a time until an `exit`
  /// command is received, then returns. A bind failure is returned to the
  /// caller so the binary can exit non-zero (spec.md §6).
  pub async fn run(&self, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let mut listener = TcpListener::bind(&addr).await.map_err(Error::Io)?;
    info!("listening on {}", addr);

    loop {
      let (socket, peer) = match listener.accept().await {
        Ok(accepted) => accepted,
        Err(e) => {
          warn!("accept failed: {}", e);
          continue;
        }
      };
      info!("client connected: {}", peer);

      if self.handle_client(socket).await {
        info!("exit requested; server shutting down");
        break;
      }
      info!("client disconnected: {}", peer);
    }

    Ok(())
  }

  /// Serves one client connection to completion. Returns `true` if the
  /// client requested `exit` (the server should stop listening entirely),
  /// `false` if the connection simply ended (disconnect, protocol error,
  /// or EOF) and the server should go back to accepting.
  async fn handle_client(&self, socket: TcpStream) -> bool {
    let (read_half, write_half) = tokio::io::split(socket);
    let write_half = Arc::new(Mutex::new(write_half));

    let (reply_tx, reply_rx) = mpsc::channel::<Reply>(CHANNEL_CAPACITY);
    let writer_task = tokio::spawn(writer_loop(write_half, reply_rx));

    let mut handler = CommandHandler::new(reply_tx.clone(), self.simulation);
    let mut reader = BufReader::new(read_half);
    let mut exit_requested = false;

    loop {
      let mut line = Vec::new();
      match reader.read_until(b'\n', &mut line).await {
        Ok(0) => {
          warn!("client closed the connection without sending disconnect/exit");
          break;
        }
        Ok(_) => {
          let text = String::from_utf8_lossy(&line);
          match CommandMessage::parse_line(&text).and_then(CommandMessage::into_kind) {
            Ok(crate::protocol::CommandKind::Exit) => {
              let _ = reply_tx.send(Reply::Response(ResponseCode::Ok)).await;
              exit_requested = true;
              break;
            }
            Ok(crate::protocol::CommandKind::Disconnect) => {
              let _ = reply_tx.send(Reply::Response(ResponseCode::Ok)).await;
              break;
            }
            Ok(kind) => {
              let response = handler.handle(kind).await;
              let _ = reply_tx.send(Reply::Response(response)).await;
            }
            Err(e) => {
              warn!("closing peer after protocol error: {}", e);
              break;
            }
          }
        }
        Err(e) => {
          warn!("read error, closing peer: {}", e);
          break;
        }
      }
    }

    handler.stop_all().await;
    drop(reply_tx);
    let _ = writer_task.await;

    exit_requested
  }
}

/// Drains outgoing replies (command acknowledgements and asynchronous
/// telemetry frames alike) to the connected peer. Ends when every sender
/// handle for `reply_rx` has been dropped, i.e. when the session ends.
async fn writer_loop(
  write_half: Arc<Mutex<tokio::io::WriteHalf<TcpStream>>>,
  mut reply_rx: mpsc::Receiver<Reply>,
) {
  while let Some(reply) = reply_rx.recv().await {
    let line = reply.to_wire_line();
    let mut socket = write_half.lock().await;
    if let Err(e) = socket.write_all(line.as_bytes()).await {
      warn!("write to peer failed, dropping remaining replies: {}", e);
      break;
    }
  }
}
