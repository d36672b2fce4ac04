//! Loopback stand-in for the remote hand actuator.
//!
//! Accepts WebSocket connections, decodes each text frame as an actuator
//! command and acknowledges it. Used for bench runs without hardware and by
//! the transport and pipeline tests, which need an actuator that misbehaves
//! on demand.
//!
//! Every received frame, valid or not, is forwarded on the channel returned
//! by `bind`, in arrival order.

use crate::command::ActuatorCommand;
use crate::error::Result;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Pause after a failed accept.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How the actuator answers a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    /// Send the command text back
    #[default]
    Echo,
    /// Close the connection without acknowledging
    Close,
    /// Never answer
    Silent,
}

/// A bound loopback actuator, not yet serving.
pub struct LoopbackActuator {
    listener: TcpListener,
    mode: AckMode,
    received: mpsc::UnboundedSender<String>,
}

impl LoopbackActuator {
    /// Bind to `addr` (use port 0 for an ephemeral port).
    ///
    /// Returns the actuator and the receiving end of its command log.
    pub async fn bind(
        addr: &str,
        mode: AckMode,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>)> {
        let listener = TcpListener::bind(addr).await?;
        let (received, log) = mpsc::unbounded_channel();
        Ok((
            Self {
                listener,
                mode,
                received,
            },
            log,
        ))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// WebSocket URI clients should use.
    pub fn endpoint(&self) -> Result<String> {
        Ok(format!("ws://{}/ws", self.local_addr()?))
    }

    /// Accept connections until the task is dropped or aborted.
    pub async fn serve(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, mode = ?self.mode, "loopback actuator listening");
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        self.mode,
                        self.received.clone(),
                    ));
                }
                Err(e) => {
                    warn!("accept failed: {e}");
                    // Errors like fd exhaustion persist; back off before retrying.
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    mode: AckMode,
    received: mpsc::UnboundedSender<String>,
) {
    let mut socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(%peer, "websocket handshake failed: {e}");
            return;
        }
    };
    debug!(%peer, "client connected");

    while let Some(frame) = socket.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(%peer, "receive failed: {e}");
                break;
            }
        };

        match ActuatorCommand::parse(&text) {
            Ok(command) => info!(
                %peer,
                command = %text,
                angles = ?command.servo_angles(),
                "driving servos"
            ),
            Err(e) => warn!(%peer, command = %text, "invalid command: {e}"),
        }

        // The test side may have hung up; the actuator keeps going.
        let _ = received.send(text.clone());

        match mode {
            AckMode::Echo => {
                if let Err(e) = socket.send(Message::Text(text)).await {
                    debug!(%peer, "ack failed: {e}");
                    break;
                }
            }
            AckMode::Close => {
                let _ = socket.close(None).await;
                break;
            }
            AckMode::Silent => {}
        }
    }

    debug!(%peer, "client disconnected");
}
