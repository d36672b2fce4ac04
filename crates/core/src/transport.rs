//! One-shot WebSocket delivery of actuator commands.
//!
//! Every call opens a fresh connection, sends exactly one text frame, waits
//! for exactly one acknowledgement frame, and closes. No connection is shared
//! between calls, so a failed or hung send cannot leak into the next gesture.
//!
//! # Failure Policy
//!
//! Fire, observe, move on. Nothing is retried: by the time a retry would go
//! out, the hand has usually moved and a newer gesture supersedes the stale
//! one.
//!
//! | Stage     | Failure                          | Result            |
//! |-----------|----------------------------------|-------------------|
//! | parse     | not a `ws://`/`wss://` URI       | `InvalidEndpoint` |
//! | connect   | refused, handshake error, timeout| `ConnectFailed`   |
//! | send/recv | write error, close, EOF, timeout | `NoAck`           |

use crate::command::{AckPayload, CommandMessage};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Timeouts bounding a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Limit for TCP connect plus WebSocket handshake
    pub connect_timeout: Duration,

    /// Limit for writing the command and reading the acknowledgement
    pub ack_timeout: Duration,

    /// Limit for the closing handshake
    pub close_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            ack_timeout: Duration::from_millis(2000),
            close_timeout: Duration::from_millis(250),
        }
    }
}

/// A validated actuator address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: Uri,
}

impl Endpoint {
    /// Validate an endpoint reference.
    ///
    /// # Errors
    /// `TransportError::InvalidEndpoint` unless `raw` is a `ws://` or
    /// `wss://` URI with a non-empty host.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason,
        };

        let uri: Uri = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;

        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            Some(other) => return Err(invalid(format!("unsupported scheme {other:?}"))),
            None => return Err(invalid("missing ws:// or wss:// scheme".to_string())),
        }

        if uri.host().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self { uri })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Delivery seam used by the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one command and observe one acknowledgement.
    async fn send(
        &self,
        message: &CommandMessage,
        endpoint: &str,
    ) -> Result<AckPayload, TransportError>;
}

/// WebSocket client opening one connection per command.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    config: TransportConfig,
}

impl WsTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<Socket, TransportError> {
        let failed = |reason: String| TransportError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason,
        };

        match timeout(self.config.connect_timeout, connect_async(endpoint.uri().clone())).await {
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(_) => Err(failed(format!(
                "timed out after {} ms",
                self.config.connect_timeout.as_millis()
            ))),
        }
    }

    /// Write the command, then read frames until the first data frame.
    async fn exchange(
        &self,
        socket: &mut Socket,
        message: &CommandMessage,
        endpoint: &Endpoint,
    ) -> Result<AckPayload, TransportError> {
        let no_ack = |reason: String| TransportError::NoAck {
            endpoint: endpoint.to_string(),
            reason,
        };

        let round_trip = async {
            socket
                .send(Message::Text(message.as_str().to_owned()))
                .await
                .map_err(|e| no_ack(format!("send failed: {e}")))?;
            debug!(command = %message, "command sent");

            while let Some(frame) = socket.next().await {
                match frame {
                    Ok(Message::Text(text)) => return Ok(AckPayload::new(text)),
                    Ok(Message::Binary(bytes)) => {
                        return Ok(AckPayload::new(String::from_utf8_lossy(&bytes)))
                    }
                    Ok(Message::Close(_)) => {
                        return Err(no_ack("closed before acknowledging".to_string()))
                    }
                    Ok(_) => continue,
                    Err(e) => return Err(no_ack(format!("receive failed: {e}"))),
                }
            }
            Err::<AckPayload, _>(no_ack("connection ended before acknowledging".to_string()))
        };

        match timeout(self.config.ack_timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(no_ack(format!(
                "timed out after {} ms",
                self.config.ack_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(
        &self,
        message: &CommandMessage,
        endpoint: &str,
    ) -> Result<AckPayload, TransportError> {
        let endpoint = Endpoint::parse(endpoint)?;

        let mut socket = self.connect(&endpoint).await?;
        debug!(%endpoint, "connected");

        let result = self.exchange(&mut socket, message, &endpoint).await;

        // Closing handshake is best effort; dropping the stream closes the
        // TCP connection either way.
        if timeout(self.config.close_timeout, socket.close(None)).await.is_err() {
            debug!(%endpoint, "close handshake timed out");
        }
        drop(socket);

        if let Ok(ack) = &result {
            info!(%endpoint, command = %message, %ack, "command acknowledged");
        }
        result
    }
}
