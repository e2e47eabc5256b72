//! Transport for a symbol-scoped push endpoint
//!
//! One `WebSocketClient` is one upgraded socket. It exists only while
//! connected; reconnecting means building a new one.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};

use crate::error::{MarketDataError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound traffic after control frames are handled
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Raw frame body, text or binary, still to be decoded
    Payload(Vec<u8>),
    /// Ping/pong or a raw frame; proves the peer is alive, nothing to decode
    Heartbeat,
}

/// An open stream transport
pub struct WebSocketClient {
    stream: WsStream,
    url: String,
}

impl WebSocketClient {
    /// Perform the upgrade handshake against `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, response) = connect_async(url).await?;
        info!(url = %url, status = %response.status(), "Market stream upgraded");

        Ok(Self {
            stream,
            url: url.to_string(),
        })
    }

    /// Next inbound frame. Any error means the transport is unusable.
    pub async fn recv(&mut self) -> Result<Inbound> {
        let message = match self.stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(MarketDataError::WebSocketMessage(e.to_string())),
            None => {
                return Err(MarketDataError::WebSocketConnection(format!(
                    "{} ended without a close frame",
                    self.url
                )))
            }
        };

        match message {
            Message::Text(text) => Ok(Inbound::Payload(text.into_bytes())),
            Message::Binary(data) => Ok(Inbound::Payload(data)),
            Message::Ping(data) => {
                self.stream
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| MarketDataError::WebSocketMessage(format!("pong failed: {}", e)))?;
                Ok(Inbound::Heartbeat)
            }
            Message::Pong(_) | Message::Frame(_) => Ok(Inbound::Heartbeat),
            Message::Close(frame) => Err(MarketDataError::WebSocketConnection(describe_close(
                frame.as_ref(),
            ))),
        }
    }

    /// Keepalive probe; the peer's pong arrives through `recv`
    pub async fn ping(&mut self) -> Result<()> {
        self.stream.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    /// Send a close frame and drop the socket
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(url = %self.url, error = %e, "Close handshake incomplete");
        }
    }
}

fn describe_close(frame: Option<&CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("closed by server ({}): {}", frame.code, frame.reason)
        }
        Some(frame) => format!("closed by server ({})", frame.code),
        None => "closed by server".to_string(),
    }
}
