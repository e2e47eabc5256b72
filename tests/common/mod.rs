//! Local WebSocket server used by the integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use aether_market_data::{ConnectionSettings, ConnectionState, ReconnectSettings};

pub const WAIT: Duration = Duration::from_secs(5);

/// One accepted client connection. Dropping `outbound` hangs up on the client.
pub struct Peer {
    pub path: String,
    pub outbound: mpsc::UnboundedSender<Message>,
    pub gone: oneshot::Receiver<()>,
}

impl Peer {
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.outbound.send(Message::Text(text.into()));
    }

    pub fn send_tick(&self, symbol: &str, price: f64) {
        self.send_text(tick_json(symbol, price));
    }
}

pub fn tick_json(symbol: &str, price: f64) -> String {
    serde_json::json!({
        "symbol": symbol,
        "price": price,
        "timestamp": format!("2024-03-01T12:00:{:02}", (price as u64) % 60),
        "change_24h": 0.5,
        "volume": 1200.0
    })
    .to_string()
}

/// Accept connections on an ephemeral port; each one is reported as a `Peer`
pub async fn spawn_ws_server() -> (SocketAddr, mpsc::UnboundedReceiver<Peer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (peer_tx, peer_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let peer_tx = peer_tx.clone();
            tokio::spawn(async move {
                let mut path = String::new();
                let callback = |request: &Request, response: Response| {
                    path = request.uri().path().to_string();
                    Ok::<Response, ErrorResponse>(response)
                };
                let Ok(ws) = accept_hdr_async(stream, callback).await else {
                    return;
                };

                let (mut sink, mut source) = ws.split();
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
                let (gone_tx, gone_rx) = oneshot::channel();
                if peer_tx
                    .send(Peer {
                        path,
                        outbound: out_tx,
                        gone: gone_rx,
                    })
                    .is_err()
                {
                    return;
                }

                loop {
                    tokio::select! {
                        outgoing = out_rx.recv() => match outgoing {
                            Some(message) => {
                                if sink.send(message).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                        incoming = source.next() => match incoming {
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                    }
                }
                let _ = gone_tx.send(());
            });
        }
    });

    (addr, peer_rx)
}

pub async fn next_peer(peers: &mut mpsc::UnboundedReceiver<Peer>) -> Peer {
    timeout(WAIT, peers.recv())
        .await
        .expect("no connection within timeout")
        .expect("server stopped")
}

pub async fn wait_for_state(
    state: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
) {
    timeout(WAIT, async {
        loop {
            if *state.borrow_and_update() == target {
                return;
            }
            state.changed().await.expect("connection task ended");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state never became {:?}", target));
}

pub fn settings_with_delay(delay_ms: u64) -> ConnectionSettings {
    settings_with_timeouts(delay_ms, 2_000, 30_000)
}

pub fn settings_with_timeouts(delay_ms: u64, connect_ms: u64, recv_ms: u64) -> ConnectionSettings {
    ConnectionSettings {
        reconnect: ReconnectSettings {
            delay: Duration::from_millis(delay_ms),
            ..ReconnectSettings::default()
        },
        connect_timeout: Duration::from_millis(connect_ms),
        recv_timeout: Duration::from_millis(recv_ms),
    }
}
