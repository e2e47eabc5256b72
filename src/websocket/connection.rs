//! Resilient stream connection
//!
//! Owns one transport connection to a single URL, decodes every inbound frame
//! and hands it to the owner's handler, and reconnects after any disconnect
//! for as long as the connection is open.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::{Inbound, ReconnectPolicy, ReconnectSettings, WebSocketClient};
use crate::error::{MarketDataError, Result};
use crate::metrics::metrics;

/// Observable connection health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    /// Only `Connected` counts as live; consumers cannot tell the other two apart
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub reconnect: ReconnectSettings,
    /// Upper bound on the upgrade handshake; expiry counts as a failed open
    pub connect_timeout: Duration,
    /// Idle time after which a keepalive ping is sent. A second idle window
    /// with no traffic at all drops the connection.
    pub recv_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect: ReconnectSettings::default(),
            connect_timeout: Duration::from_secs(10),
            recv_timeout: Duration::from_secs(45),
        }
    }
}

type Handler<M> = Box<dyn FnMut(M) + Send>;
type SharedHandler<M> = Arc<Mutex<Option<Handler<M>>>>;

/// Handle to a self-healing stream connection.
///
/// The connection task runs until [`close`](Self::close) is called or the
/// handle is dropped. Must be opened from within a tokio runtime.
pub struct StreamConnection {
    url: String,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    detach_handler: Box<dyn Fn() + Send + Sync>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl StreamConnection {
    /// Open a connection to `url`, delivering every decoded frame to `handler`
    /// in arrival order
    pub fn open<M, F>(url: impl Into<String>, settings: ConnectionSettings, handler: F) -> Self
    where
        M: DeserializeOwned + Send + 'static,
        F: FnMut(M) + Send + 'static,
    {
        let url = url.into();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared: SharedHandler<M> = Arc::new(Mutex::new(Some(Box::new(handler))));
        let detach = Arc::clone(&shared);

        let worker = ConnectionWorker {
            url: url.clone(),
            policy: ReconnectPolicy::new(settings.reconnect.clone()),
            connect_timeout: settings.connect_timeout,
            recv_timeout: settings.recv_timeout,
            state_tx,
            shutdown_rx,
            handler: shared,
        };
        let task = tokio::spawn(worker.run());

        Self {
            url,
            state_rx,
            shutdown_tx,
            detach_handler: Box::new(move || {
                detach.lock().take();
            }),
            task: Some(task),
            closed: false,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        if self.closed {
            return ConnectionState::Disconnected;
        }
        *self.state_rx.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the connection.
    ///
    /// Cancels any pending reconnect timer and closes the transport. Once this
    /// returns the handler is never invoked again, even if an invocation was in
    /// progress on the connection task.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.shutdown_tx.send(true);
        (self.detach_handler)();
        debug!(url = %self.url, "Stream connection closed");
    }

    /// Close and wait for the connection task to finish
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connection task state
struct ConnectionWorker<M> {
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    recv_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    handler: SharedHandler<M>,
}

impl<M> ConnectionWorker<M>
where
    M: DeserializeOwned + Send + 'static,
{
    /// Connecting -> Connected -> Disconnected -> Connecting, until shutdown
    async fn run(mut self) {
        info!(url = %self.url, "Starting stream connection");

        loop {
            if self.is_shutdown() {
                break;
            }
            self.set_state(ConnectionState::Connecting);

            let opened = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => None,
                result = timeout(self.connect_timeout, WebSocketClient::connect(&self.url)) => {
                    Some(result.unwrap_or_else(|_| Err(MarketDataError::ConnectionTimeout)))
                }
            };

            match opened {
                None => break,
                Some(Ok(mut client)) => {
                    self.policy.reset();
                    self.set_state(ConnectionState::Connected);

                    if let Err(e) = self.pump(&mut client).await {
                        warn!(url = %self.url, error = %e, "Stream connection lost");
                    }
                    client.close().await;
                }
                Some(Err(e)) => {
                    warn!(url = %self.url, error = %e, "Stream connection failed to open");
                }
            }

            if self.is_shutdown() {
                break;
            }
            self.set_state(ConnectionState::Disconnected);

            let delay = self.policy.next_delay();
            metrics().reconnect_attempts.inc();
            info!(
                url = %self.url,
                attempt = self.policy.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after delay"
            );

            let cancelled = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => true,
                _ = sleep(delay) => false,
            };
            if cancelled {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(url = %self.url, "Stream connection stopped");
    }

    /// Receive frames until the transport fails, the peer goes silent, or
    /// shutdown is requested
    async fn pump(&mut self, client: &mut WebSocketClient) -> Result<()> {
        let mut probing = false;
        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => None,
                result = timeout(self.recv_timeout, client.recv()) => Some(result),
            };

            match received {
                None => return Ok(()),
                Some(Ok(inbound)) => {
                    probing = false;
                    if let Inbound::Payload(raw) = inbound? {
                        self.dispatch(&raw);
                    }
                }
                Some(Err(_)) if probing => {
                    warn!(url = %self.url, "Keepalive unanswered, treating peer as gone");
                    return Err(MarketDataError::ConnectionTimeout);
                }
                Some(Err(_)) => {
                    debug!(
                        url = %self.url,
                        idle_ms = self.recv_timeout.as_millis() as u64,
                        "Stream idle, sending keepalive"
                    );
                    client.ping().await?;
                    probing = true;
                }
            }
        }
    }

    /// Decode one frame and invoke the handler; malformed frames are dropped
    fn dispatch(&self, raw: &[u8]) {
        match serde_json::from_slice::<M>(raw) {
            Ok(message) => {
                let mut guard = self.handler.lock();
                if let Some(handler) = guard.as_mut() {
                    handler(message);
                }
            }
            Err(e) => {
                metrics().frames_rejected.inc();
                warn!(url = %self.url, error = %e, len = raw.len(), "Dropping malformed frame");
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Publish `state`. The live gauge counts connections, so each worker only
    /// moves it on its own Connected edges.
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous == state {
            return;
        }
        debug!(url = %self.url, from = ?previous, to = ?state, "Connection state changed");
        match (previous.is_live(), state.is_live()) {
            (false, true) => metrics().connection_live.inc(),
            (true, false) => metrics().connection_live.dec(),
            _ => {}
        }
    }
}
