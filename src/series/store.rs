//! Market series store
//!
//! Owns the series for the active selection, the in-flight history fetch and
//! the stream connection feeding it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{Generation, SeriesKey, SeriesSnapshot, SeriesState};
use crate::api::HistorySource;
use crate::config::Config;
use crate::error::{MarketDataError, Result};
use crate::parser::Tick;
use crate::websocket::{ConnectionState, StreamConnection};

/// Controller for one dashboard chart.
///
/// Every selection change is a cancellation boundary: the previous fetch is
/// aborted, the previous connection closed, and anything either of them still
/// delivers is dropped by generation. Must be used from within a tokio
/// runtime.
pub struct MarketSeriesStore {
    config: Arc<Config>,
    history: Arc<dyn HistorySource>,
    state: Arc<Mutex<SeriesState>>,
    connection: Option<StreamConnection>,
    fetch_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl MarketSeriesStore {
    pub fn new(config: Arc<Config>, history: Arc<dyn HistorySource>) -> Self {
        let state = SeriesState::new(config.series_cap, config.merge_policy);
        Self {
            config,
            history,
            state: Arc::new(Mutex::new(state)),
            connection: None,
            fetch_task: None,
            closed: false,
        }
    }

    /// Point the store at `(symbol, days)`.
    ///
    /// Clears the series, fetches history and (re)opens the stream for the
    /// symbol. Selecting the current key again does nothing.
    pub fn select_series(&mut self, symbol: &str, days: u32) -> Result<Generation> {
        if self.closed {
            return Err(MarketDataError::InvalidSelection(
                "store has been closed".to_string(),
            ));
        }
        let key = SeriesKey::new(symbol, days)?;

        let generation = {
            let mut state = self.state.lock();
            if state.key() == Some(&key) {
                debug!(key = %key, "Selection unchanged");
                return Ok(state.generation());
            }
            state.begin(key.clone())
        };

        self.stop_inflight();
        info!(key = %key, generation = generation.0, "Series selected");

        let history = Arc::clone(&self.history);
        let state = Arc::clone(&self.state);
        let fetch_key = key.clone();
        self.fetch_task = Some(tokio::spawn(async move {
            let result = history.fetch_history(&fetch_key.symbol, fetch_key.days).await;
            state.lock().apply_history(generation, result);
        }));

        let state = Arc::clone(&self.state);
        self.connection = Some(StreamConnection::open(
            self.config.stream_url(&key.symbol),
            self.config.connection_settings(),
            move |tick: Tick| {
                state.lock().apply_tick(generation, tick);
            },
        ));

        Ok(generation)
    }

    /// Current series and health flag
    pub fn snapshot(&self) -> SeriesSnapshot {
        let is_live = self.is_live();
        self.state.lock().snapshot(is_live)
    }

    /// Mirrors the connection's `Connected` state
    pub fn is_live(&self) -> bool {
        self.connection
            .as_ref()
            .map(StreamConnection::is_live)
            .unwrap_or(false)
    }

    pub fn key(&self) -> Option<SeriesKey> {
        self.state.lock().key().cloned()
    }

    /// State receiver for the current connection; replaced on every selection
    /// change
    pub fn watch_connection(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.connection.as_ref().map(StreamConnection::watch_state)
    }

    /// Tear down: stale-mark outstanding results, abort the fetch, close the
    /// stream. The last series stays readable.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state.lock().invalidate();
        self.stop_inflight();
        info!("Series store closed");
    }

    /// Close and wait for the connection task to stop
    pub async fn shutdown(mut self) {
        let connection = self.connection.take();
        self.close();
        if let Some(connection) = connection {
            connection.shutdown().await;
        }
    }

    fn stop_inflight(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl Drop for MarketSeriesStore {
    fn drop(&mut self) {
        self.close();
    }
}
