//! Aether Market Data Client Library
//!
//! This crate provides the live market data stream client for the Aether
//! dashboard: a history snapshot fetched over REST, reconciled with a
//! self-healing WebSocket tick stream into one bounded series.

use std::sync::Arc;
use tokio::sync::RwLock;

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod series;
pub mod websocket;

pub use api::{ApiClient, ChatClient, HistorySource, NewsClient, NewsItem, SentimentLabel};
pub use config::Config;
pub use error::{MarketDataError, Result};
pub use parser::Tick;
pub use series::{
    Generation, LoadState, MarketSeriesStore, MergePolicy, Series, SeriesKey, SeriesSnapshot,
    SeriesState,
};
pub use websocket::{
    Backoff, ConnectionSettings, ConnectionState, ReconnectSettings, StreamConnection,
};

/// Application state shared across components
pub struct AppState {
    pub store: Arc<RwLock<MarketSeriesStore>>,
    pub chat: ChatClient,
    pub news: NewsClient,
    pub config: Arc<Config>,
}
