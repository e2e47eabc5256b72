//! Market series module
//!
//! Reconciles a history snapshot with the live tick stream into one bounded,
//! append-only series for the selected (symbol, range).

mod buffer;
mod state;
mod store;

pub use buffer::Series;
pub use state::SeriesState;
pub use store::MarketSeriesStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketDataError;
use crate::parser::Tick;

/// Default number of ticks retained
pub const DEFAULT_SERIES_CAP: usize = 500;

/// The (symbol, range) a series belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    /// Range in days
    pub days: u32,
}

impl SeriesKey {
    pub fn new(symbol: &str, days: u32) -> Result<Self, MarketDataError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(MarketDataError::InvalidSelection(
                "symbol must not be empty".to_string(),
            ));
        }
        if days == 0 {
            return Err(MarketDataError::InvalidSelection(
                "range must be at least one day".to_string(),
            ));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            days,
        })
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}d", self.symbol, self.days)
    }
}

/// Selection generation; results tagged with an older generation are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// Fate of ticks that arrive while the history fetch is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Drop them; history is the whole truth up to its resolution
    #[default]
    DiscardInterim,
    /// Hold them and append after the history once it resolves
    BufferAndReplay,
}

impl FromStr for MergePolicy {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(MergePolicy::DiscardInterim),
            "buffer" | "replay" => Ok(MergePolicy::BufferAndReplay),
            other => Err(MarketDataError::ConfigError(format!(
                "unknown merge policy '{}'",
                other
            ))),
        }
    }
}

/// Progress of the history snapshot for the current selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum LoadState {
    /// Nothing selected
    Idle,
    Loading,
    Loaded,
    /// The fetch failed; streaming still appends
    Failed(String),
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Read model handed to consumers
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSnapshot {
    pub key: Option<SeriesKey>,
    pub generation: Generation,
    pub ticks: Vec<Tick>,
    pub load_state: LoadState,
    pub is_live: bool,
}

impl SeriesSnapshot {
    pub fn prices(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.price).collect()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.ticks.last().map(|t| t.price)
    }
}
