//! Parser module for market data frames
//!
//! Handles deserialization of ticker frames pushed on the stream and of the
//! history snapshot returned by the REST endpoint.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single price observation for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol (e.g., "BTC-USD")
    pub symbol: String,

    /// Last price
    pub price: f64,

    /// Exchange-defined timestamp, opaque to the client
    pub timestamp: String,

    /// 24h change in percent, present on live frames only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,

    /// Traded volume, present on live frames only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Tick {
    /// Create a tick without the optional enrichment fields
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: timestamp.into(),
            change_24h: None,
            volume: None,
        }
    }

    /// Parse a history snapshot body (array of tick objects)
    pub fn parse_history(raw: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Best-effort reading of the timestamp as UTC.
    ///
    /// Accepts RFC 3339 and naive ISO-8601 (the backend emits naive UTC).
    /// Display only; the series never orders by it.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}
