//! Configuration module for the market data client
//!
//! A single backend base URL is loaded once at process start and every
//! collaborator derives its endpoint from it.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::series::MergePolicy;
use crate::websocket::{Backoff, ConnectionSettings, ReconnectSettings};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL (e.g., "http://localhost:8000/api/v1")
    pub api_base_url: String,

    /// Initial selection
    pub default_symbol: String,
    pub default_days: u32,

    /// Maximum number of ticks retained in the series
    pub series_cap: usize,

    /// What happens to ticks that arrive while history is still loading
    pub merge_policy: MergePolicy,

    /// Reconnection settings
    pub reconnect_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub reconnect_backoff: Backoff,

    /// Deadline for the stream upgrade handshake
    pub connect_timeout_secs: u64,

    /// Idle time before a keepalive ping is sent on the stream
    pub recv_timeout_secs: u64,

    /// REST request timeout
    pub http_timeout_secs: u64,

    /// News items requested by the service
    pub news_limit: usize,

    /// Port for the health/metrics server
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let merge_policy = env::var("MERGE_POLICY")
            .unwrap_or_else(|_| "discard".to_string())
            .parse::<MergePolicy>()?;
        let reconnect_backoff = env::var("RECONNECT_BACKOFF")
            .unwrap_or_else(|_| "fixed".to_string())
            .parse::<Backoff>()?;

        let config = Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            default_symbol: env::var("DEFAULT_SYMBOL").unwrap_or_else(|_| "BTC-USD".to_string()),
            default_days: parse_or("DEFAULT_DAYS", 1),
            series_cap: parse_or("SERIES_CAP", 500),
            merge_policy,
            reconnect_delay_ms: parse_or("RECONNECT_DELAY_MS", 3000),
            reconnect_max_delay_ms: parse_or("RECONNECT_MAX_DELAY_MS", 60_000),
            reconnect_backoff,
            connect_timeout_secs: parse_or("CONNECT_TIMEOUT_SECS", 10),
            recv_timeout_secs: parse_or("RECV_TIMEOUT_SECS", 45),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 10),
            news_limit: parse_or("NEWS_LIMIT", 5),
            health_port: parse_or("HEALTH_PORT", 9090),
        };

        if config.series_cap == 0 {
            anyhow::bail!("SERIES_CAP must be greater than zero");
        }

        Ok(config)
    }

    /// Create a config pointing at another backend, all other values default
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// `GET` endpoint for the history snapshot
    pub fn history_url(&self, symbol: &str, days: u32) -> String {
        format!("{}/market/history/{}?days={}", self.api_base_url, symbol, days)
    }

    /// Symbol-scoped push endpoint; the scheme follows the base URL
    /// (`http` becomes `ws`, `https` becomes `wss`)
    pub fn stream_url(&self, symbol: &str) -> String {
        let ws_base = self.api_base_url.replacen("http", "ws", 1);
        format!("{}/market/ws/{}", ws_base, symbol)
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat/", self.api_base_url)
    }

    pub fn news_url(&self, limit: usize) -> String {
        format!("{}/news/?limit={}", self.api_base_url, limit)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Stream connection settings derived from the reconnect fields
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            reconnect: ReconnectSettings {
                delay: Duration::from_millis(self.reconnect_delay_ms),
                max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
                backoff: self.reconnect_backoff,
                ..ReconnectSettings::default()
            },
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            recv_timeout: Duration::from_secs(self.recv_timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            default_symbol: "BTC-USD".to_string(),
            default_days: 1,
            series_cap: 500,
            merge_policy: MergePolicy::default(),
            reconnect_delay_ms: 3000,
            reconnect_max_delay_ms: 60_000,
            reconnect_backoff: Backoff::default(),
            connect_timeout_secs: 10,
            recv_timeout_secs: 45,
            http_timeout_secs: 10,
            news_limit: 5,
            health_port: 9090,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
