//! REST collaborators of the dashboard backend
//!
//! Every client shares one `reqwest::Client` and one base URL taken from
//! [`Config`].

mod chat;
mod news;

pub use chat::{ChatClient, ChatResponse, CHAT_FALLBACK};
pub use news::{NewsClient, NewsItem, SentimentLabel};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MarketDataError, Result};
use crate::parser::Tick;

/// Source of the point-in-time history snapshot for a selection
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Ordered ticks covering the last `days` days of `symbol`
    async fn fetch_history(&self, symbol: &str, days: u32) -> Result<Vec<Tick>>;
}

/// HTTP client bound to the backend base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<Config>,
}

impl ApiClient {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| MarketDataError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl HistorySource for ApiClient {
    async fn fetch_history(&self, symbol: &str, days: u32) -> Result<Vec<Tick>> {
        let url = self.config.history_url(symbol, days);
        info!(symbol = %symbol, days, url = %url, "Fetching price history");

        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ticks = Tick::parse_history(&body)
            .map_err(|e| MarketDataError::HistoryFetch(format!("Malformed history body: {}", e)))?;

        debug!(symbol = %symbol, points = ticks.len(), "History received");
        Ok(ticks)
    }
}
