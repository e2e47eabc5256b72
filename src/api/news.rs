//! News and sentiment feed client

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::ApiClient;
use crate::error::{MarketDataError, Result};

/// Sentiment attached to a news item by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl From<String> for SentimentLabel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Bullish" => SentimentLabel::Bullish,
            "Bearish" => SentimentLabel::Bearish,
            _ => SentimentLabel::Neutral,
        }
    }
}

impl SentimentLabel {
    pub fn badge(self) -> &'static str {
        match self {
            SentimentLabel::Bullish => "BULLISH",
            SentimentLabel::Bearish => "BEARISH",
            SentimentLabel::Neutral => "NEUTRAL",
        }
    }
}

/// One news item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub source: String,
    pub published_at: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// -1.0 (bearish) to 1.0 (bullish)
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub sentiment_label: SentimentLabel,
}

#[derive(Debug, Clone)]
pub struct NewsClient {
    api: ApiClient,
}

impl NewsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Latest `limit` items, newest first as served
    pub async fn fetch_latest(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let url = self.api.config().news_url(limit);
        info!(url = %url, limit, "Fetching news feed");

        self.api
            .http()
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| MarketDataError::News(e.to_string()))?
            .json::<Vec<NewsItem>>()
            .await
            .map_err(|e| MarketDataError::News(e.to_string()))
    }

    /// Latest items, or an empty feed if the request fails
    pub async fn latest_or_empty(&self, limit: usize) -> Vec<NewsItem> {
        match self.fetch_latest(limit).await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to fetch news");
                Vec::new()
            }
        }
    }
}
