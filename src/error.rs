//! Error types for the market data client

use thiserror::Error;

/// Market data client errors
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    #[error("WebSocket message error: {0}")]
    WebSocketMessage(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("History fetch error: {0}")]
    HistoryFetch(String),

    #[error("Chat request error: {0}")]
    Chat(String),

    #[error("News request error: {0}")]
    News(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Connection timeout")]
    ConnectionTimeout,
}

impl From<tokio_tungstenite::tungstenite::Error> for MarketDataError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        MarketDataError::WebSocketConnection(err.to_string())
    }
}

impl From<serde_json::Error> for MarketDataError {
    fn from(err: serde_json::Error) -> Self {
        MarketDataError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        MarketDataError::HistoryFetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarketDataError>;
