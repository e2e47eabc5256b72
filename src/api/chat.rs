//! Chat assistant client

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::ApiClient;
use crate::error::{MarketDataError, Result};

/// Shown in place of an answer when the assistant cannot be reached
pub const CHAT_FALLBACK: &str =
    "Sorry, I'm having trouble connecting to the AI service right now.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Assistant reply
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Sends one user message per request; no history, no retry
#[derive(Debug, Clone)]
pub struct ChatClient {
    api: ApiClient,
}

impl ChatClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask the assistant, surfacing any failure
    pub async fn try_ask(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(MarketDataError::Chat("Empty message".to_string()));
        }

        let url = self.api.config().chat_url();
        debug!(url = %url, len = message.len(), "Sending chat message");

        let reply = self
            .api
            .http()
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| MarketDataError::Chat(e.to_string()))?
            .json::<ChatResponse>()
            .await
            .map_err(|e| MarketDataError::Chat(e.to_string()))?;

        Ok(reply.response)
    }

    /// Ask the assistant; failures degrade to [`CHAT_FALLBACK`]
    pub async fn ask(&self, message: &str) -> String {
        match self.try_ask(message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Chat request failed");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}
