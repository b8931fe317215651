use crate::error::TelegramError;
use crate::updates::{ApiResponse, Update};
use async_trait::async_trait;
use configuration::TelegramConfig;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub mod error;
pub mod updates;

/// The outbound side of the chat transport: deliver one text message to one
/// chat destination. The engine only ever talks to this trait; the live
/// implementation is `TelegramBot`, tests use a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
}

/// A client for the Telegram Bot API: sends messages and long-polls for
/// inbound updates.
#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    token: String,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            token: config.token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    /// Long-polls `getUpdates`. Returns all updates with `update_id >= offset`;
    /// the caller acknowledges them by passing `last_update_id + 1` next time.
    /// Blocks server-side for up to `timeout_secs` when there is nothing new.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", timeout_secs as i64)])
            // The request timeout must outlast the server-side poll window.
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(TelegramError::ApiError(error_text));
        }

        let body = response.json::<ApiResponse<Vec<Update>>>().await?;
        if !body.ok {
            return Err(TelegramError::ApiError(
                body.description.unwrap_or_else(|| "getUpdates returned ok=false".to_string()),
            ));
        }

        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl Notifier for TelegramBot {
    /// Sends a plain-text message to the given chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let payload = SendMessagePayload { chat_id, text };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(TelegramError::ApiError(error_text));
        }

        Ok(())
    }
}
