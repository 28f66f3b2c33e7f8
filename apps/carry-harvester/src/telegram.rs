//! Minimal Telegram Bot API client: `getUpdates` long-poll and `sendMessage`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quantlaxmi_carry_store::ChatId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Outbound message channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

pub struct BotApi {
    client: reqwest::Client,
    base: String,
}

impl BotApi {
    /// `poll_timeout` is the server-side long-poll wait; the HTTP timeout is
    /// padded beyond it.
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram {method}"))?;

        let status = response.status();
        let text = response.text().await?;
        debug!(method, status = %status, body_len = text.len(), "[BOT] API response");

        let parsed: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Telegram {method} JSON parse error: {e} | status {status}"))?;
        if !parsed.ok {
            anyhow::bail!(
                "Telegram {} failed ({}): {}",
                method,
                status,
                parsed.description.unwrap_or_else(|| "unknown".to_string())
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("Telegram {method} returned no result"))
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout_secs,
                allowed_updates: ["message"],
            },
        )
        .await
    }

    pub async fn send_message(&self, chat_id: ChatId, html: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text: html,
                    parse_mode: "HTML",
                    disable_web_page_preview: true,
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for BotApi {
    async fn send_html(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await
    }
}
