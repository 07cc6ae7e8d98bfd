//! Telegram Bot API channel — message sending + webhook payload types.

use serde::{Deserialize, Serialize};
use serde_json::json;

use roamcast_core::error::{Result, RoamcastError};

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| RoamcastError::Channel(format!("{method} failed: {e}")))?;

        let body: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| RoamcastError::Channel(format!("Invalid {method} response: {e}")))?;

        if !body.ok {
            return Err(RoamcastError::Channel(format!(
                "{method} error: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }

    /// Send a text message; returns the new message id.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<String> {
        let result = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(result["message_id"]
            .as_i64()
            .map(|id| id.to_string())
            .unwrap_or_default())
    }

    /// Send a photo by URL with a caption; returns the new message id.
    pub async fn send_photo(&self, chat_id: &str, photo_url: &str, caption: &str) -> Result<String> {
        let result = self
            .call(
                "sendPhoto",
                json!({
                    "chat_id": chat_id,
                    "photo": photo_url,
                    "caption": caption,
                }),
            )
            .await?;
        Ok(result["message_id"]
            .as_i64()
            .map(|id| id.to_string())
            .unwrap_or_default())
    }

    /// Get bot info — used as a startup connectivity check.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let result = self.call("getMe", json!({})).await?;
        serde_json::from_value(result)
            .map_err(|e| RoamcastError::Channel(format!("Invalid getMe response: {e}")))
    }

    /// Best-effort status notice to the admin chat. Notification failures are
    /// logged, never escalated.
    pub async fn notify_admin(&self, admin_chat_id: &str, text: &str) {
        if admin_chat_id.is_empty() {
            tracing::info!("Status notice (admin chat not set): {text}");
            return;
        }
        if let Err(e) = self.send_message(admin_chat_id, text).await {
            tracing::warn!("⚠️ Admin notice failed: {e}");
        }
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    #[serde(default)]
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

impl TelegramUpdate {
    /// The human-authored text message in this update, if any.
    /// Bot senders and non-text payloads yield `None`.
    pub fn text_message(&self) -> Option<&TelegramMessage> {
        let msg = self.message.as_ref()?;
        msg.text.as_ref()?;
        if msg.from.as_ref().is_some_and(|f| f.is_bot) {
            return None;
        }
        Some(msg)
    }
}
