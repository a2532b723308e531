//! Minimal Telegram Bot API client: `sendMessage` for notifications and
//! replies, `getUpdates` for the command poller.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::error::ExternalServiceError;

pub struct TelegramClient {
    client: reqwest::Client,
    base: String,
}

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
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build Telegram client: {e}"))?;

        Ok(Self {
            client,
            base: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), ExternalServiceError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }

        let _: serde_json::Value = self
            .call("sendMessage", &body, None)
            .await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`. The HTTP timeout is stretched past
    /// the poll window so an idle poll is not reported as a failure.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_secs: u64,
    ) -> Result<Vec<Update>, ExternalServiceError> {
        let mut body = json!({ "timeout": poll_secs, "allowed_updates": ["message"] });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        self.call(
            "getUpdates",
            &body,
            Some(Duration::from_secs(poll_secs + 10)),
        )
        .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, ExternalServiceError> {
        let mut req = self.client.post(format!("{}/{method}", self.base)).json(body);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let payload: ApiResponse<T> = resp.json().await.map_err(|e| {
            if status.is_success() {
                ExternalServiceError::Malformed(format!("{method}: {}", e.without_url()))
            } else {
                ExternalServiceError::Status(status.as_u16())
            }
        })?;

        if !payload.ok {
            return Err(ExternalServiceError::Rejected(
                payload
                    .description
                    .unwrap_or_else(|| format!("{method} returned ok=false")),
            ));
        }

        payload
            .result
            .ok_or_else(|| ExternalServiceError::Malformed(format!("{method}: missing result")))
    }
}
