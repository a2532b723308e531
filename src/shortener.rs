use std::time::Duration;

use serde::Deserialize;

use crate::config::ShortenerConfig;
use crate::error::ExternalServiceError;

/// Optional link shortener. Shortening is cosmetic: any failure falls back to
/// the long URL.
pub struct Shortener {
    client: reqwest::Client,
    config: Option<ShortenerConfig>,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    status: String,
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

impl Shortener {
    pub fn new(config: Option<ShortenerConfig>, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build shortener client: {e}"))?;
        Ok(Self { client, config })
    }

    pub async fn shorten(&self, long_url: &str) -> String {
        let Some(config) = &self.config else {
            return long_url.to_string();
        };

        match self.request(config, long_url).await {
            Ok(short) => short,
            Err(e) => {
                tracing::warn!("Shortener unavailable, using long link: {e}");
                long_url.to_string()
            }
        }
    }

    async fn request(
        &self,
        config: &ShortenerConfig,
        long_url: &str,
    ) -> Result<String, ExternalServiceError> {
        let resp = self
            .client
            .get(&config.api_url)
            .query(&[("api", config.api_key.as_str()), ("url", long_url)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExternalServiceError::Status(status.as_u16()));
        }

        let body: ShortenResponse = resp.json().await?;
        match body {
            ShortenResponse {
                status,
                shortened_url: Some(url),
            } if status == "success" && !url.is_empty() => Ok(url),
            ShortenResponse { status, .. } => Err(ExternalServiceError::Rejected(format!(
                "shortener status {status}"
            ))),
        }
    }
}
