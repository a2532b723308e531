use std::time::Duration;

use async_trait::async_trait;

use super::FulfillmentService;
use crate::error::ExternalServiceError;
use crate::models::FulfillmentResult;

/// Calls a JSON HTTP API whose URL embeds the target, e.g.
/// `https://api.example/like?uid={target}`.
pub struct HttpFulfillment {
    client: reqwest::Client,
    url_template: String,
}

impl HttpFulfillment {
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build fulfillment client: {e}"))?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    pub fn url_for(&self, target_id: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target_id.as_bytes()).collect();
        self.url_template.replace("{target}", &encoded)
    }
}

#[async_trait]
impl FulfillmentService for HttpFulfillment {
    async fn fulfill(&self, target_id: &str) -> Result<FulfillmentResult, ExternalServiceError> {
        let resp = self.client.get(self.url_for(target_id)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExternalServiceError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ExternalServiceError::Malformed(format!("fulfillment response: {e}")))
    }
}
