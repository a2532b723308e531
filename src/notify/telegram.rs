use std::sync::Arc;

use async_trait::async_trait;

use super::Notifier;
use crate::error::ExternalServiceError;
use crate::telegram::TelegramClient;

pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, requester_id: i64, text: &str) -> Result<(), ExternalServiceError> {
        self.client
            .send_message(requester_id, text, Some("Markdown"))
            .await
    }
}
