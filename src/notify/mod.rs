pub mod telegram;
pub mod templates;

use async_trait::async_trait;

use crate::error::ExternalServiceError;

pub use telegram::TelegramNotifier;

/// Delivers a formatted message to a requester. Failures are retryable and
/// must be reported, never swallowed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, requester_id: i64, text: &str) -> Result<(), ExternalServiceError>;
}
