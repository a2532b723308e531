pub mod http;

use async_trait::async_trait;

use crate::error::ExternalServiceError;
use crate::models::FulfillmentResult;

pub use http::HttpFulfillment;

/// The external action performed once per verified record.
#[async_trait]
pub trait FulfillmentService: Send + Sync {
    async fn fulfill(&self, target_id: &str) -> Result<FulfillmentResult, ExternalServiceError>;
}
