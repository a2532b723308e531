use serde::{Deserialize, Serialize};

/// Payload returned by the fulfillment service for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentResult {
    pub name: String,
    pub level: i64,
    pub likes_before: i64,
    pub likes_added: i64,
    pub likes_after: i64,
    pub processed_at: String,
}
