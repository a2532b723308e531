use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::FulfillmentResult;

/// Verification and fulfillment state for one requester/target pair.
///
/// `fulfilled` implies `verified`; once fulfilled a record never changes again.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Record {
    pub id: Uuid,
    pub requester_id: i64,
    pub target_id: String,
    pub verified: bool,
    pub fulfilled: bool,
    pub result: Option<Json<FulfillmentResult>>,
    pub claim_id: Option<Uuid>,
    pub claimed_until: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new_verified(requester_id: i64, target_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            requester_id,
            target_id: target_id.to_string(),
            verified: true,
            fulfilled: false,
            result: None,
            claim_id: None,
            claimed_until: None,
            attempts: 0,
            last_error: None,
            verified_at: Some(now),
            fulfilled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Verified, not yet fulfilled, and not held by a live claim.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.verified
            && !self.fulfilled
            && self.claimed_until.is_none_or(|until| until < now)
    }

    pub fn stored_result(&self) -> Option<&FulfillmentResult> {
        self.result.as_ref().map(|json| &json.0)
    }
}
