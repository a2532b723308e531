use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending verification. Only the SHA-256 of the token is stored; the raw
/// token lives in the link handed to the requester.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct VerificationToken {
    pub token_hash: String,
    pub requester_id: i64,
    pub target_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewToken {
    pub token_hash: String,
    pub requester_id: i64,
    pub target_id: String,
    pub expires_at: DateTime<Utc>,
}
