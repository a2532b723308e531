//! Token and record persistence.
//!
//! All shared mutable state goes through [`Store`]; callers never see the
//! underlying containers. Every method is atomic with respect to the token or
//! record it touches.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{FulfillmentResult, NewToken, Record, VerificationToken};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_token(&self, token: NewToken) -> Result<(), StoreError>;

    /// Look up and remove an unexpired token. At most one caller ever gets
    /// `Some` for a given hash.
    async fn redeem_token(&self, token_hash: &str) -> Result<Option<VerificationToken>, StoreError>;

    async fn purge_expired_tokens(&self) -> Result<u64, StoreError>;

    async fn mark_verified(&self, requester_id: i64, target_id: &str) -> Result<Record, StoreError>;

    /// Redeem a token and mark its pair verified. Backends that can do both in
    /// one transaction override this.
    async fn redeem_and_verify(&self, token_hash: &str) -> Result<Option<Record>, StoreError> {
        match self.redeem_token(token_hash).await? {
            Some(token) => Ok(Some(
                self.mark_verified(token.requester_id, &token.target_id).await?,
            )),
            None => Ok(None),
        }
    }

    async fn find_record(
        &self,
        requester_id: i64,
        target_id: &str,
    ) -> Result<Option<Record>, StoreError>;

    /// Verified, unfulfilled, unclaimed records, oldest verification first.
    async fn pending_records(&self, limit: i64) -> Result<Vec<Record>, StoreError>;

    async fn claim_record(
        &self,
        id: Uuid,
        claim_id: Uuid,
        lease: Duration,
    ) -> Result<Option<Record>, StoreError>;

    async fn store_result(
        &self,
        id: Uuid,
        claim_id: Uuid,
        result: &FulfillmentResult,
    ) -> Result<bool, StoreError>;

    /// Set `fulfilled` if `claim_id` still holds the record. Returns false if
    /// the claim was lost or the record is already fulfilled.
    async fn mark_fulfilled(&self, id: Uuid, claim_id: Uuid) -> Result<bool, StoreError>;

    async fn release_claim(&self, id: Uuid, claim_id: Uuid, error: &str) -> Result<(), StoreError>;
}
