use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::db;
use crate::error::StoreError;
use crate::models::{FulfillmentResult, NewToken, Record, VerificationToken};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_token(&self, token: NewToken) -> Result<(), StoreError> {
        db::tokens::create(&self.pool, &token).await?;
        Ok(())
    }

    async fn redeem_token(&self, token_hash: &str) -> Result<Option<VerificationToken>, StoreError> {
        Ok(db::tokens::consume(&self.pool, token_hash).await?)
    }

    async fn purge_expired_tokens(&self) -> Result<u64, StoreError> {
        Ok(db::tokens::delete_expired(&self.pool).await?)
    }

    async fn mark_verified(&self, requester_id: i64, target_id: &str) -> Result<Record, StoreError> {
        Ok(db::records::upsert_verified(&self.pool, requester_id, target_id).await?)
    }

    async fn redeem_and_verify(&self, token_hash: &str) -> Result<Option<Record>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(token) = db::tokens::consume(&mut *tx, token_hash).await? else {
            return Ok(None);
        };

        let record =
            db::records::upsert_verified(&mut *tx, token.requester_id, &token.target_id).await?;
        tx.commit().await?;

        Ok(Some(record))
    }

    async fn find_record(
        &self,
        requester_id: i64,
        target_id: &str,
    ) -> Result<Option<Record>, StoreError> {
        Ok(db::records::find_by_pair(&self.pool, requester_id, target_id).await?)
    }

    async fn pending_records(&self, limit: i64) -> Result<Vec<Record>, StoreError> {
        Ok(db::records::list_pending(&self.pool, limit).await?)
    }

    async fn claim_record(
        &self,
        id: Uuid,
        claim_id: Uuid,
        lease: Duration,
    ) -> Result<Option<Record>, StoreError> {
        Ok(db::records::claim(&self.pool, id, claim_id, lease.as_secs_f64()).await?)
    }

    async fn store_result(
        &self,
        id: Uuid,
        claim_id: Uuid,
        result: &FulfillmentResult,
    ) -> Result<bool, StoreError> {
        Ok(db::records::store_result(&self.pool, id, claim_id, result).await?)
    }

    async fn mark_fulfilled(&self, id: Uuid, claim_id: Uuid) -> Result<bool, StoreError> {
        Ok(db::records::mark_fulfilled(&self.pool, id, claim_id).await?)
    }

    async fn release_claim(&self, id: Uuid, claim_id: Uuid, error: &str) -> Result<(), StoreError> {
        Ok(db::records::release(&self.pool, id, claim_id, error).await?)
    }
}
