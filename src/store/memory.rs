use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sqlx::types::Json;
use uuid::Uuid;

use super::Store;
use crate::error::StoreError;
use crate::models::{FulfillmentResult, NewToken, Record, VerificationToken};

/// Process-local store. Tokens and records are lost on restart; expired
/// tokens are dropped by `purge_expired_tokens`.
#[derive(Default)]
pub struct MemoryStore {
    /// token_hash -> token
    tokens: DashMap<String, VerificationToken>,
    /// (requester_id, target_id) -> record id
    index: DashMap<(i64, String), Uuid>,
    records: DashMap<Uuid, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_token(&self, token: NewToken) -> Result<(), StoreError> {
        let stored = VerificationToken {
            token_hash: token.token_hash.clone(),
            requester_id: token.requester_id,
            target_id: token.target_id,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };

        match self.tokens.entry(token.token_hash) {
            Entry::Occupied(_) => Err(StoreError::Backend("duplicate token".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(stored);
                Ok(())
            }
        }
    }

    async fn redeem_token(&self, token_hash: &str) -> Result<Option<VerificationToken>, StoreError> {
        let now = Utc::now();
        Ok(self
            .tokens
            .remove_if(token_hash, |_, token| !token.is_expired(now))
            .map(|(_, token)| token))
    }

    async fn purge_expired_tokens(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.is_expired(now));
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }

    async fn mark_verified(&self, requester_id: i64, target_id: &str) -> Result<Record, StoreError> {
        let now = Utc::now();

        // The index entry stays locked until the record exists, so two
        // verifications of a new pair cannot create two records.
        match self.index.entry((requester_id, target_id.to_string())) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                let mut record = self
                    .records
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Backend(format!("indexed record {id} missing")))?;
                record.verified = true;
                if record.verified_at.is_none() {
                    record.verified_at = Some(now);
                }
                record.updated_at = now;
                Ok(record.clone())
            }
            Entry::Vacant(slot) => {
                let record = Record::new_verified(requester_id, target_id, now);
                self.records.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn find_record(
        &self,
        requester_id: i64,
        target_id: &str,
    ) -> Result<Option<Record>, StoreError> {
        let id = match self.index.get(&(requester_id, target_id.to_string())) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.records.get(&id).map(|record| record.value().clone()))
    }

    async fn pending_records(&self, limit: i64) -> Result<Vec<Record>, StoreError> {
        let now = Utc::now();
        let mut pending: Vec<Record> = self
            .records
            .iter()
            .filter(|record| record.is_claimable(now))
            .map(|record| record.value().clone())
            .collect();

        pending.sort_by_key(|record| record.verified_at);
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    async fn claim_record(
        &self,
        id: Uuid,
        claim_id: Uuid,
        lease: Duration,
    ) -> Result<Option<Record>, StoreError> {
        let lease = TimeDelta::from_std(lease)
            .map_err(|e| StoreError::Backend(format!("invalid claim lease: {e}")))?;
        let now = Utc::now();

        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if !record.is_claimable(now) {
            return Ok(None);
        }

        record.claim_id = Some(claim_id);
        record.claimed_until = Some(now + lease);
        record.attempts += 1;
        record.updated_at = now;
        Ok(Some(record.clone()))
    }

    async fn store_result(
        &self,
        id: Uuid,
        claim_id: Uuid,
        result: &FulfillmentResult,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if record.claim_id != Some(claim_id) || record.fulfilled {
            return Ok(false);
        }

        record.result = Some(Json(result.clone()));
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_fulfilled(&self, id: Uuid, claim_id: Uuid) -> Result<bool, StoreError> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if record.claim_id != Some(claim_id) || !record.verified || record.fulfilled {
            return Ok(false);
        }

        let now = Utc::now();
        record.fulfilled = true;
        record.fulfilled_at = Some(now);
        record.claim_id = None;
        record.claimed_until = None;
        record.last_error = None;
        record.updated_at = now;
        Ok(true)
    }

    async fn release_claim(&self, id: Uuid, claim_id: Uuid, error: &str) -> Result<(), StoreError> {
        if let Some(mut record) = self.records.get_mut(&id) {
            if record.claim_id == Some(claim_id) && !record.fulfilled {
                record.claim_id = None;
                record.claimed_until = None;
                record.last_error = Some(error.to_string());
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}
