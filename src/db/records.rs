use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{FulfillmentResult, Record};

/// Insert or flip the pair to verified. A fulfilled record is left fulfilled.
pub async fn upsert_verified<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    requester_id: i64,
    target_id: &str,
) -> Result<Record, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "INSERT INTO records (id, requester_id, target_id, verified, verified_at)
         VALUES ($1, $2, $3, true, now())
         ON CONFLICT (requester_id, target_id) DO UPDATE
         SET verified = true,
             verified_at = COALESCE(records.verified_at, now()),
             updated_at = now()
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(requester_id)
    .bind(target_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_pair(
    pool: &PgPool,
    requester_id: i64,
    target_id: &str,
) -> Result<Option<Record>, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "SELECT * FROM records WHERE requester_id = $1 AND target_id = $2",
    )
    .bind(requester_id)
    .bind(target_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<Record>, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "SELECT * FROM records
         WHERE verified AND NOT fulfilled
           AND (claimed_until IS NULL OR claimed_until < now())
         ORDER BY verified_at ASC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Take the claim lease on a pending record. Returns None if the record is
/// fulfilled or another worker holds a live claim.
pub async fn claim(
    pool: &PgPool,
    id: Uuid,
    claim_id: Uuid,
    lease_secs: f64,
) -> Result<Option<Record>, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "UPDATE records
         SET claim_id = $2,
             claimed_until = now() + make_interval(secs => $3::double precision),
             attempts = attempts + 1,
             updated_at = now()
         WHERE id = $1
           AND verified AND NOT fulfilled
           AND (claimed_until IS NULL OR claimed_until < now())
         RETURNING *",
    )
    .bind(id)
    .bind(claim_id)
    .bind(lease_secs)
    .fetch_optional(pool)
    .await
}

pub async fn store_result(
    pool: &PgPool,
    id: Uuid,
    claim_id: Uuid,
    result: &FulfillmentResult,
) -> Result<bool, sqlx::Error> {
    let done = sqlx::query(
        "UPDATE records SET result = $3, updated_at = now()
         WHERE id = $1 AND claim_id = $2 AND NOT fulfilled",
    )
    .bind(id)
    .bind(claim_id)
    .bind(Json(result))
    .execute(pool)
    .await?;
    Ok(done.rows_affected() == 1)
}

pub async fn mark_fulfilled(pool: &PgPool, id: Uuid, claim_id: Uuid) -> Result<bool, sqlx::Error> {
    let done = sqlx::query(
        "UPDATE records
         SET fulfilled = true,
             fulfilled_at = now(),
             claim_id = NULL,
             claimed_until = NULL,
             last_error = NULL,
             updated_at = now()
         WHERE id = $1 AND claim_id = $2 AND verified AND NOT fulfilled",
    )
    .bind(id)
    .bind(claim_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() == 1)
}

pub async fn release(
    pool: &PgPool,
    id: Uuid,
    claim_id: Uuid,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE records
         SET claim_id = NULL, claimed_until = NULL, last_error = $3, updated_at = now()
         WHERE id = $1 AND claim_id = $2 AND NOT fulfilled",
    )
    .bind(id)
    .bind(claim_id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}
