use sqlx::PgPool;

use crate::models::{NewToken, VerificationToken};

pub async fn create(pool: &PgPool, token: &NewToken) -> Result<VerificationToken, sqlx::Error> {
    sqlx::query_as::<_, VerificationToken>(
        "INSERT INTO verification_tokens (token_hash, requester_id, target_id, expires_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&token.token_hash)
    .bind(token.requester_id)
    .bind(&token.target_id)
    .bind(token.expires_at)
    .fetch_one(pool)
    .await
}

/// Delete-and-return in one statement, so concurrent redemptions of the same
/// token see at most one row.
pub async fn consume<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token_hash: &str,
) -> Result<Option<VerificationToken>, sqlx::Error> {
    sqlx::query_as::<_, VerificationToken>(
        "DELETE FROM verification_tokens
         WHERE token_hash = $1 AND expires_at > now()
         RETURNING *",
    )
    .bind(token_hash)
    .fetch_optional(executor)
    .await
}

pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
