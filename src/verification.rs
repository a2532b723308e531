use crate::error::AppError;
use crate::models::Record;
use crate::store::Store;
use crate::token;

/// Redeem a token presented by an untrusted caller and mark its pair verified.
/// A token that was never issued, was already used, or has expired yields
/// `AppError::InvalidToken`.
pub async fn redeem(store: &dyn Store, raw_token: &str) -> Result<Record, AppError> {
    if raw_token.is_empty() || raw_token.len() > 128 {
        return Err(AppError::InvalidToken);
    }

    let record = store
        .redeem_and_verify(&token::hash(raw_token))
        .await?
        .ok_or(AppError::InvalidToken)?;

    tracing::info!(
        requester_id = record.requester_id,
        target_id = %record.target_id,
        fulfilled = record.fulfilled,
        "Verification redeemed"
    );

    Ok(record)
}
