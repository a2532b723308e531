use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AppError;
use crate::models::NewToken;
use crate::state::AppState;
use crate::token;

const MAX_TARGET_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct IssuedLink {
    /// Raw token; appears only inside `verify_url`.
    pub token: String,
    pub verify_url: String,
    /// What the requester is shown: the shortened URL, or `verify_url` if
    /// shortening failed.
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a verification link for `requester_id` to request fulfillment of
/// `target_id`. Nothing is stored for a caller outside the allow-list.
pub async fn issue(
    state: &AppState,
    requester_id: i64,
    target_id: &str,
) -> Result<IssuedLink, AppError> {
    if !state.config.is_allowed(requester_id) {
        return Err(AppError::Unauthorized(
            "You are not allowed to use this command.".to_string(),
        ));
    }

    let target_id = validate_target(target_id)?;

    let ttl = TimeDelta::from_std(state.config.token_ttl)
        .map_err(|e| AppError::Internal(format!("Invalid token TTL: {e}")))?;
    let expires_at = Utc::now() + ttl;

    let raw = token::generate();
    state
        .store
        .insert_token(NewToken {
            token_hash: token::hash(&raw),
            requester_id,
            target_id: target_id.to_string(),
            expires_at,
        })
        .await?;

    let verify_url = format!("{}/verify/{raw}", state.config.base_url);
    let link = state.shortener.shorten(&verify_url).await;

    tracing::info!(requester_id, target_id, %expires_at, "Issued verification link");

    Ok(IssuedLink {
        token: raw,
        verify_url,
        link,
        expires_at,
    })
}

fn validate_target(target_id: &str) -> Result<&str, AppError> {
    let target_id = target_id.trim();
    if target_id.is_empty() {
        return Err(AppError::BadRequest("Target id is required".to_string()));
    }
    if target_id.len() > MAX_TARGET_LEN {
        return Err(AppError::BadRequest(format!(
            "Target id must be at most {MAX_TARGET_LEN} characters"
        )));
    }
    if target_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::BadRequest(
            "Target id must not contain whitespace".to_string(),
        ));
    }
    Ok(target_id)
}
