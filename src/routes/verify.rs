use axum::extract::{Path, State};

use crate::error::AppError;
use crate::state::SharedState;
use crate::verification;

pub const SUCCESS_MESSAGE: &str = "Verification successful! Return to the chat.";

pub async fn verify(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<&'static str, AppError> {
    verification::redeem(state.store.as_ref(), &token).await?;
    Ok(SUCCESS_MESSAGE)
}
