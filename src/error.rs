use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors surfaced synchronously to whoever made the request (link clicker
/// or chat user).
#[derive(Debug)]
pub enum AppError {
    InvalidToken,
    Unauthorized(String),
    BadRequest(String),
    Internal(String),
    Store(StoreError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidToken => write!(f, "Invalid or expired link"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Store(err) => write!(f, "Store Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidToken => (StatusCode::NOT_FOUND, "Invalid or expired link".to_string()),
            AppError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(err))
    }
}

/// Failure of the token/record backend.
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {err}"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Failure of an outbound call (fulfillment service, notifier, shortener).
/// Always retryable from the worker's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalServiceError {
    Timeout,
    Transport(String),
    Status(u16),
    Malformed(String),
    Rejected(String),
}

impl std::fmt::Display for ExternalServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalServiceError::Timeout => write!(f, "request timed out"),
            ExternalServiceError::Transport(msg) => write!(f, "request failed: {msg}"),
            ExternalServiceError::Status(code) => write!(f, "unexpected status {code}"),
            ExternalServiceError::Malformed(msg) => write!(f, "malformed response: {msg}"),
            ExternalServiceError::Rejected(msg) => write!(f, "rejected: {msg}"),
        }
    }
}

impl std::error::Error for ExternalServiceError {}

impl From<reqwest::Error> for ExternalServiceError {
    /// The request URL is stripped: Telegram URLs embed the bot token.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            ExternalServiceError::Timeout
        } else if err.is_decode() {
            ExternalServiceError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            ExternalServiceError::Status(status.as_u16())
        } else {
            ExternalServiceError::Transport(err.to_string())
        }
    }
}
