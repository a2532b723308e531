pub mod verify;

use axum::Router;
use axum::routing::get;

use crate::state::SharedState;

pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/verify/{token}", get(verify::verify))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
