pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod fulfillment;
pub mod issuance;
pub mod models;
pub mod notify;
pub mod routes;
pub mod shortener;
pub mod state;
pub mod store;
pub mod telegram;
pub mod token;
pub mod verification;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::fulfillment::HttpFulfillment;
use crate::notify::TelegramNotifier;
use crate::shortener::Shortener;
use crate::state::{AppState, SharedState};
use crate::store::Store;
use crate::telegram::TelegramClient;

/// Wire the production collaborators around a store.
pub fn build_state(
    config: Config,
    store: Arc<dyn Store>,
    telegram: Arc<TelegramClient>,
) -> Result<SharedState, String> {
    let fulfillment = HttpFulfillment::new(&config.fulfillment_url, config.http_timeout)?;
    let shortener = Shortener::new(config.shortener.clone(), config.http_timeout)?;

    if config.allowed_requesters.is_empty() {
        tracing::warn!("VERILINK_ALLOWED_REQUESTERS is empty; every /like request will be refused");
    }

    Ok(Arc::new(AppState {
        config,
        store,
        fulfillment: Arc::new(fulfillment),
        notifier: Arc::new(TelegramNotifier::new(telegram)),
        shortener,
    }))
}

pub fn build_app(state: SharedState) -> Router {
    let headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store"),
        ));

    routes::public_routes()
        .layer(headers)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
