mod common;

use chrono::{Duration, Utc};
use futures_util::future::join_all;
use reqwest::StatusCode;

use verilink::error::AppError;
use verilink::issuance;
use verilink::models::NewToken;
use verilink::routes::verify::SUCCESS_MESSAGE;
use verilink::store::Store;
use verilink::token;

use common::{OUTSIDER, REQUESTER};

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

// ── Issuance ────────────────────────────────────────────────────

#[tokio::test]
async fn issue_builds_link_under_base_url() {
    let app = common::spawn_app().await;

    let issued = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();
    assert_eq!(issued.verify_url, app.url(&format!("/verify/{}", issued.token)));
    // Shortener disabled: the long link is handed out as-is.
    assert_eq!(issued.link, issued.verify_url);
    assert!(issued.expires_at > Utc::now());
    assert_eq!(app.store.token_count(), 1);
}

#[tokio::test]
async fn issue_refuses_caller_outside_allow_list() {
    let app = common::spawn_app().await;

    let err = issuance::issue(&app.state, OUTSIDER, "U1").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(app.store.token_count(), 0);
}

#[tokio::test]
async fn issue_rejects_malformed_target() {
    let app = common::spawn_app().await;

    let long = "x".repeat(65);
    for target in ["", "   ", "a b", long.as_str()] {
        let err = issuance::issue(&app.state, REQUESTER, target).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "target {target:?}");
    }
    assert_eq!(app.store.token_count(), 0);
}

#[tokio::test]
async fn each_issue_creates_a_distinct_token() {
    let app = common::spawn_app().await;

    let a = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();
    let b = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();
    assert_ne!(a.token, b.token);
    assert_eq!(app.store.token_count(), 2);
}

// ── Redemption ──────────────────────────────────────────────────

#[tokio::test]
async fn redeem_marks_record_verified() {
    let app = common::spawn_app().await;
    let issued = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();

    let (status, body) = app.open_link(&issued.verify_url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, SUCCESS_MESSAGE);

    let record = app.store.find_record(REQUESTER, "U1").await.unwrap().unwrap();
    assert!(record.verified);
    assert!(!record.fulfilled);
    assert!(record.verified_at.is_some());
}

#[tokio::test]
async fn redeem_twice_is_invalid_and_leaves_record_unchanged() {
    let app = common::spawn_app().await;
    let issued = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();

    let (status, _) = app.open_link(&issued.verify_url).await;
    assert_eq!(status, StatusCode::OK);
    let before = app.store.find_record(REQUESTER, "U1").await.unwrap().unwrap();

    let (status, body) = app.open_link(&issued.verify_url).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Invalid or expired link");

    let after = app.store.find_record(REQUESTER, "U1").await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.verified_at, before.verified_at);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(!after.fulfilled);
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let app = common::spawn_app().await;

    let (status, body) = app.open_link(&app.url(&format!("/verify/{}", token::generate()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Invalid or expired link");
    assert!(app.store.find_record(REQUESTER, "U1").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_token_is_invalid() {
    let app = common::spawn_app().await;
    let raw = token::generate();
    app.store
        .insert_token(NewToken {
            token_hash: token::hash(&raw),
            requester_id: REQUESTER,
            target_id: "U1".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        })
        .await
        .unwrap();

    let (status, _) = app.open_link(&app.url(&format!("/verify/{raw}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.find_record(REQUESTER, "U1").await.unwrap().is_none());

    assert_eq!(app.store.purge_expired_tokens().await.unwrap(), 1);
    assert_eq!(app.store.token_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_have_exactly_one_winner() {
    let app = common::spawn_app().await;
    let issued = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();

    let attempts = (0..16).map(|_| app.open_link(&issued.verify_url));
    let results = join_all(attempts).await;

    let winners = results.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    let losers = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::NOT_FOUND)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 15);
}

#[tokio::test]
async fn separate_targets_get_separate_records() {
    let app = common::spawn_app().await;
    let first = issuance::issue(&app.state, REQUESTER, "U1").await.unwrap();
    let second = issuance::issue(&app.state, REQUESTER, "U2").await.unwrap();

    app.open_link(&first.verify_url).await;
    app.open_link(&second.verify_url).await;

    let one = app.store.find_record(REQUESTER, "U1").await.unwrap().unwrap();
    let two = app.store.find_record(REQUESTER, "U2").await.unwrap().unwrap();
    assert_ne!(one.id, two.id);
    assert!(one.verified && two.verified);
}

#[tokio::test]
async fn security_headers_are_set() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["cache-control"], "no-store");
}
