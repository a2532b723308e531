#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use reqwest::{Client, StatusCode};

use verilink::config::{Config, StoreBackend, TelegramConfig};
use verilink::error::ExternalServiceError;
use verilink::fulfillment::FulfillmentService;
use verilink::models::FulfillmentResult;
use verilink::notify::Notifier;
use verilink::shortener::Shortener;
use verilink::state::{AppState, SharedState};
use verilink::store::MemoryStore;

pub const REQUESTER: i64 = 42;
pub const OUTSIDER: i64 = 7;

/// A running test server backed by an in-memory store and fake collaborators.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub store: Arc<MemoryStore>,
    pub fulfillment: Arc<FakeFulfillment>,
    pub notifier: Arc<FakeNotifier>,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET a verification link, return (status, body text).
    pub async fn open_link(&self, url: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .expect("verify request failed");
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        (status, body)
    }
}

pub fn ace() -> FulfillmentResult {
    FulfillmentResult {
        name: "Ace".to_string(),
        level: 30,
        likes_before: 100,
        likes_added: 5,
        likes_after: 105,
        processed_at: "T".to_string(),
    }
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        store: StoreBackend::Memory,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: base_url.to_string(),
        telegram: TelegramConfig {
            bot_token: "test-bot-token".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
        },
        allowed_requesters: vec![REQUESTER],
        fulfillment_url: "http://127.0.0.1:9/like?uid={target}".to_string(),
        shortener: None,
        scan_interval: Duration::from_secs(60),
        scan_batch: 100,
        token_ttl: Duration::from_secs(600),
        claim_lease: Duration::from_secs(60),
        http_timeout: Duration::from_millis(300),
        poll_commands: false,
        log_level: "warn".to_string(),
    }
}

pub enum Behavior {
    Succeed(FulfillmentResult),
    Fail(ExternalServiceError),
    /// Respond after the given delay.
    Delay(Duration, FulfillmentResult),
}

pub struct FakeFulfillment {
    pub calls: AtomicUsize,
    pub targets: Mutex<Vec<String>>,
    behavior: Mutex<Behavior>,
    failing_targets: Mutex<Vec<(String, ExternalServiceError)>>,
}

impl FakeFulfillment {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
            behavior: Mutex::new(behavior),
            failing_targets: Mutex::new(Vec::new()),
        }
    }

    /// Fail calls for one target regardless of the general behavior.
    pub fn fail_target(&self, target_id: &str, error: ExternalServiceError) {
        self.failing_targets
            .lock()
            .unwrap()
            .push((target_id.to_string(), error));
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FulfillmentService for FakeFulfillment {
    async fn fulfill(&self, target_id: &str) -> Result<FulfillmentResult, ExternalServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target_id.to_string());

        let forced = self
            .failing_targets
            .lock()
            .unwrap()
            .iter()
            .find(|(target, _)| target == target_id)
            .map(|(_, e)| e.clone());
        if let Some(e) = forced {
            return Err(e);
        }

        let planned = match &*self.behavior.lock().unwrap() {
            Behavior::Succeed(result) => Ok((None, result.clone())),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Delay(delay, result) => Ok((Some(*delay), result.clone())),
        };

        let (delay, result) = planned?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(result)
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub failing: AtomicBool,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, requester_id: i64, text: &str) -> Result<(), ExternalServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExternalServiceError::Transport("recipient unreachable".to_string()));
        }
        self.sent.lock().unwrap().push((requester_id, text.to_string()));
        Ok(())
    }
}

/// Spawn the app on a random port with a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Behavior::Succeed(ace())).await
}

pub async fn spawn_app_with(behavior: Behavior) -> TestApp {
    spawn_app_configured(behavior, |_| {}).await
}

/// Like `spawn_app_with`, adjusting the test config before the state is built.
pub async fn spawn_app_configured(
    behavior: Behavior,
    configure: impl FnOnce(&mut Config),
) -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(MemoryStore::new());
    let fulfillment = Arc::new(FakeFulfillment::new(behavior));
    let notifier = Arc::new(FakeNotifier::default());

    let mut config = test_config(&format!("http://{addr}"));
    configure(&mut config);
    let shortener = Shortener::new(None, config.http_timeout).unwrap();

    let state: SharedState = Arc::new(AppState {
        config,
        store: store.clone(),
        fulfillment: fulfillment.clone(),
        notifier: notifier.clone(),
        shortener,
    });

    let app = verilink::build_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        state,
        store,
        fulfillment,
        notifier,
        client: Client::new(),
    }
}

/// Serve a fake external API on a random port, return its base URL.
pub async fn serve_fake(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake service");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Fake service failed");
    });
    format!("http://{addr}")
}
