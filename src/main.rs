use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use verilink::config::{Config, StoreBackend};
use verilink::store::{MemoryStore, PgStore, Store};
use verilink::telegram::TelegramClient;
use verilink::{chat, worker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("Starting verilink");

    let store: Arc<dyn Store> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied");

            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; outstanding links are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let telegram = Arc::new(TelegramClient::new(&config.telegram, config.http_timeout)?);
    let poll_commands = config.poll_commands;
    let addr = SocketAddr::new(config.host, config.port);

    let state = verilink::build_state(config, store, telegram.clone())?;
    let app = verilink::build_app(state.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = worker::spawn(state.clone(), shutdown_rx.clone())?;
    let poller = poll_commands.then(|| {
        tokio::spawn(chat::run_poller(state.clone(), telegram, shutdown_rx.clone()))
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(poller) = poller {
        let _ = poller.await;
    }
    let _ = tokio::task::spawn_blocking(move || worker_handle.join()).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
