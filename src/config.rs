use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub telegram: TelegramConfig,
    pub allowed_requesters: Vec<i64>,
    pub fulfillment_url: String,
    pub shortener: Option<ShortenerConfig>,
    pub scan_interval: Duration,
    pub scan_batch: i64,
    pub token_ttl: Duration,
    pub claim_lease: Duration,
    pub http_timeout: Duration,
    pub poll_commands: bool,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct ShortenerConfig {
    pub api_url: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let store = match env_or("VERILINK_STORE", "postgres").as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: env_required("DATABASE_URL")?,
            },
            other => return Err(format!("Invalid VERILINK_STORE: {other}")),
        };

        let bot_token = env_required("BOT_TOKEN")?;
        let fulfillment_url = env_required("VERILINK_FULFILLMENT_URL")?;
        if !fulfillment_url.contains("{target}") {
            return Err("VERILINK_FULFILLMENT_URL must contain a {target} placeholder".to_string());
        }

        let host: IpAddr = env_or("VERILINK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid VERILINK_HOST: {e}"))?;

        let port: u16 = env_or("VERILINK_PORT", "8080")
            .parse()
            .map_err(|e| format!("Invalid VERILINK_PORT: {e}"))?;

        let base_url = env_or("VERILINK_BASE_URL", &format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let allowed_requesters: Vec<i64> = env_or("VERILINK_ALLOWED_REQUESTERS", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim().parse().map_err(|e| {
                    format!("Invalid VERILINK_ALLOWED_REQUESTERS entry '{s}': {e}")
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let shortener = match (
            std::env::var("VERILINK_SHORTENER_URL").ok(),
            std::env::var("VERILINK_SHORTENER_KEY").ok(),
        ) {
            (Some(api_url), Some(api_key)) => Some(ShortenerConfig { api_url, api_key }),
            _ => None,
        };

        let poll_commands = match env_or("VERILINK_POLL_COMMANDS", "true").as_str() {
            "false" | "0" | "no" => false,
            _ => true,
        };

        let config = Config {
            store,
            host,
            port,
            base_url,
            telegram: TelegramConfig {
                bot_token,
                api_url: env_or("VERILINK_TELEGRAM_API_URL", "https://api.telegram.org"),
            },
            allowed_requesters,
            fulfillment_url,
            shortener,
            scan_interval: env_secs("VERILINK_SCAN_INTERVAL_SECS", 60)?,
            scan_batch: env_or("VERILINK_SCAN_BATCH", "100")
                .parse()
                .map_err(|e| format!("Invalid VERILINK_SCAN_BATCH: {e}"))?,
            token_ttl: env_secs("VERILINK_TOKEN_TTL_SECS", 600)?,
            claim_lease: env_secs("VERILINK_CLAIM_LEASE_SECS", 300)?,
            http_timeout: env_secs("VERILINK_HTTP_TIMEOUT_SECS", 30)?,
            poll_commands,
            log_level: env_or("VERILINK_LOG_LEVEL", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the worker cannot run safely with. A claim must outlive
    /// the fulfillment call and the notification that follows it.
    pub fn validate(&self) -> Result<(), String> {
        if self.scan_batch < 1 {
            return Err(format!(
                "VERILINK_SCAN_BATCH must be at least 1, got {}",
                self.scan_batch
            ));
        }
        if self.claim_lease <= self.http_timeout * 2 {
            return Err(format!(
                "VERILINK_CLAIM_LEASE_SECS ({}s) must be longer than twice VERILINK_HTTP_TIMEOUT_SECS ({}s)",
                self.claim_lease.as_secs(),
                self.http_timeout.as_secs()
            ));
        }
        Ok(())
    }

    pub fn is_allowed(&self, requester_id: i64) -> bool {
        self.allowed_requesters.contains(&requester_id)
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Result<Duration, String> {
    env_or(key, &default.to_string())
        .parse()
        .map(Duration::from_secs)
        .map_err(|e| format!("Invalid {key}: {e}"))
}
