//! Configuration module
//!
//! Process-wide settings loaded once from the environment (and an optional
//! `.env` file) at startup. The configuration is read-only afterwards.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const SERVER_PORT: u16 = 3000;
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: u64 = 50;
const LOCAL_STORAGE_PATH: &str = "./data/media";
const MIN_LATENCY_MS: u64 = 200;
const MAX_LATENCY_MS: u64 = 1500;
const STAGE_TIMEOUT_SECS: u64 = 30;
const REAP_INTERVAL_SECS: u64 = 60;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const JWT_SECRET_MIN_LEN: usize = 32;

/// Terms that mark an asset's text as suspicious unless overridden by
/// `MODERATION_DENYLIST`.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "violence", "gore", "explicit", "nsfw", "nudity", "weapon", "drugs", "hate", "abuse",
    "terror",
];

/// Tuning for the moderation pipeline.
#[derive(Clone, Debug)]
pub struct ModerationSettings {
    /// Lower bound of the simulated analyzer latency
    pub min_latency_ms: u64,
    /// Upper bound of the simulated analyzer latency
    pub max_latency_ms: u64,
    pub stage_timeout_secs: u64,
    /// Seconds between sweeps for `processing` assets with no live run. 0 disables.
    pub reap_interval_secs: u64,
    /// Lowercased denylist used by the context analyzer
    pub denylist: Vec<String>,
}

impl ModerationSettings {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// `None` when the sweep is disabled.
    pub fn reap_interval(&self) -> Option<Duration> {
        (self.reap_interval_secs > 0).then(|| Duration::from_secs(self.reap_interval_secs))
    }

    pub fn latency_range_ms(&self) -> (u64, u64) {
        (self.min_latency_ms, self.max_latency_ms)
    }
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            min_latency_ms: MIN_LATENCY_MS,
            max_latency_ms: MAX_LATENCY_MS,
            stage_timeout_secs: STAGE_TIMEOUT_SECS,
            reap_interval_secs: REAP_INTERVAL_SECS,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    /// PostgreSQL connection string. The in-memory repository is used when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub local_storage_path: String,
    pub max_upload_size_bytes: u64,
    /// Reject uploads and content replacements with 503
    pub maintenance_mode: bool,
    pub viewer_sees_own_uploads: bool,
    pub event_channel_capacity: usize,
    pub moderation: ModerationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            jwt_secret: String::new(),
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECS,
            local_storage_path: LOCAL_STORAGE_PATH.to_string(),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            maintenance_mode: false,
            viewer_sees_own_uploads: false,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            moderation: ModerationSettings::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let max_upload_size_mb = env_parse("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB);

        let denylist = env::var("MODERATION_DENYLIST")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|_| DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect());

        let moderation = ModerationSettings {
            min_latency_ms: env_parse("MODERATION_MIN_LATENCY_MS", MIN_LATENCY_MS),
            max_latency_ms: env_parse("MODERATION_MAX_LATENCY_MS", MAX_LATENCY_MS),
            stage_timeout_secs: env_parse("MODERATION_STAGE_TIMEOUT_SECS", STAGE_TIMEOUT_SECS),
            reap_interval_secs: env_parse("MODERATION_REAP_INTERVAL_SECS", REAP_INTERVAL_SECS),
            denylist,
        };

        Ok(Self {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(SERVER_PORT),
            environment,
            cors_origins,
            jwt_secret,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            maintenance_mode: env_flag("MAINTENANCE_MODE"),
            viewer_sees_own_uploads: env_flag("VIEWER_SEES_OWN_UPLOADS"),
            event_channel_capacity: env_parse("EVENT_CHANNEL_CAPACITY", EVENT_CHANNEL_CAPACITY),
            moderation,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < JWT_SECRET_MIN_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                JWT_SECRET_MIN_LEN
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than zero"));
        }

        if self.moderation.min_latency_ms > self.moderation.max_latency_ms {
            return Err(anyhow::anyhow!(
                "MODERATION_MIN_LATENCY_MS must not exceed MODERATION_MAX_LATENCY_MS"
            ));
        }

        if self.moderation.stage_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "MODERATION_STAGE_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.event_channel_capacity == 0 {
            return Err(anyhow::anyhow!("EVENT_CHANNEL_CAPACITY must be greater than zero"));
        }

        Ok(())
    }
}
