// ============================================================================
// msgproc Config - Centralized configuration management
// ============================================================================
//
// Configuration for the msgproc server, consumer and migrator.
// Loaded from environment variables (and an optional .env file) with
// sensible defaults for local development.
//
// ============================================================================

mod constants;
mod database;
mod http;
mod kafka;
mod logging;

pub use constants::{MAX_CONTENT_SIZE, MAX_REQUEST_BODY_SIZE};
pub use database::DbConfig;
pub use http::{HttpConfig, ShutdownConfig};
pub use kafka::KafkaConfig;
pub use logging::{AppEnv, LoggingConfig};

use anyhow::Result;

/// Main configuration structure for msgproc
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,

    // Sub-configurations
    pub logging: LoggingConfig,
    pub db: DbConfig,
    pub http: HttpConfig,
    pub kafka: KafkaConfig,
    pub shutdown: ShutdownConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: database::database_url_from_env(),
            logging: LoggingConfig::from_env()?,
            db: DbConfig::from_env(),
            http: HttpConfig::from_env(),
            kafka: KafkaConfig::from_env(),
            shutdown: ShutdownConfig::from_env(),
        })
    }

    /// Database URL with the password masked, safe for logs
    pub fn database_url_safe(&self) -> String {
        mask_credentials(&self.database_url)
    }
}

fn mask_credentials(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        let protocol_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if protocol_end <= at_pos {
            return format!("{}***{}", &url[..protocol_end], &url[at_pos..]);
        }
    }
    url.to_string()
}
