// ============================================================================
// Database Configuration
// ============================================================================

use crate::constants::{
    DEFAULT_POSTGRES_DB, DEFAULT_POSTGRES_HOST, DEFAULT_POSTGRES_PASSWORD, DEFAULT_POSTGRES_PORT,
    DEFAULT_POSTGRES_USER,
};

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
    /// Timeout for idle connections before they are closed (seconds)
    pub idle_timeout_secs: u64,
    /// Apply embedded migrations before serving traffic
    pub run_migrations: bool,
}

impl DbConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            run_migrations: std::env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }
}

/// Resolve the PostgreSQL connection string.
///
/// `DATABASE_URL` wins; otherwise the URL is assembled from the individual
/// `POSTGRES_*` variables.
pub(crate) fn database_url_from_env() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }

    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| DEFAULT_POSTGRES_USER.into());
    let password =
        std::env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| DEFAULT_POSTGRES_PASSWORD.into());
    let host = std::env::var("POSTGRES_HOST").unwrap_or_else(|_| DEFAULT_POSTGRES_HOST.into());
    let port = std::env::var("POSTGRES_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_POSTGRES_PORT);
    let database = std::env::var("POSTGRES_DB").unwrap_or_else(|_| DEFAULT_POSTGRES_DB.into());

    build_database_url(&user, &password, &host, port, &database)
}

pub(crate) fn build_database_url(
    user: &str,
    password: &str,
    host: &str,
    port: u16,
    database: &str,
) -> String {
    format!("postgres://{user}:{password}@{host}:{port}/{database}?sslmode=disable")
}
