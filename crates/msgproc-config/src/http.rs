// ============================================================================
// HTTP Server & Shutdown Configuration
// ============================================================================

use std::time::Duration;

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CONSUMER_SHUTDOWN_GRACE_SECS, DEFAULT_HTTP_DRAIN_TIMEOUT_SECS,
    DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
};

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub bind_address: String,
    /// Deadline for read endpoints; ingest is bounded by the producer
    pub request_timeout_secs: u64,
    /// How long in-flight requests may run after shutdown is signalled
    pub drain_timeout_secs: u64,
}

impl HttpConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            request_timeout_secs: std::env::var("HTTP_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
            drain_timeout_secs: std::env::var("HTTP_DRAIN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_DRAIN_TIMEOUT_SECS),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownConfig {
    /// Grace period for the consumer task to leave its group
    pub consumer_grace_secs: u64,
}

impl ShutdownConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            consumer_grace_secs: std::env::var("CONSUMER_SHUTDOWN_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONSUMER_SHUTDOWN_GRACE_SECS),
        }
    }

    pub fn consumer_grace(&self) -> Duration {
        Duration::from_secs(self.consumer_grace_secs)
    }
}
