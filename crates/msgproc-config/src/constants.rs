// ============================================================================
// Configuration Constants
// ============================================================================

// HTTP server
pub(crate) const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub(crate) const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 5;
pub(crate) const DEFAULT_HTTP_DRAIN_TIMEOUT_SECS: u64 = 5;

// Consumer task gets its own window to leave the group after shutdown
pub(crate) const DEFAULT_CONSUMER_SHUTDOWN_GRACE_SECS: u64 = 30;

// PostgreSQL connection parts (used when DATABASE_URL is not set)
pub(crate) const DEFAULT_POSTGRES_HOST: &str = "localhost";
pub(crate) const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub(crate) const DEFAULT_POSTGRES_DB: &str = "msgproc";
pub(crate) const DEFAULT_POSTGRES_USER: &str = "msgproc";
pub(crate) const DEFAULT_POSTGRES_PASSWORD: &str = "msgproc";

// Message size limits (in bytes)
pub const MAX_CONTENT_SIZE: usize = 64 * 1024; // 64 KB - single message content
pub const MAX_REQUEST_BODY_SIZE: usize = 256 * 1024; // 256 KB - HTTP API requests
