// ============================================================================
// Logging Configuration
// ============================================================================

use std::str::FromStr;

/// Deployment environment, selects log verbosity and output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    Local,
    Dev,
    Prod,
}

impl AppEnv {
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            AppEnv::Local | AppEnv::Dev => "debug",
            AppEnv::Prod => "info",
        }
    }

    /// Production logs are emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        matches!(self, AppEnv::Prod)
    }
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AppEnv::Local),
            "dev" | "development" => Ok(AppEnv::Dev),
            "prod" | "production" => Ok(AppEnv::Prod),
            other => anyhow::bail!("unknown APP_ENV '{}' (expected local, dev or prod)", other),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub env: AppEnv,
    /// EnvFilter directive, e.g. "info,msgproc=debug"
    pub rust_log: String,
}

impl LoggingConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let env: AppEnv = std::env::var("APP_ENV")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;

        Ok(Self {
            env,
            rust_log: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| env.default_log_filter().to_string()),
        })
    }
}
