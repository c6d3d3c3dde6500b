use anyhow::Result;
use msgproc_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    msgproc::init_tracing(&config.logging);

    msgproc::run(config).await
}
