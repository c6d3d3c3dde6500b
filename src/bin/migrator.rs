use anyhow::Result;
use msgproc_config::Config;
use tracing::info;

/// Applies the embedded schema migrations and exits
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    msgproc::init_tracing(&config.logging);

    info!("Connecting to database at: {}", config.database_url_safe());
    let pool = msgproc_db::create_pool(&config.database_url, &config.db).await?;

    msgproc_db::run_migrations(&pool).await?;
    pool.close().await;

    info!("Migrations complete");
    Ok(())
}
