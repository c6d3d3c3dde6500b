//! # msgproc
//!
//! Message ingestion and relay service: an HTTP ingest path that persists a
//! message and publishes it to Kafka, and an in-process consumer that reads
//! it back and finalizes the stored row.

pub mod context;
pub mod ingest;
pub mod kafka;
pub mod processor;
pub mod routes;
pub mod stats;
pub mod worker;

use anyhow::{Context, Result};
use axum::Router;
use msgproc_config::{Config, LoggingConfig};
use msgproc_db::{MessageStore, PostgresMessageStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use context::AppContext;
use kafka::{EnvelopePublisher, MessageConsumer, MessageProducer};
use processor::MessageProcessor;

/// Install the global tracing subscriber: JSON lines in prod, plain text otherwise
pub fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(logging.rust_log.clone()));

    if logging.env.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, initiating graceful shutdown..."),
        _ = terminate => info!("SIGTERM received, initiating graceful shutdown..."),
    }
}

/// Time left to requests after `request_cancel` fires at the drain deadline
const REQUEST_ABORT_GRACE: Duration = Duration::from_secs(1);

/// Serve `app` until `shutdown` fires, then let in-flight requests drain.
///
/// New connections stop being accepted as soon as `shutdown` fires. Requests
/// still running after `drain` see `request_cancel` fire, and the server task
/// is aborted if they do not finish shortly after.
pub async fn serve_http(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    request_cancel: CancellationToken,
    drain: Duration,
) -> Result<()> {
    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    // Wait for shutdown, or for the server to stop on its own
    let early_exit = tokio::select! {
        _ = shutdown.cancelled() => None,
        result = &mut server => Some(result),
    };

    let result = match early_exit {
        Some(result) => Some(result),
        None => match tokio::time::timeout(drain, &mut server).await {
            Ok(result) => Some(result),
            Err(_) => {
                warn!(
                    drain_ms = drain.as_millis() as u64,
                    "HTTP drain timed out, abandoning in-flight publishes"
                );
                request_cancel.cancel();
                match tokio::time::timeout(REQUEST_ABORT_GRACE, &mut server).await {
                    Ok(result) => Some(result),
                    Err(_) => {
                        server.abort();
                        None
                    }
                }
            }
        },
    };
    request_cancel.cancel();

    match result {
        Some(Ok(Ok(()))) | None => Ok(()),
        Some(Ok(Err(e))) => Err(e).context("HTTP server failed"),
        Some(Err(e)) => Err(e).context("HTTP server task panicked"),
    }
}

/// Run the HTTP server and the consumer task until a shutdown signal arrives
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    info!("=== msgproc starting ===");
    info!("Environment: {:?}", config.logging.env);

    // Initialize database
    info!("Connecting to database at: {}", config.database_url_safe());
    let pool = msgproc_db::create_pool(&config.database_url, &config.db).await?;
    info!("Connected to database");

    if config.db.run_migrations {
        info!("Applying database migrations...");
        msgproc_db::run_migrations(&pool).await?;
    }

    let store: Arc<dyn MessageStore> = Arc::new(PostgresMessageStore::new(pool.clone()));

    // Initialize Kafka
    let producer = MessageProducer::new(&config.kafka).context("Failed to create Kafka producer")?;
    let consumer =
        MessageConsumer::new(&config.kafka).context("Failed to create Kafka consumer")?;

    let shutdown = CancellationToken::new();
    let request_cancel = CancellationToken::new();

    // Consumer task
    let consumer_handle = tokio::spawn(worker::run_consumer(
        consumer,
        MessageProcessor::new(store.clone()),
        Duration::from_millis(config.kafka.retry_backoff_ms),
        shutdown.clone(),
    ));

    // HTTP server
    let publisher: Arc<dyn EnvelopePublisher> = Arc::new(producer.clone());
    let app_context = Arc::new(AppContext::new(store, publisher, request_cancel.clone()));
    let app = routes::create_router(app_context, &config.http);

    let listener = TcpListener::bind(&config.http.bind_address)
        .await
        .context("Failed to bind to address")?;
    info!("msgproc listening on {}", config.http.bind_address);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal.cancel();
    });

    let server_result = serve_http(
        listener,
        app,
        shutdown.clone(),
        request_cancel,
        config.http.drain_timeout(),
    )
    .await;
    // The server may have stopped on its own
    shutdown.cancel();

    match tokio::time::timeout(config.shutdown.consumer_grace(), consumer_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "Consumer task failed"),
        Ok(Err(e)) => error!(error = %e, "Consumer task panicked"),
        Err(_) => warn!(
            timeout_secs = config.shutdown.consumer_grace_secs,
            "Consumer did not stop within grace period"
        ),
    }

    if let Err(e) = producer.flush(Duration::from_secs(5)) {
        warn!(error = %e, "Kafka producer flush incomplete");
    }
    pool.close().await;

    info!("=== msgproc stopped ===");

    server_result
}
