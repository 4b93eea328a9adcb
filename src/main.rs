//! livesync host: runs the sync engine against in-memory collaborators.
//!
//! Loads configuration, initialises logging, signs a demo account in,
//! follows one watched collection, and shuts down on Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use livesync_core::config::EngineConfig;
use livesync_core::error::AppError;
use livesync_core::events::RawFeedEvent;
use livesync_core::types::{
    AccountId, AuthSession, DeviceDescriptor, EntitySchema, FeedDescriptor, Record, RecordFilter,
};
use livesync_realtime::SyncEngine;
use livesync_realtime::bridge::{MemoryAuth, MemoryChangeFeed, MemoryStore};
use livesync_realtime::notification::{DedupNotifier, TracingNotifier};

const DEMO_TABLE: &str = "transactions";
/// Identical notices inside this window are shown once.
const NOTICE_DEDUP_WINDOW: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<EngineConfig, AppError> {
    let env = std::env::var("LIVESYNC_ENV").unwrap_or_else(|_| "development".to_string());
    EngineConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &EngineConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main host run function
async fn run(config: EngineConfig) -> Result<(), AppError> {
    tracing::info!("Starting livesync host v{}", env!("CARGO_PKG_VERSION"));

    let feed = Arc::new(MemoryChangeFeed::new(config.feed.queue_buffer_size));
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(MemoryAuth::new(64));
    let notifier = Arc::new(DedupNotifier::new(
        Arc::new(TracingNotifier::new()),
        NOTICE_DEDUP_WINDOW,
    ));

    for n in 0..3 {
        store.insert_row(DEMO_TABLE, demo_row(n));
    }

    let capacity = config.feed.default_capacity;
    let engine = SyncEngine::new(config, feed.clone(), store, auth.clone(), notifier);
    engine.start().await?;

    auth.sign_in(AuthSession {
        account_id: AccountId::new(),
        device: DeviceDescriptor::new("host"),
    })
    .await;

    let descriptor = FeedDescriptor::new(
        EntitySchema::new(DEMO_TABLE).require("created_at"),
        capacity,
    )
    .with_filter(RecordFilter::eq("token", "USDC"));
    let handle = engine.subscribe(descriptor).await?;

    let mut collection = handle.watch_collection();
    let follower = tokio::spawn(async move {
        while collection.changed().await.is_ok() {
            let len = collection.borrow_and_update().len();
            tracing::info!(len, "Collection changed");
        }
    });

    let emitter_feed = feed.clone();
    let emitter = tokio::spawn(async move {
        let mut n = 3;
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        interval.tick().await;
        loop {
            interval.tick().await;
            emitter_feed
                .emit(DEMO_TABLE, RawFeedEvent::insert(demo_row(n)))
                .await;
            n += 1;
        }
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    emitter.abort();
    handle.unsubscribe().await;
    let _ = tokio::time::timeout(Duration::from_secs(5), follower).await;
    engine.shutdown().await?;

    tracing::info!(stats = ?handle.stats(), "livesync host shut down gracefully");
    Ok(())
}

fn demo_row(n: u64) -> Record {
    let token = if n % 2 == 0 { "USDC" } else { "ETH" };
    Record::new()
        .with("id", format!("tx-{n}"))
        .with("token", token)
        .with("amount", n * 10)
        .with("created_at", n)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
