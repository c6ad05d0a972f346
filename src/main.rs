// region:    --- Imports
use axum::extract::DefaultBodyLimit;
use bet_dispatch::clock::SystemClock;
use bet_dispatch::config::AppConfig;
use bet_dispatch::engine::BiddingEngine;
use bet_dispatch::events::{EventPublisher, LogEventPublisher};
use bet_dispatch::handlers;
use bet_dispatch::message_broker::{KafkaEventPublisher, KafkaManager};
use bet_dispatch::scheduler::ExpirySweeper;
use bet_dispatch::store::{DatabaseManager, InMemoryJobStore, JobStore, PostgresJobStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over APP_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();

    // Store: Postgres when configured, otherwise process memory
    let store: Arc<dyn JobStore> = match &config.database {
        Some(database) => {
            let db_manager = Arc::new(
                DatabaseManager::connect(&database.url, database.max_connections).await?,
            );
            if let Err(e) = db_manager.initialize_database().await {
                error!("{:<12} --> database initialization failed: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> using Postgres store", "Main");
            Arc::new(PostgresJobStore::new(db_manager))
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL not set, jobs live in memory only",
                "Main"
            );
            Arc::new(InMemoryJobStore::new())
        }
    };

    // Events: Kafka when configured, otherwise log only
    let publisher: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => {
            let kafka_manager = KafkaManager::new(&kafka.brokers)?;
            kafka_manager.create_topic(&kafka.topic, 5, 1).await?;
            info!("{:<12} --> publishing events to {}", "Main", kafka.topic);
            Arc::new(KafkaEventPublisher::new(
                kafka_manager.get_producer(),
                kafka.topic.clone(),
            ))
        }
        None => Arc::new(LogEventPublisher),
    };

    let engine = Arc::new(BiddingEngine::new(
        store,
        publisher,
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    let sweeper = ExpirySweeper::new(Arc::clone(&engine), config.engine.sweep_interval);
    let _sweeper_handle = sweeper.start();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = handlers::router(engine)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
