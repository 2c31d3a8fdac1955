//! Libris Server - library lending lifecycle engine
//!
//! REST API over the catalog, loans, reservations and fines.

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libris_server::{
    api,
    clock::{Clock, SystemClock},
    config::{AppConfig, StorageBackend},
    repository::{MemoryRepository, PgRepository, Repository},
    services::{sweep, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", config.logging.level).into());
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let json = config.logging.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(writer.clone())))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(writer)))
        .init();

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    let repository: Arc<dyn Repository> = match config.database.backend {
        StorageBackend::Postgres => {
            let repository = PgRepository::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            repository.migrate().await.context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");
            Arc::new(repository)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = Services::new(repository.clone(), clock.clone(), config.lending.clone());

    let _sweeper = sweep::spawn(
        services.lending.clone(),
        clock.clone(),
        config.lending.sweep_interval_secs,
    );

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        repository,
        clock,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api::router(state))
        .merge(api::openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
