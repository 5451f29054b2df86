//! Skillpass API server entry point.

use std::sync::Arc;

use skillpass_api::config::AppConfig;
use skillpass_api::error::AppError;
use skillpass_api::routes;
use skillpass_api::state::AppState;
use skillpass_api::telemetry;
use skillpass_catalog::ModuleCatalog;
use skillpass_core::clock::SystemClock;
use skillpass_event_store::pg_audit_log::PgAuditLog;
use skillpass_event_store::pg_completion_store::PgCompletionStore;
use skillpass_event_store::pg_event_repository::PgEventRepository;
use skillpass_training::application::narration::TracingNarrator;
use skillpass_training::application::outbox::{OutboxSinks, ProgressOutbox};
use skillpass_training::application::session::TrainingServices;
use skillpass_training::application::variations::AuthoredVariationGenerator;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Skillpass API server");

    let catalog = match &config.catalog_path {
        Some(path) => ModuleCatalog::from_path(path)?,
        None => ModuleCatalog::builtin()?,
    };
    tracing::info!(
        modules = catalog.len(),
        version = catalog.version_hash(),
        "module catalog loaded"
    );

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let event_repository = Arc::new(PgEventRepository::new(pool.clone()));
    let completions = Arc::new(PgCompletionStore::new(pool.clone()));
    let outbox = ProgressOutbox::spawn(
        OutboxSinks {
            events: event_repository.clone(),
            completions: completions.clone(),
            audit: Arc::new(PgAuditLog::new(pool)),
        },
        config.persist_policy,
    );
    let services = TrainingServices {
        catalog: Arc::new(catalog),
        retake_lookup: completions,
        variations: Arc::new(AuthoredVariationGenerator),
        narrator: Arc::new(TracingNarrator),
        outbox: outbox.clone(),
        clock: Arc::new(SystemClock),
    };
    let app_state = AppState::new(services, event_repository);
    let sweeper = app_state
        .sessions
        .spawn_idle_sweeper(config.session_idle_timeout);

    // TODO: Replace CorsLayer::permissive() with the UI shell's origin once it has a fixed host.
    let app = routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Flushing queued progress before exit");
    outbox.drain().await;
    let stats = outbox.stats();
    tracing::info!(
        delivered = stats.delivered,
        failed = stats.failed,
        held = stats.held,
        "persistence queue drained"
    );
    telemetry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
