//! IIDP assessment server.
mod error;
mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use iidp_config::AppConfig;
use iidp_core::ports::SystemClock;
use iidp_core::{AssessmentEngine, TopicWeightTable};
use iidp_storage::{create_pool, run_migrations, PostgresRepository};

pub struct AppState {
    pub pool: PgPool,
    pub engine: AssessmentEngine<PostgresRepository, SystemClock>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting IIDP assessment server...");

    let config = AppConfig::from_env()?;
    tracing::info!("Binding to {}", config.bind_address);

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let repository = PostgresRepository::new(pool.clone());
    let engine = AssessmentEngine::new(
        repository,
        SystemClock,
        TopicWeightTable::jee_seed(),
        config.engine_config(),
    );

    let state = Arc::new(AppState { pool, engine });

    let app = Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/ready", get(handlers::ready))
        .route("/v1/assessment", post(handlers::start_assessment))
        .route("/v1/response", post(handlers::submit_response))
        .route("/v1/quiz", post(handlers::next_quiz))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Server listening on {}", config.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
