//! Tutela API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use tracing::info;
use tutela_core::AppError;
use tutela_infrastructure::PostgresSubjectLeaseCoordinator;

use crate::api_config::ApiConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;
    let pool_size = PostgresSubjectLeaseCoordinator::pool_size_for(
        config.sync_settings.max_concurrency,
    )
    .max(10);
    let pool = api_services::connect_and_migrate(&config.database_url, pool_size).await?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let redis_client = config
        .redis_url
        .as_deref()
        .map(api_services::build_redis_client)
        .transpose()?;

    let app_state = api_services::build_app_state(&config, pool, redis_client);
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tutela-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
