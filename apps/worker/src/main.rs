//! Tutela scheduled maintenance worker.

#![forbid(unsafe_code)]

mod maintenance_pass;
mod worker_config;

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tutela_application::{AssignmentSyncService, IdentityRepository, SubjectLeaseCoordinator};
use tutela_core::{AppError, AppResult};
use tutela_infrastructure::{
    PostgresAssignmentRepository, PostgresCatalogRepository, PostgresChangeLogRepository,
    PostgresCompletionRepository, PostgresIdentityRepository, PostgresSubjectLeaseCoordinator,
    RedisSubjectLeaseCoordinator,
};

use crate::maintenance_pass::MaintenancePass;
use crate::worker_config::WorkerConfig;

const LEASE_KEY_PREFIX: &str = "tutela:subject_lease";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool_size = PostgresSubjectLeaseCoordinator::pool_size_for(
        config
            .max_concurrency
            .max(config.sync_settings.max_concurrency),
    );
    let pool = connect_pool(config.database_url.as_str(), pool_size).await?;
    let pass = build_maintenance_pass(&config, pool)?;

    info!(
        worker_id = %config.worker_id,
        interval_seconds = config.interval.as_secs(),
        max_concurrency = config.max_concurrency,
        orphan_mode = ?config.orphan_mode,
        run_once = config.run_once,
        "tutela-worker started"
    );

    if config.run_once {
        return pass.run().await.map(|_| ());
    }

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(error) = pass.run().await {
            warn!(
                worker_id = %config.worker_id,
                error = %error,
                "maintenance pass failed; retrying next interval"
            );
        }
    }
}

async fn connect_pool(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_maintenance_pass(config: &WorkerConfig, pool: PgPool) -> AppResult<MaintenancePass> {
    let identity: Arc<dyn IdentityRepository> =
        Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let engine = AssignmentSyncService::new(
        identity.clone(),
        Arc::new(PostgresCatalogRepository::new(pool.clone())),
        Arc::new(PostgresAssignmentRepository::new(pool.clone())),
        Arc::new(PostgresCompletionRepository::new(pool.clone())),
        Arc::new(PostgresChangeLogRepository::new(pool.clone())),
        config.sync_settings.clone(),
    );

    let lease_coordinator: Arc<dyn SubjectLeaseCoordinator> = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            Arc::new(RedisSubjectLeaseCoordinator::new(client, LEASE_KEY_PREFIX))
        }
        None => Arc::new(PostgresSubjectLeaseCoordinator::new(pool)),
    };
    let engine = engine.with_lease_coordinator(lease_coordinator, config.worker_id.clone());

    Ok(MaintenancePass::new(
        engine,
        identity,
        config.max_concurrency,
        config.orphan_mode,
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
