use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use tutela_application::{AssignmentSyncService, SubjectLeaseCoordinator};
use tutela_infrastructure::{
    PostgresAssignmentRepository, PostgresCatalogRepository, PostgresChangeLogRepository,
    PostgresCompletionRepository, PostgresIdentityRepository, PostgresSubjectLeaseCoordinator,
    RedisSubjectLeaseCoordinator,
};

use crate::api_config::ApiConfig;
use crate::state::AppState;

const LEASE_KEY_PREFIX: &str = "tutela:subject_lease";

pub fn build_app_state(
    config: &ApiConfig,
    pool: PgPool,
    redis_client: Option<redis::Client>,
) -> AppState {
    let sync_service = AssignmentSyncService::new(
        Arc::new(PostgresIdentityRepository::new(pool.clone())),
        Arc::new(PostgresCatalogRepository::new(pool.clone())),
        Arc::new(PostgresAssignmentRepository::new(pool.clone())),
        Arc::new(PostgresCompletionRepository::new(pool.clone())),
        Arc::new(PostgresChangeLogRepository::new(pool.clone())),
        config.sync_settings.clone(),
    );

    let lease_coordinator: Arc<dyn SubjectLeaseCoordinator> = match redis_client.clone() {
        Some(client) => {
            info!(holder_id = %config.lease_holder_id, "subject leases held in redis");
            Arc::new(RedisSubjectLeaseCoordinator::new(client, LEASE_KEY_PREFIX))
        }
        None => {
            info!(
                holder_id = %config.lease_holder_id,
                "subject leases held as postgres advisory locks"
            );
            Arc::new(PostgresSubjectLeaseCoordinator::new(pool.clone()))
        }
    };
    let sync_service = sync_service
        .with_lease_coordinator(lease_coordinator, config.lease_holder_id.clone());

    AppState {
        sync_service,
        shared_secret: config.shared_secret.clone(),
        postgres_pool: Some(pool),
        redis_client,
    }
}
