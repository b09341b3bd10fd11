use sqlx::PgPool;
use tutela_application::AssignmentSyncService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sync_service: AssignmentSyncService,
    pub shared_secret: String,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
}
