use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

#[cfg(test)]
mod tests;

pub fn build_router(app_state: AppState) -> Router {
    let subject_routes = Router::new()
        .route(
            "/api/subjects/{subject_id}/sync",
            post(handlers::subjects::sync_subject_handler),
        )
        .route(
            "/api/subjects/{subject_id}/role",
            put(handlers::subjects::change_role_handler),
        )
        .route(
            "/api/subjects/{subject_id}/training",
            get(handlers::subjects::training_status_handler),
        )
        .route(
            "/api/subjects/{subject_id}/completions",
            post(handlers::subjects::complete_assignment_handler),
        )
        .route(
            "/api/subjects/{subject_id}/change-log",
            get(handlers::subjects::change_log_handler),
        );

    let bulk_routes = Router::new()
        .route(
            "/api/departments/{department_id}/sync",
            post(handlers::bulk::sync_department_handler),
        )
        .route(
            "/api/groups/{group_id}/sync",
            post(handlers::bulk::sync_group_handler),
        );

    let maintenance_routes = Router::new()
        .route(
            "/api/maintenance/duplicates",
            post(handlers::maintenance::reconcile_duplicates_handler),
        )
        .route(
            "/api/maintenance/orphans",
            post(handlers::maintenance::cleanup_orphans_handler),
        );

    let protected_routes = Router::new()
        .merge(subject_routes)
        .merge(bulk_routes)
        .merge(maintenance_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_service_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
