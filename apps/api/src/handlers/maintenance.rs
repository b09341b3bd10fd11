use axum::Json;
use axum::extract::State;
use tutela_core::SubjectId;

use crate::dto::{
    CleanupOrphansRequest, DuplicateRepairResponse, OrphanReportResponse,
    ReconcileDuplicatesRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_optional_id;

pub async fn reconcile_duplicates_handler(
    State(state): State<AppState>,
    Json(payload): Json<ReconcileDuplicatesRequest>,
) -> ApiResult<Json<DuplicateRepairResponse>> {
    let subject_id = parse_optional_id::<SubjectId>(payload.subject_id.as_deref())?;
    let summary = state.sync_service.reconcile_duplicates(subject_id).await?;

    Ok(Json(summary.into()))
}

pub async fn cleanup_orphans_handler(
    State(state): State<AppState>,
    Json(payload): Json<CleanupOrphansRequest>,
) -> ApiResult<Json<OrphanReportResponse>> {
    let subject_id = parse_optional_id::<SubjectId>(payload.subject_id.as_deref())?;
    let report = state
        .sync_service
        .cleanup_orphans(subject_id, payload.mode())
        .await?;

    Ok(Json(report.into()))
}
