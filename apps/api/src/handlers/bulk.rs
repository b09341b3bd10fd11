use axum::Json;
use axum::extract::{Path, State};
use tutela_core::{DepartmentId, GroupId};

use crate::dto::{BulkSyncRequest, BulkSyncResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

pub async fn sync_department_handler(
    State(state): State<AppState>,
    Path(department_id): Path<String>,
    Json(payload): Json<BulkSyncRequest>,
) -> ApiResult<Json<BulkSyncResponse>> {
    let department_id = parse_id::<DepartmentId>(&department_id)?;
    let summary = state
        .sync_service
        .sync_department(department_id, payload.mode())
        .await?;

    Ok(Json(summary.into()))
}

pub async fn sync_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(payload): Json<BulkSyncRequest>,
) -> ApiResult<Json<BulkSyncResponse>> {
    let group_id = parse_id::<GroupId>(&group_id)?;
    let summary = state
        .sync_service
        .sync_group(group_id, payload.mode())
        .await?;

    Ok(Json(summary.into()))
}
