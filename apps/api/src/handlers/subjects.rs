use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tutela_core::{ItemId, RoleId, SubjectId};
use tutela_domain::{ItemRef, ItemType};

use crate::dto::{
    AssignmentResponse, ChangeLogEntryResponse, ChangeRoleRequest, CompleteAssignmentRequest,
    SubjectSyncResponse, TrainingStatusResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{parse_id, parse_optional_id};

const DEFAULT_CHANGE_LOG_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChangeLogQuery {
    pub limit: Option<usize>,
}

pub async fn sync_subject_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<SubjectSyncResponse>> {
    let subject_id = parse_id::<SubjectId>(&subject_id)?;
    let outcome = state.sync_service.sync_subject(subject_id).await?;

    Ok(Json(outcome.into()))
}

pub async fn change_role_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Json<SubjectSyncResponse>> {
    let subject_id = parse_id::<SubjectId>(&subject_id)?;
    let role_id = parse_optional_id::<RoleId>(payload.role_id.as_deref())?;
    let outcome = state.sync_service.change_role(subject_id, role_id).await?;

    Ok(Json(outcome.into()))
}

pub async fn training_status_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<TrainingStatusResponse>> {
    let subject_id = parse_id::<SubjectId>(&subject_id)?;
    let status = state.sync_service.training_status(subject_id).await?;

    Ok(Json(status.into()))
}

pub async fn complete_assignment_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<CompleteAssignmentRequest>,
) -> ApiResult<Json<AssignmentResponse>> {
    let subject_id = parse_id::<SubjectId>(&subject_id)?;
    let item = ItemRef::new(
        ItemType::from_transport(payload.item_type.trim())?,
        parse_id::<ItemId>(&payload.item_id)?,
    );
    let assignment = state
        .sync_service
        .complete_assignment(subject_id, item)
        .await?;

    Ok(Json(assignment.into()))
}

pub async fn change_log_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Query(query): Query<ChangeLogQuery>,
) -> ApiResult<Json<Vec<ChangeLogEntryResponse>>> {
    let subject_id = parse_id::<SubjectId>(&subject_id)?;
    let entries = state
        .sync_service
        .change_log(subject_id, query.limit.unwrap_or(DEFAULT_CHANGE_LOG_LIMIT))
        .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
