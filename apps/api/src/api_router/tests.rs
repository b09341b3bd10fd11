use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use tutela_application::{AssignmentSyncService, SyncSettings};
use tutela_core::{AssignmentId, DepartmentId, ItemId, RoleId, SubjectId};
use tutela_domain::{Assignment, AssignmentOrigin, ItemRef, SubjectProfile};
use tutela_infrastructure::InMemoryTrainingStore;

use super::build_router;
use crate::state::AppState;

const SECRET: &str = "router-test-secret-with-enough-length";

fn router(store: &Arc<InMemoryTrainingStore>) -> Router {
    build_router(AppState {
        sync_service: AssignmentSyncService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            SyncSettings::default(),
        ),
        shared_secret: SECRET.to_owned(),
        postgres_pool: None,
        redis_client: None,
    })
}

async fn send_with_token(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let request = match builder.body(body) {
        Ok(request) => request,
        Err(error) => panic!("failed to build request: {error}"),
    };
    let response = match router.clone().oneshot(request).await {
        Ok(response) => response,
        Err(error) => match error {},
    };

    let status = response.status();
    let bytes = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => panic!("failed to read response body: {error}"),
    };
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, payload)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with_token(router, method, uri, body, Some(SECRET)).await
}

async fn subject_with_role(
    store: &InMemoryTrainingStore,
    items: &[ItemRef],
) -> (SubjectId, RoleId) {
    let role_id = RoleId::new();
    store.insert_role(role_id, None).await;
    for item in items {
        store.add_role_requirement(role_id, *item).await;
    }
    let subject_id = SubjectId::new();
    store
        .insert_subject(SubjectProfile::new(subject_id).with_role(role_id))
        .await;
    (subject_id, role_id)
}

#[tokio::test]
async fn health_is_public_and_reports_disabled_dependencies() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let router = router(&store);

    let (status, body) = send_with_token(&router, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], json!(true));
    assert_eq!(body["postgres"]["status"], json!("disabled"));
    assert_eq!(body["redis"]["status"], json!("disabled"));
}

#[tokio::test]
async fn protected_routes_require_the_shared_secret() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let router = router(&store);
    let uri = format!("/api/subjects/{}/sync", SubjectId::new());

    let (missing, _) = send_with_token(&router, Method::POST, &uri, None, None).await;
    let (wrong, body) =
        send_with_token(&router, Method::POST, &uri, None, Some("not-the-secret")).await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn near_miss_secrets_are_rejected() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let router = router(&store);
    let uri = format!("/api/subjects/{}/sync", SubjectId::new());
    let mut flipped = SECRET.to_owned();
    flipped.pop();
    flipped.push('#');
    let prefix = &SECRET[..SECRET.len() - 1];
    let extended = format!("{SECRET}x");

    for token in [flipped.as_str(), prefix, extended.as_str()] {
        let (status, _) = send_with_token(&router, Method::POST, &uri, None, Some(token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?} was accepted");
    }
}

#[tokio::test]
async fn subject_sync_reports_counts_then_noop() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let items = [
        ItemRef::module(ItemId::new()),
        ItemRef::document(ItemId::new()),
    ];
    let (subject_id, _) = subject_with_role(&store, &items).await;
    let router = router(&store);
    let uri = format!("/api/subjects/{subject_id}/sync");

    let (first_status, first) = send(&router, Method::POST, &uri, None).await;
    let (_, second) = send(&router, Method::POST, &uri, None).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first["added"], json!(2));
    assert_eq!(first["noop"], json!(false));
    assert_eq!(second["added"], json!(0));
    assert_eq!(second["removed"], json!(0));
    assert_eq!(second["skipped"], json!(2));
    assert_eq!(second["noop"], json!(true));
}

#[tokio::test]
async fn role_change_swaps_assignments() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (subject_id, _) = subject_with_role(&store, &[ItemRef::module(ItemId::new())]).await;
    let next_role = RoleId::new();
    store.insert_role(next_role, None).await;
    store
        .add_role_requirement(next_role, ItemRef::module(ItemId::new()))
        .await;
    let router = router(&store);

    send(&router, Method::POST, &format!("/api/subjects/{subject_id}/sync"), None).await;
    let (status, body) = send(
        &router,
        Method::PUT,
        &format!("/api/subjects/{subject_id}/role"),
        Some(json!({ "role_id": next_role.to_string() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], json!(1));
    assert_eq!(body["removed"], json!(1));

    let (_, log) = send(
        &router,
        Method::GET,
        &format!("/api/subjects/{subject_id}/change-log?limit=10"),
        None,
    )
    .await;
    assert_eq!(log[0]["trigger"], json!("assignment.role_change"));
    assert_eq!(log[0]["new_role_id"], json!(next_role.to_string()));
}

#[tokio::test]
async fn unknown_and_malformed_identifiers_map_to_client_errors() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let router = router(&store);

    let (unknown, body) = send(
        &router,
        Method::POST,
        &format!("/api/subjects/{}/sync", SubjectId::new()),
        None,
    )
    .await;
    let (malformed, _) = send(&router, Method::POST, "/api/subjects/not-a-uuid/sync", None).await;
    let (unknown_role, _) = send(
        &router,
        Method::PUT,
        &format!("/api/subjects/{}/role", SubjectId::new()),
        Some(json!({ "role_id": RoleId::new().to_string() })),
    )
    .await;

    assert_eq!(unknown, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().is_some_and(|message| message.contains("not found")));
    assert_eq!(malformed, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_role, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completion_shows_up_in_training_status() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let item = ItemRef::document(ItemId::new());
    let (subject_id, _) = subject_with_role(&store, &[item]).await;
    let router = router(&store);
    send(&router, Method::POST, &format!("/api/subjects/{subject_id}/sync"), None).await;

    let (status, completed) = send(
        &router,
        Method::POST,
        &format!("/api/subjects/{subject_id}/completions"),
        Some(json!({ "item_type": "document", "item_id": item.item_id.to_string() })),
    )
    .await;
    let (_, training) = send(
        &router,
        Method::GET,
        &format!("/api/subjects/{subject_id}/training"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(completed["completed_at"].as_str().is_some());
    assert_eq!(training["requirements"][0]["sources"][0]["kind"], json!("role"));
    assert_eq!(
        training["assignments"][0]["completed_at"],
        completed["completed_at"]
    );
}

#[tokio::test]
async fn unknown_item_type_is_rejected() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (subject_id, _) = subject_with_role(&store, &[]).await;
    let router = router(&store);

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/subjects/{subject_id}/completions"),
        Some(json!({ "item_type": "video", "item_id": ItemId::new().to_string() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_log_rejects_zero_limit() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (subject_id, _) = subject_with_role(&store, &[]).await;
    let router = router(&store);

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/subjects/{subject_id}/change-log?limit=0"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn department_sync_is_additive_on_repeat() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let department_id = DepartmentId::new();
    store.insert_department(department_id).await;
    store
        .add_department_requirement(department_id, ItemRef::module(ItemId::new()))
        .await;
    for _ in 0..3 {
        store
            .insert_subject(SubjectProfile::new(SubjectId::new()).with_department(department_id))
            .await;
    }
    let router = router(&store);
    let uri = format!("/api/departments/{department_id}/sync");

    let (status, first) = send(&router, Method::POST, &uri, Some(json!({}))).await;
    let (_, second) = send(&router, Method::POST, &uri, Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["added"], json!(3));
    assert_eq!(first["users_affected"], json!(3));
    assert_eq!(second["added"], json!(0));
    assert_eq!(second["noop"], json!(true));
}

#[tokio::test]
async fn unknown_group_sync_is_not_found() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let router = router(&store);

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/groups/{}/sync", tutela_core::GroupId::new()),
        Some(json!({ "full_reconcile": true })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (subject_id, _) = subject_with_role(&store, &[ItemRef::module(ItemId::new())]).await;
    let router = router(&store);
    store.fail_next_apply();

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/subjects/{subject_id}/sync"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.get("added").is_none());
}

#[tokio::test]
async fn maintenance_routes_repair_duplicates_and_report_orphans() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (subject_id, _) = subject_with_role(&store, &[]).await;
    let item = ItemRef::module(ItemId::new());
    for age_days in [3, 1] {
        let assigned_at = Utc::now() - Duration::days(age_days);
        store
            .insert_raw_assignment(Assignment {
                assignment_id: AssignmentId::new(),
                subject_id,
                item,
                origin: AssignmentOrigin::Requirement,
                assigned_at,
                due_at: None,
                completed_at: None,
            })
            .await;
    }
    let router = router(&store);

    let (status, repaired) = send(
        &router,
        Method::POST,
        "/api/maintenance/duplicates",
        Some(json!({ "subject_id": subject_id.to_string() })),
    )
    .await;
    let (_, report) = send(
        &router,
        Method::POST,
        "/api/maintenance/orphans",
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(repaired["removed"], json!(1));
    assert_eq!(report["orphans"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["removed"], json!(0));
    assert_eq!(report["noop"], json!(true));
}
