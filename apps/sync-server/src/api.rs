//! HTTP endpoints for the three replicated documents. Each POST is a full
//! replacement: validate, persist, then broadcast the stored snapshot to
//! every connected push subscriber, the originator included.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use replication::{DocumentKind, PushEvent};
use serde_json::{json, Value};
use templates::{repair_order, TemplateTree};
use tracing::{debug, info};

use crate::AppState;

pub enum ApiError {
    BadRequest(String),
    Storage(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", e),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// GET /api/data - full template tree snapshot
pub async fn get_templates(State(state): State<AppState>) -> Json<TemplateTree> {
    Json(state.store.templates())
}

/// POST /api/data - replace the template tree wholesale
pub async fn update_templates(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require_non_empty_mapping(&body)?;
    let mut tree: TemplateTree = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid snapshot: {}", e)))?;
    // Network boundary: heal order lists before the snapshot becomes canon.
    repair_order(&mut tree.root);

    state
        .store
        .store_templates(&tree)
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    let snapshot = serde_json::to_value(&tree).map_err(|e| ApiError::Storage(e.to_string()))?;
    broadcast(&state, DocumentKind::Templates, snapshot);
    Ok(Json(json!({ "success": true })))
}

/// GET /api/checklist - checklist document
pub async fn get_checklist(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.checklist())
}

/// POST /api/checklist - replace the checklist wholesale
pub async fn update_checklist(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require_non_empty_mapping(&body)?;
    state
        .store
        .store_checklist(body.clone())
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    broadcast(&state, DocumentKind::Checklist, body);
    Ok(Json(json!({ "success": true })))
}

/// GET /api/doctors - doctor color registry
pub async fn get_doctors(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.doctors())
}

/// POST /api/doctors - replace the doctor registry wholesale
pub async fn update_doctors(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require_non_empty_mapping(&body)?;
    let stored = state
        .store
        .store_doctors(body)
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    broadcast(&state, DocumentKind::DoctorColors, stored);
    Ok(Json(json!({ "success": true })))
}

/// An empty or non-mapping body must never overwrite good state.
fn require_non_empty_mapping(body: &Value) -> Result<(), ApiError> {
    let map = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("document must be a mapping".to_string()))?;
    if map.is_empty() {
        return Err(ApiError::BadRequest(
            "refusing to store an empty document".to_string(),
        ));
    }
    Ok(())
}

fn broadcast(state: &AppState, kind: DocumentKind, document: Value) {
    info!("Stored {:?} snapshot, broadcasting {}", kind, kind.event_name());
    // Send only fails when nobody is subscribed, which is fine.
    if state
        .events
        .send(PushEvent::new(kind, document))
        .is_err()
    {
        debug!("No push subscribers connected");
    }
}
