//! Outgoing documents: pro forma invoices and issued invoices built in the
//! dashboard. Saving upserts by document number so drafts can be re-saved.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::{BusinessDocument, DocumentInput, DocumentKind, DocumentSummary};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

fn parse_kind(kind: &str) -> Result<DocumentKind, ApiError> {
    DocumentKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown document kind '{kind}'")))
}

pub async fn save(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Json(body): Json<DocumentInput>,
) -> ApiResult<serde_json::Value> {
    let kind = parse_kind(&kind)?;
    if body.document_number.trim().is_empty() {
        return Err(ApiError::BadRequest("document_number must not be empty".to_string()));
    }
    let db = state.db.lock();
    let id = db.save_document(kind, &body)?;
    Ok(Json(json!({
        "id": id,
        "kind": kind.as_str(),
        "document_number": body.document_number,
    })))
}

pub async fn list(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> ApiResult<Vec<DocumentSummary>> {
    let kind = parse_kind(&kind)?;
    let db = state.db.lock();
    Ok(Json(db.list_documents(kind)?))
}

pub async fn detail(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<BusinessDocument> {
    let kind = parse_kind(&kind)?;
    let db = state.db.lock();
    db.get_document(kind, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {id} not found", kind.as_str())))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn set_status(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(body): Json<StatusBody>,
) -> ApiResult<serde_json::Value> {
    let kind = parse_kind(&kind)?;
    if body.status.trim().is_empty() {
        return Err(ApiError::BadRequest("status must not be empty".to_string()));
    }
    let db = state.db.lock();
    if !db.set_document_status(kind, id, body.status.trim())? {
        return Err(ApiError::NotFound(format!("{} {id} not found", kind.as_str())));
    }
    Ok(Json(json!({ "id": id, "status": body.status.trim() })))
}

pub async fn delete_document(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<serde_json::Value> {
    let kind = parse_kind(&kind)?;
    let db = state.db.lock();
    if !db.delete_document(kind, id)? {
        return Err(ApiError::NotFound(format!("{} {id} not found", kind.as_str())));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}
