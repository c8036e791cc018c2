use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::{DbAttachment, DbEmail, EmailStats, EmailSummary};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub folder: Option<String>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<EmailSummary>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);
    let db = state.db.lock();
    let emails = db.list_emails(limit, offset, params.folder.as_deref())?;
    Ok(Json(emails))
}

#[derive(Debug, serde::Serialize)]
pub struct EmailDetail {
    #[serde(flatten)]
    pub email: DbEmail,
    pub attachments: Vec<DbAttachment>,
}

pub async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<EmailDetail> {
    let db = state.db.lock();
    let email = db
        .get_email(id)?
        .ok_or_else(|| ApiError::NotFound(format!("email {id} not found")))?;
    let attachments = db.attachments_for_email(id)?;
    Ok(Json(EmailDetail { email, attachments }))
}

#[derive(Debug, Deserialize)]
pub struct ReadBody {
    pub is_read: bool,
}

pub async fn set_read(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<ReadBody>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if db.get_email(id)?.is_none() {
        return Err(ApiError::NotFound(format!("email {id} not found")));
    }
    db.set_email_read(id, body.is_read)?;
    Ok(Json(json!({ "id": id, "is_read": body.is_read })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<i64>,
}

pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<EmailSummary>> {
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let db = state.db.lock();
    let hits = db.search_emails(&params.q, limit)?;
    Ok(Json(hits))
}

pub async fn stats(State(state): State<SharedState>) -> ApiResult<EmailStats> {
    let db = state.db.lock();
    Ok(Json(db.email_stats(10)?))
}
