//! Semantic index endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::index::{self, Collection, IndexStatus, SearchHit};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

pub async fn reindex_emails(State(state): State<SharedState>) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let indexed = index::reindex_emails(&db, &state.embedder)?;
    Ok(Json(json!({ "collection": "emails", "indexed": indexed })))
}

pub async fn reindex_invoices(State(state): State<SharedState>) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let indexed = index::reindex_invoices(&db, &state.embedder)?;
    Ok(Json(json!({ "collection": "invoices", "indexed": indexed })))
}

pub async fn status(State(state): State<SharedState>) -> ApiResult<IndexStatus> {
    let db = state.db.lock();
    Ok(Json(index::status(&db, &state.embedder)?))
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub collection: String,
    pub q: String,
    pub k: Option<usize>,
}

pub async fn query(
    State(state): State<SharedState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Vec<SearchHit>> {
    let collection = Collection::parse(&params.collection).ok_or_else(|| {
        ApiError::BadRequest(format!("unknown collection {:?}", params.collection))
    })?;
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let k = params.k.unwrap_or(10).clamp(1, 100);
    let db = state.db.lock();
    Ok(Json(index::query(&db, &state.embedder, collection, &params.q, k)?))
}
