use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

pub async fn get_setting(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let value = db
        .get_setting(&key)?
        .ok_or_else(|| ApiError::NotFound(format!("setting {key} not set")))?;
    Ok(Json(json!({ "key": key, "value": value })))
}

#[derive(Debug, Deserialize)]
pub struct SettingBody {
    pub value: String,
}

pub async fn set_setting(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(body): Json<SettingBody>,
) -> ApiResult<serde_json::Value> {
    if key.trim().is_empty() {
        return Err(ApiError::BadRequest("setting key must not be empty".to_string()));
    }
    let db = state.db.lock();
    db.set_setting(&key, &body.value)?;
    Ok(Json(json!({ "key": key, "value": body.value })))
}
