use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::db::DbAttachment;
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<DbAttachment>> {
    let limit = params.limit.unwrap_or(200).clamp(1, 1000);
    let db = state.db.lock();
    Ok(Json(db.list_attachments(limit)?))
}

pub async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<DbAttachment> {
    let db = state.db.lock();
    let attachment = db
        .get_attachment(id)?
        .ok_or_else(|| ApiError::NotFound(format!("attachment {id} not found")))?;
    Ok(Json(attachment))
}

/// Serve the stored file for an attachment.
pub async fn download(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let attachment = {
        let db = state.db.lock();
        db.get_attachment(id)?
            .ok_or_else(|| ApiError::NotFound(format!("attachment {id} not found")))?
    };

    let file_path = attachment
        .file_path
        .ok_or_else(|| ApiError::NotFound(format!("attachment {id} has no stored file")))?;

    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("file for attachment {id} is missing from disk"))
        } else {
            ApiError::Internal(format!("Failed to read {file_path}: {e}"))
        }
    })?;

    let content_type = attachment
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename = attachment.filename.unwrap_or_else(|| format!("attachment-{id}"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
