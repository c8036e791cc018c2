//! Background IMAP sync, guarded against concurrent runs.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::archiver;
use crate::db::now_string;
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct StartBody {
    pub folder: Option<String>,
    pub limit: Option<usize>,
}

pub async fn start(
    State(state): State<SharedState>,
    body: Option<Json<StartBody>>,
) -> ApiResult<serde_json::Value> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let folder = body.folder.unwrap_or_else(|| "INBOX".to_string());
    let limit = body.limit.unwrap_or(50).clamp(1, 500);

    if !state.try_start_sync() {
        return Err(ApiError::Conflict("a sync is already running".to_string()));
    }

    let task_state = state.clone();
    tokio::task::spawn_blocking(move || {
        let message = {
            let db = task_state.db.lock();
            match archiver::download_mailbox(&db, &task_state.config, &folder, limit) {
                Ok(report) => {
                    if let Err(e) = db.set_setting("last_sync", &now_string()) {
                        log::warn!("Failed to record last_sync: {e}");
                    }
                    format!(
                        "Archived {} of {} messages ({} attachments, {} invoices)",
                        report.archived, report.fetched, report.attachments, report.invoices
                    )
                }
                Err(e) => {
                    log::error!("Sync failed: {e}");
                    format!("Sync failed: {e}")
                }
            }
        };
        task_state.finish_sync(message);
    });

    Ok(Json(json!({ "started": true })))
}

pub async fn status(State(state): State<SharedState>) -> ApiResult<serde_json::Value> {
    let running = state.sync_running();
    let message = state.sync_message.lock().clone();
    let last_sync = {
        let db = state.db.lock();
        db.get_setting("last_sync")?
    };
    Ok(Json(json!({
        "running": running,
        "message": message,
        "last_sync": last_sync,
    })))
}
