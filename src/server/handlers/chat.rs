use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::chat;
use crate::error::RelayError;
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub question: String,
}

pub async fn ask(
    State(state): State<SharedState>,
    Json(body): Json<AskBody>,
) -> ApiResult<serde_json::Value> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    // Assemble context under the lock, release it before the network call
    let context = {
        let db = state.db.lock();
        chat::build_context(&db, question)?
    };

    let answer = state.relay.ask(&context, question).await.map_err(|e| match e {
        RelayError::MissingApiKey => {
            ApiError::BadRequest("no chat API key is configured".to_string())
        }
        other => ApiError::Upstream(other.to_string()),
    })?;

    Ok(Json(json!({ "question": question, "answer": answer })))
}
