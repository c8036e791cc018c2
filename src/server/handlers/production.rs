//! Production runs, feedback, products, clients, price agreements, and files.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::{
    Client, ClientDeleteOutcome, ClientInput, ClientProductPrice, EmailOrder, FeedbackInput,
    FeedbackItem, Product, ProductInput, ProductionFile, ProductionRun, ProductionRunInput,
};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

// Production runs

pub async fn list_runs(State(state): State<SharedState>) -> ApiResult<Vec<ProductionRun>> {
    let db = state.db.lock();
    Ok(Json(db.list_production_runs()?))
}

pub async fn create_run(
    State(state): State<SharedState>,
    Json(input): Json<ProductionRunInput>,
) -> ApiResult<ProductionRun> {
    let db = state.db.lock();
    let id = db.create_production_run(&input)?;
    let run = db
        .get_production_run(id)?
        .ok_or_else(|| ApiError::Internal(format!("production run {id} vanished")))?;
    Ok(Json(run))
}

pub async fn update_run(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductionRunInput>,
) -> ApiResult<ProductionRun> {
    let db = state.db.lock();
    if !db.update_production_run(id, &input)? {
        return Err(ApiError::NotFound(format!("production run {id} not found")));
    }
    let run = db
        .get_production_run(id)?
        .ok_or_else(|| ApiError::Internal(format!("production run {id} vanished")))?;
    Ok(Json(run))
}

pub async fn delete_run(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_production_run(id)? {
        return Err(ApiError::NotFound(format!("production run {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

// Feedback

pub async fn list_feedback(State(state): State<SharedState>) -> ApiResult<Vec<FeedbackItem>> {
    let db = state.db.lock();
    Ok(Json(db.list_feedback()?))
}

pub async fn create_feedback(
    State(state): State<SharedState>,
    Json(input): Json<FeedbackInput>,
) -> ApiResult<serde_json::Value> {
    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let db = state.db.lock();
    let id = db.create_feedback(&input)?;
    Ok(Json(json!({ "id": id })))
}

pub async fn update_feedback(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<FeedbackInput>,
) -> ApiResult<serde_json::Value> {
    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let db = state.db.lock();
    if !db.update_feedback(id, &input)? {
        return Err(ApiError::NotFound(format!("feedback {id} not found")));
    }
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_feedback(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_feedback(id)? {
        return Err(ApiError::NotFound(format!("feedback {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

// Products

pub async fn list_products(State(state): State<SharedState>) -> ApiResult<Vec<Product>> {
    let db = state.db.lock();
    Ok(Json(db.list_products()?))
}

pub async fn create_product(
    State(state): State<SharedState>,
    Json(input): Json<ProductInput>,
) -> ApiResult<serde_json::Value> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let db = state.db.lock();
    let id = db.create_product(&input)?;
    Ok(Json(json!({ "id": id })))
}

pub async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> ApiResult<serde_json::Value> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let db = state.db.lock();
    if !db.update_product(id, &input)? {
        return Err(ApiError::NotFound(format!("product {id} not found")));
    }
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_product(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_product(id)? {
        return Err(ApiError::NotFound(format!("product {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

// Clients

pub async fn list_clients(State(state): State<SharedState>) -> ApiResult<Vec<Client>> {
    let db = state.db.lock();
    Ok(Json(db.list_clients()?))
}

pub async fn create_client(
    State(state): State<SharedState>,
    Json(input): Json<ClientInput>,
) -> ApiResult<serde_json::Value> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let db = state.db.lock();
    let id = db.create_client(&input)?;
    Ok(Json(json!({ "id": id })))
}

pub async fn update_client(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<ClientInput>,
) -> ApiResult<serde_json::Value> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let db = state.db.lock();
    if !db.update_client(id, &input)? {
        return Err(ApiError::NotFound(format!("client {id} not found")));
    }
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_client(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    match db.delete_client(id)? {
        ClientDeleteOutcome::Deleted => Ok(Json(json!({ "id": id, "deleted": true }))),
        ClientDeleteOutcome::NotFound => {
            Err(ApiError::NotFound(format!("client {id} not found")))
        }
        ClientDeleteOutcome::Blocked { price_rows } => Err(ApiError::Conflict(format!(
            "client {id} has {price_rows} price agreement(s); remove them first"
        ))),
    }
}

// Client product prices

pub async fn list_prices(State(state): State<SharedState>) -> ApiResult<Vec<ClientProductPrice>> {
    let db = state.db.lock();
    Ok(Json(db.list_client_product_prices()?))
}

#[derive(Debug, Deserialize)]
pub struct PriceBody {
    pub client_id: i64,
    pub product_id: i64,
    pub price: f64,
}

pub async fn set_price(
    State(state): State<SharedState>,
    Json(body): Json<PriceBody>,
) -> ApiResult<serde_json::Value> {
    if !body.price.is_finite() || body.price < 0.0 {
        return Err(ApiError::BadRequest("price must be a non-negative number".to_string()));
    }
    let db = state.db.lock();
    db.set_client_product_price(body.client_id, body.product_id, body.price)?;
    Ok(Json(json!({
        "client_id": body.client_id,
        "product_id": body.product_id,
        "price": body.price,
    })))
}

pub async fn delete_price(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_client_product_price(id)? {
        return Err(ApiError::NotFound(format!("price {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct PriceLookup {
    pub client_id: i64,
    pub product_id: i64,
}

/// Agreed price for a client/product pair, falling back to the list price.
pub async fn lookup_price(
    State(state): State<SharedState>,
    Query(params): Query<PriceLookup>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if let Some(price) = db.client_product_price(params.client_id, params.product_id)? {
        return Ok(Json(json!({ "price": price, "source": "agreement" })));
    }
    let list_price = db
        .list_products()?
        .into_iter()
        .find(|p| p.id == params.product_id)
        .map(|p| p.price);
    match list_price {
        Some(price) => Ok(Json(json!({ "price": price, "source": "list" }))),
        None => Err(ApiError::NotFound(format!(
            "product {} not found",
            params.product_id
        ))),
    }
}

// Production files

pub async fn list_files(State(state): State<SharedState>) -> ApiResult<Vec<ProductionFile>> {
    let db = state.db.lock();
    Ok(Json(db.list_production_files()?))
}

#[derive(Debug, Deserialize)]
pub struct FileBody {
    pub client: Option<String>,
    pub filename: String,
    pub filepath: String,
    pub description: Option<String>,
}

pub async fn add_file(
    State(state): State<SharedState>,
    Json(body): Json<FileBody>,
) -> ApiResult<serde_json::Value> {
    if body.filename.trim().is_empty() || body.filepath.trim().is_empty() {
        return Err(ApiError::BadRequest("filename and filepath required".to_string()));
    }
    let db = state.db.lock();
    let id = db.add_production_file(
        body.client.as_deref(),
        body.filename.trim(),
        body.filepath.trim(),
        body.description.as_deref(),
    )?;
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_file(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_production_file(id)? {
        return Err(ApiError::NotFound(format!("production file {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

// Order timeline

pub async fn email_orders(State(state): State<SharedState>) -> ApiResult<Vec<EmailOrder>> {
    let db = state.db.lock();
    Ok(Json(db.email_orders(20)?))
}
