use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::{EmailSummary, InvoiceListing};
use crate::index::{self, Collection};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

/// Combined listing: parsed invoices plus invoice-looking emails that never
/// produced a parsed row.
#[derive(Debug, serde::Serialize)]
pub struct InvoiceOverview {
    pub invoices: Vec<InvoiceListing>,
    pub unparsed_emails: Vec<EmailSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Hidden rows stay listable so they can be unhidden.
    #[serde(default)]
    pub include_hidden: bool,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<InvoiceOverview> {
    let db = state.db.lock();
    Ok(Json(InvoiceOverview {
        invoices: db.list_invoices(query.include_hidden)?,
        unparsed_emails: db.invoice_like_emails(50)?,
    }))
}

pub async fn by_tab(
    State(state): State<SharedState>,
    Path(tab): Path<String>,
) -> ApiResult<Vec<InvoiceListing>> {
    if tab.trim().is_empty() {
        return Err(ApiError::BadRequest("tab must not be empty".to_string()));
    }
    let db = state.db.lock();
    Ok(Json(db.invoices_for_tab(&tab)?))
}

#[derive(Debug, Deserialize)]
pub struct AmountBody {
    pub amount: f64,
}

pub async fn update_amount(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<AmountBody>,
) -> ApiResult<serde_json::Value> {
    if !body.amount.is_finite() || body.amount < 0.0 {
        return Err(ApiError::BadRequest("amount must be a non-negative number".to_string()));
    }
    let db = state.db.lock();
    if !db.update_invoice_amount(id, body.amount)? {
        return Err(ApiError::NotFound(format!("invoice {id} not found")));
    }
    Ok(Json(json!({ "id": id, "amount": body.amount, "amount_edited": true })))
}

#[derive(Debug, Deserialize)]
pub struct NumberBody {
    pub invoice_number: String,
}

pub async fn update_number(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<NumberBody>,
) -> ApiResult<serde_json::Value> {
    if body.invoice_number.trim().is_empty() {
        return Err(ApiError::BadRequest("invoice_number must not be empty".to_string()));
    }
    let db = state.db.lock();
    if !db.update_invoice_number(id, body.invoice_number.trim())? {
        return Err(ApiError::NotFound(format!("invoice {id} not found")));
    }
    Ok(Json(json!({ "id": id, "invoice_number": body.invoice_number.trim() })))
}

#[derive(Debug, Deserialize)]
pub struct HideBody {
    pub hidden: bool,
}

pub async fn set_hidden(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<HideBody>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.set_invoice_hidden(id, body.hidden)? {
        return Err(ApiError::NotFound(format!("invoice {id} not found")));
    }
    Ok(Json(json!({ "id": id, "hidden": body.hidden })))
}

#[derive(Debug, Deserialize)]
pub struct TabBody {
    pub tab: Option<String>,
}

pub async fn assign_tab(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<TabBody>,
) -> ApiResult<serde_json::Value> {
    let tab = body.tab.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let db = state.db.lock();
    if !db.assign_invoice_tab(id, tab)? {
        return Err(ApiError::NotFound(format!("invoice {id} not found")));
    }
    Ok(Json(json!({ "id": id, "assigned_tab": tab })))
}

#[derive(Debug, serde::Serialize)]
pub struct SimilarInvoice {
    pub invoice_id: i64,
    pub invoice_number: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub similarity: f32,
}

/// Suggest an amount for an invoice the parser missed, from the amounts of the
/// most similar indexed invoices, weighted by similarity.
pub async fn suggest_amount(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let text = db
        .invoice_raw_text(id)?
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::NotFound(format!("invoice {id} not found or has no text")))?;

    let hits = index::query(&db, &state.embedder, Collection::Invoices, &text, 10)?;

    let mut similar = Vec::new();
    for hit in hits {
        if hit.id == id {
            continue;
        }
        let Some(invoice) = db.get_invoice(hit.id)? else {
            continue;
        };
        let Some(amount) = invoice.amount.filter(|a| *a > 0.0) else {
            continue;
        };
        similar.push(SimilarInvoice {
            invoice_id: hit.id,
            invoice_number: invoice.invoice_number,
            amount,
            currency: invoice.currency,
            similarity: hit.score,
        });
    }

    if similar.is_empty() {
        return Ok(Json(json!({
            "suggested_amount": null,
            "similar_invoices": [],
        })));
    }

    let total_weight: f64 = similar.iter().map(|s| s.similarity.max(0.0) as f64).sum();
    let suggested = if total_weight > 0.0 {
        similar
            .iter()
            .map(|s| s.amount * s.similarity.max(0.0) as f64)
            .sum::<f64>()
            / total_weight
    } else {
        similar[0].amount
    };
    similar.truncate(5);

    Ok(Json(json!({
        "suggested_amount": (suggested * 100.0).round() / 100.0,
        "confidence": similar[0].similarity,
        "similar_invoices": similar,
    })))
}
