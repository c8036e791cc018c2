//! Shared type definitions for the database layer.
//!
//! JSON field names mirror the column names (snake_case), which is what the
//! dashboard API serves.

use serde::{Deserialize, Serialize};

/// Fields of an email about to be archived. `id` is assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewEmail {
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub date_received: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub headers: Option<String>,
    pub folder: String,
}

/// A full row from the `emails` table.
#[derive(Debug, Clone, Serialize)]
pub struct DbEmail {
    pub id: i64,
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub date_received: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub headers: Option<String>,
    pub folder: Option<String>,
    pub created_at: Option<String>,
}

/// Listing row: email metadata with read flag and attachment count.
#[derive(Debug, Clone, Serialize)]
pub struct EmailSummary {
    pub id: i64,
    pub subject: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub date_received: Option<String>,
    pub folder: Option<String>,
    pub is_read: bool,
    pub attachment_count: i64,
}

/// A row from the `attachments` table.
#[derive(Debug, Clone, Serialize)]
pub struct DbAttachment {
    pub id: i64,
    pub email_id: Option<i64>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub file_path: Option<String>,
    pub file_hash: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAttachment {
    pub email_id: i64,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub file_path: String,
    pub file_hash: String,
}

/// Invoice fields produced by the parser (before storage).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedInvoice {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub vendor: Option<String>,
}

/// A row from `parsed_invoices`.
#[derive(Debug, Clone, Serialize)]
pub struct DbInvoice {
    pub id: i64,
    pub attachment_id: Option<i64>,
    pub email_id: Option<i64>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub vendor: Option<String>,
    pub hidden: bool,
    pub assigned_tab: Option<String>,
    pub amount_edited: bool,
    pub created_at: Option<String>,
}

/// Joined listing row: invoice with its attachment and source email.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListing {
    #[serde(flatten)]
    pub invoice: DbInvoice,
    pub filename: Option<String>,
    pub file_path: Option<String>,
    pub email_subject: Option<String>,
    pub email_from: Option<String>,
    pub email_date: Option<String>,
}

/// Raw material for the contact/organization aggregation.
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub from_address: String,
    pub date_received: Option<String>,
    pub subject: Option<String>,
    pub body_text: Option<String>,
}

/// An order surfaced for the timeline view, derived from parsed invoices.
#[derive(Debug, Clone, Serialize)]
pub struct EmailOrder {
    pub id: i64,
    pub order_number: String,
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub customer: Option<String>,
}

/// Aggregate figures for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EmailStats {
    pub total_emails: i64,
    pub total_attachments: i64,
    pub unique_senders: i64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub top_senders: Vec<SenderCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SenderCount {
    pub address: String,
    pub count: i64,
}

/// A row from `production_runs`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductionRun {
    pub id: i64,
    pub client: Option<String>,
    pub order_ref: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<i64>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub scheduled_month: Option<String>,
    pub eta_month: Option<String>,
    pub date_ordered: Option<String>,
    pub downpayment_paid: bool,
    pub date_prod_start: Option<String>,
    pub date_prod_end: Option<String>,
    pub date_warehouse: Option<String>,
    pub paid_off: bool,
    pub date_delivered: Option<String>,
    pub price_per_roll: f64,
    pub cost_per_roll: f64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Client-supplied fields for creating/updating a production run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionRunInput {
    pub client: Option<String>,
    pub order_ref: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<i64>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub scheduled_month: Option<String>,
    pub eta_month: Option<String>,
    pub date_ordered: Option<String>,
    #[serde(default)]
    pub downpayment_paid: bool,
    pub date_prod_start: Option<String>,
    pub date_prod_end: Option<String>,
    pub date_warehouse: Option<String>,
    #[serde(default)]
    pub paid_off: bool,
    pub date_delivered: Option<String>,
    #[serde(default)]
    pub price_per_roll: f64,
    #[serde(default)]
    pub cost_per_roll: f64,
}

/// A row from `production_feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub files: Option<String>,
    pub feedback_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub files: Option<String>,
    pub feedback_date: Option<String>,
}

/// A row from `products`.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub notes: Option<String>,
}

/// A row from `clients`.
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact_info: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub country: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub contact_info: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub country: Option<String>,
}

/// A row from `client_product_prices`, joined with names for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ClientProductPrice {
    pub id: i64,
    pub client_id: i64,
    pub product_id: i64,
    pub price: f64,
    pub client_name: Option<String>,
    pub product_name: Option<String>,
    pub updated_at: Option<String>,
}

/// A row from `production_files`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductionFile {
    pub id: i64,
    pub client: Option<String>,
    pub filename: Option<String>,
    pub filepath: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

/// A row from `business_documents`.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessDocument {
    pub id: i64,
    pub document_number: String,
    pub document_date: Option<String>,
    pub expiry_date: Option<String>,
    pub reference: Option<String>,
    pub bill_to: Option<String>,
    pub ship_to: Option<String>,
    pub items: serde_json::Value,
    pub tax_rate: f64,
    pub shipping: f64,
    pub subtotal: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Listing row for the document index pages.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub document_number: String,
    pub document_date: Option<String>,
    pub expiry_date: Option<String>,
    pub bill_to: Option<String>,
    pub total: f64,
    pub status: String,
    pub created_at: Option<String>,
}

/// Client-supplied fields for saving a document. Line items arrive as a JSON
/// array and are stored verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    pub document_number: String,
    pub document_date: Option<String>,
    pub expiry_date: Option<String>,
    pub reference: Option<String>,
    pub bill_to: Option<String>,
    pub ship_to: Option<String>,
    #[serde(default)]
    pub items: serde_json::Value,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub total: f64,
    pub notes: Option<String>,
    pub status: Option<String>,
}

/// Organization metadata assembled from the per-domain tables.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationDetails {
    pub domain: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub related_domain: Option<String>,
}

/// A row from `organization_files`.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationFile {
    pub id: i64,
    pub domain: String,
    pub attachment_id: Option<i64>,
    pub filename: Option<String>,
    pub file_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}
