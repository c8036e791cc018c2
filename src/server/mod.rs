//! HTTP JSON API.
//!
//! One axum router over [`AppState`]. Handlers lock the database, do their
//! work synchronously, and drop the guard before any await.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod handlers;

/// Error envelope returned by every endpoint.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_)) {
            log::error!("Request failed: {}", self.message());
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<String> for ApiError {
    fn from(message: String) -> Self {
        ApiError::Internal(message)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: SharedState) -> Router {
    use handlers::*;

    Router::new()
        .route("/api/health", get(health))
        // Emails
        .route("/api/emails", get(emails::list))
        .route("/api/emails/:id", get(emails::detail))
        .route("/api/emails/:id/read", post(emails::set_read))
        .route("/api/search", get(emails::search))
        .route("/api/stats", get(emails::stats))
        // Entities and organisations
        .route("/api/entities", get(entities::list_contacts))
        .route("/api/entity-relationships", get(entities::relationships))
        .route("/api/organisations", get(entities::list_organisations))
        .route("/api/organisations/:domain", get(entities::details))
        .route("/api/organisations/:domain", delete(entities::delete_organisation))
        .route("/api/organisations/:domain/details", post(entities::save_details))
        .route("/api/organisations/:domain/rename", post(entities::rename))
        .route("/api/organisations/:domain/category", post(entities::set_category))
        .route("/api/organisations/:domain/relationship", post(entities::set_relationship))
        .route("/api/organisations/:domain/files", get(entities::list_files))
        .route("/api/organisations/:domain/files", post(entities::link_file))
        .route("/api/organisation-files/:id", delete(entities::delete_file))
        .route("/api/organisations/assign", post(entities::assign_email))
        // Invoices
        .route("/api/invoices", get(invoices::list))
        .route("/api/invoices/tab/:tab", get(invoices::by_tab))
        .route("/api/invoices/:id/amount", post(invoices::update_amount))
        .route("/api/invoices/:id/number", post(invoices::update_number))
        .route("/api/invoices/:id/hide", post(invoices::set_hidden))
        .route("/api/invoices/:id/tab", post(invoices::assign_tab))
        .route("/api/invoices/:id/suggest-amount", post(invoices::suggest_amount))
        // Outgoing documents (pro formas, issued invoices)
        .route("/api/documents/:kind", get(documents::list))
        .route("/api/documents/:kind", post(documents::save))
        .route("/api/documents/:kind/:id", get(documents::detail))
        .route("/api/documents/:kind/:id", delete(documents::delete_document))
        .route("/api/documents/:kind/:id/status", post(documents::set_status))
        // Attachments
        .route("/api/attachments", get(attachments::list))
        .route("/api/attachments/:id", get(attachments::detail))
        .route("/api/attachments/:id/download", get(attachments::download))
        // Production
        .route("/api/production/runs", get(production::list_runs))
        .route("/api/production/runs", post(production::create_run))
        .route("/api/production/runs/:id", put(production::update_run))
        .route("/api/production/runs/:id", delete(production::delete_run))
        .route("/api/production/feedback", get(production::list_feedback))
        .route("/api/production/feedback", post(production::create_feedback))
        .route("/api/production/feedback/:id", put(production::update_feedback))
        .route("/api/production/feedback/:id", delete(production::delete_feedback))
        .route("/api/products", get(production::list_products))
        .route("/api/products", post(production::create_product))
        .route("/api/products/:id", put(production::update_product))
        .route("/api/products/:id", delete(production::delete_product))
        .route("/api/clients", get(production::list_clients))
        .route("/api/clients", post(production::create_client))
        .route("/api/clients/:id", put(production::update_client))
        .route("/api/clients/:id", delete(production::delete_client))
        .route("/api/client-prices", get(production::list_prices))
        .route("/api/client-prices", post(production::set_price))
        .route("/api/client-prices/:id", delete(production::delete_price))
        .route("/api/client-prices/lookup", get(production::lookup_price))
        .route("/api/production/files", get(production::list_files))
        .route("/api/production/files", post(production::add_file))
        .route("/api/production/files/:id", delete(production::delete_file))
        .route("/api/orders", get(production::email_orders))
        // Settings
        .route("/api/settings/:key", get(settings::get_setting))
        .route("/api/settings/:key", post(settings::set_setting))
        // Sync
        .route("/api/sync/start", post(sync::start))
        .route("/api/sync/status", get(sync::status))
        // Semantic index
        .route("/api/index/emails", post(search::reindex_emails))
        .route("/api/index/invoices", post(search::reindex_invoices))
        .route("/api/index/status", get(search::status))
        .route("/api/index/search", get(search::query))
        // Chat relay
        .route("/api/ask", post(chat::ask))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::db::test_utils::test_db;
    use crate::embeddings::Embedder;
    use crate::state::AppState;

    fn test_state() -> SharedState {
        let config = Config {
            data_dir: std::path::PathBuf::from("/tmp/opsdesk-router-test"),
            imap_server: "imap.example.com".to_string(),
            imap_port: 993,
            imap_email: None,
            imap_password: None,
            chat_api_url: "http://127.0.0.1:1/never".to_string(),
            chat_api_key: None,
            chat_model: "sonar-pro".to_string(),
            http_port: 0,
        };
        Arc::new(AppState::new(config, test_db(), Embedder::hashed()))
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn test_health_responds_ok() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_email_is_404() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::get("/api/emails/999").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_input_leaves_store_unchanged() {
        let state = test_state();
        let app = router(state.clone());

        let response = app
            .oneshot(json_post("/api/products", r#"{"name": "   "}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let count: i64 = {
            let db = state.db.lock();
            db.conn_ref()
                .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
                .expect("count")
        };
        assert_eq!(count, 0, "rejected create must not write a row");
    }

    #[tokio::test]
    async fn test_product_create_then_list() {
        let state = test_state();

        let response = router(state.clone())
            .oneshot(json_post(
                "/api/products",
                r#"{"name": "Thermal rolls 80mm", "price": 1.5}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(state)
            .oneshot(Request::get("/api/products").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let products: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(products.as_array().map(|a| a.len()), Some(1));
        assert_eq!(products[0]["name"], "Thermal rolls 80mm");
    }

    #[tokio::test]
    async fn test_unknown_search_collection_is_400() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::get("/api/index/search?collection=nope&q=hello")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hidden_invoices_stay_listable() {
        let state = test_state();
        let invoice_id = {
            let db = state.db.lock();
            db.store_parsed_invoice(
                1,
                1,
                &crate::db::ParsedInvoice {
                    invoice_number: Some("FCT-1".to_string()),
                    amount: Some(10.0),
                    ..Default::default()
                },
                "",
            )
            .expect("store")
            .expect("row")
        };

        let response = router(state.clone())
            .oneshot(json_post(
                &format!("/api/invoices/{invoice_id}/hide"),
                r#"{"hidden": true}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = get_json(router(state.clone()), "/api/invoices").await;
        assert_eq!(body["invoices"].as_array().map(|a| a.len()), Some(0));

        // Hidden rows must remain reachable so they can be unhidden
        let body = get_json(router(state), "/api/invoices?include_hidden=true").await;
        assert_eq!(body["invoices"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(body["invoices"][0]["hidden"], true);
    }

    #[tokio::test]
    async fn test_entity_relationships_classify_senders() {
        let state = test_state();
        {
            let db = state.db.lock();
            db.insert_email(&crate::db::NewEmail {
                message_id: Some("<r1@x>".to_string()),
                from_address: Some("Ana <ana@gyso.ch>".to_string()),
                subject: Some("Order update".to_string()),
                date_received: Some("2025-06-01T10:00:00+00:00".to_string()),
                folder: "INBOX".to_string(),
                ..Default::default()
            })
            .expect("insert");
        }

        let body = get_json(router(state), "/api/entity-relationships").await;
        assert_eq!(body["customers"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(body["customers"][0]["email"], "ana@gyso.ch");
        assert_eq!(body["other"].as_array().map(|a| a.len()), Some(0));
    }

    #[tokio::test]
    async fn test_organisations_include_auto_categorized_customers() {
        let state = test_state();
        {
            let db = state.db.lock();
            db.insert_email(&crate::db::NewEmail {
                message_id: Some("<o1@x>".to_string()),
                from_address: Some("dan@newshop.com".to_string()),
                subject: Some("Purchase order 12345".to_string()),
                date_received: Some("2025-06-01T10:00:00+00:00".to_string()),
                folder: "INBOX".to_string(),
                ..Default::default()
            })
            .expect("insert");
        }

        // No entity_categories row exists; the keyword scan must classify it
        let body = get_json(router(state), "/api/organisations").await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
        assert_eq!(body[0]["domain"], "newshop.com");
    }

    #[tokio::test]
    async fn test_suggest_amount_from_similar_invoices() {
        let state = test_state();
        let target = {
            let db = state.db.lock();
            let target = db
                .store_parsed_invoice(
                    1,
                    1,
                    &crate::db::ParsedInvoice::default(),
                    "thermal label rolls 80mm order",
                )
                .expect("store")
                .expect("row");
            db.store_parsed_invoice(
                2,
                1,
                &crate::db::ParsedInvoice {
                    invoice_number: Some("FCT-2".to_string()),
                    amount: Some(150.0),
                    currency: Some("EUR".to_string()),
                    ..Default::default()
                },
                "thermal label rolls 80mm repeat order",
            )
            .expect("store")
            .expect("row");
            target
        };

        let response = router(state.clone())
            .oneshot(json_post("/api/index/invoices", "{}"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(state)
            .oneshot(json_post(
                &format!("/api/invoices/{target}/suggest-amount"),
                "{}",
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["suggested_amount"], 150.0);
        assert_eq!(body["similar_invoices"].as_array().map(|a| a.len()), Some(1));
    }

    #[tokio::test]
    async fn test_document_save_then_list() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(json_post(
                "/api/documents/proforma",
                r#"{"document_number": "PF-001", "bill_to": "Acme Labels SRL", "total": 150.0}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = get_json(router(state.clone()), "/api/documents/proforma").await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
        assert_eq!(body[0]["document_number"], "PF-001");

        // Pro formas and invoices are separate series
        let body = get_json(router(state.clone()), "/api/documents/invoice").await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(0));

        let response = router(state)
            .oneshot(json_post(
                "/api/documents/quote",
                r#"{"document_number": "Q-1"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_client_delete_blocked_by_prices_is_409() {
        let state = test_state();
        let client_id = {
            let db = state.db.lock();
            let client_id = db
                .create_client(&crate::db::ClientInput {
                    name: "Acme Labels".to_string(),
                    ..Default::default()
                })
                .expect("client");
            let product_id = db
                .create_product(&crate::db::ProductInput {
                    name: "Thermal rolls 80mm".to_string(),
                    price: 1.5,
                    ..Default::default()
                })
                .expect("product");
            db.set_client_product_price(client_id, product_id, 1.2)
                .expect("price");
            client_id
        };

        let response = router(state)
            .oneshot(
                Request::delete(format!("/api/clients/{client_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
