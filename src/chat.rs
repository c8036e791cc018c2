//! Chat relay: answers natural-language questions about the archive by
//! assembling local context and forwarding one request to an OpenAI-style
//! chat-completions API.

use serde_json::json;

use crate::config::Config;
use crate::db::ArchiveDb;
use crate::error::RelayError;

const SYSTEM_PROMPT: &str = "You are an assistant for a small manufacturing business. \
You answer questions about the company's archived emails, invoices, products, clients, \
and production orders. Base your answers on the provided context. When the context does \
not contain the answer, say so instead of guessing.";

const MAX_CONTEXT_EMAILS: i64 = 10;
const MAX_SEARCH_HITS: i64 = 10;

pub struct ChatRelay {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatRelay {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.chat_api_url.clone(),
            api_key: config.chat_api_key.clone(),
            model: config.chat_model.clone(),
        }
    }

    /// Send one completion request. No retries; transport and API failures
    /// surface as relay errors.
    pub async fn ask(&self, context: &str, question: &str) -> Result<String, RelayError> {
        let api_key = self.api_key.as_ref().ok_or(RelayError::MissingApiKey)?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Context from the archive:\n{context}\n\nQuestion: {question}")
                },
            ],
            "temperature": 0.2,
            "max_tokens": 1000,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RelayError::BadResponse(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| RelayError::BadResponse("no message content in response".to_string()))
    }
}

/// Assemble the local context block for a question: recent mail, mail matching
/// the question terms, and the business tables.
pub fn build_context(db: &ArchiveDb, question: &str) -> Result<String, String> {
    let mut sections = Vec::new();

    let recent = db.recent_emails(MAX_CONTEXT_EMAILS)?;
    if !recent.is_empty() {
        let mut block = String::from("Recent emails:\n");
        for email in &recent {
            block.push_str(&format!(
                "- [{}] {} from {}\n",
                email.date_received.as_deref().unwrap_or("?"),
                email.subject.as_deref().unwrap_or("(no subject)"),
                email.from_address.as_deref().unwrap_or("?"),
            ));
        }
        sections.push(block);
    }

    for term in question_terms(question) {
        let hits = db.search_emails(&term, MAX_SEARCH_HITS)?;
        if hits.is_empty() {
            continue;
        }
        let mut block = format!("Emails matching '{}':\n", term);
        for hit in &hits {
            block.push_str(&format!(
                "- [{}] {} from {}\n",
                hit.date_received.as_deref().unwrap_or("?"),
                hit.subject.as_deref().unwrap_or("(no subject)"),
                hit.from_address.as_deref().unwrap_or("?"),
            ));
        }
        sections.push(block);
    }

    let products = db.list_products()?;
    if !products.is_empty() {
        let mut block = String::from("Products:\n");
        for product in &products {
            block.push_str(&format!("- {} (list price {})\n", product.name, product.price));
        }
        sections.push(block);
    }

    let clients = db.list_clients()?;
    if !clients.is_empty() {
        let mut block = String::from("Clients:\n");
        for client in &clients {
            block.push_str(&format!(
                "- {}{}\n",
                client.name,
                client
                    .country
                    .as_deref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default()
            ));
        }
        sections.push(block);
    }

    let runs = db.list_production_runs()?;
    if !runs.is_empty() {
        let mut block = String::from("Production runs:\n");
        for run in &runs {
            block.push_str(&format!(
                "- {} x{} for {}: {}\n",
                run.product.as_deref().unwrap_or("?"),
                run.quantity.unwrap_or(0),
                run.client.as_deref().unwrap_or("?"),
                run.status.as_deref().unwrap_or("pending"),
            ));
        }
        sections.push(block);
    }

    if sections.is_empty() {
        sections.push("The archive is empty.".to_string());
    }
    Ok(sections.join("\n"))
}

/// Pick the search-worthy words out of a question.
fn question_terms(question: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .filter(|w| seen.insert(w.clone()))
        .take(5)
        .collect()
}
