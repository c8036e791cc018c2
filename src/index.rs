//! Semantic index over the archive.
//!
//! Two collections (emails, invoices) stored as f32 vector blobs next to the
//! rows they index. Reindexing is a deliberate batch operation; the relational
//! store and the index may drift between runs, and the status report makes
//! that drift visible.

use rusqlite::params;
use serde::Serialize;

use crate::db::ArchiveDb;
use crate::embeddings::{blob_to_f32_vec, cosine_similarity, f32_vec_to_blob, Embedder};

const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collection {
    Emails,
    Invoices,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Emails => "email_embeddings",
            Collection::Invoices => "invoice_embeddings",
        }
    }

    fn key_column(self) -> &'static str {
        match self {
            Collection::Emails => "email_id",
            Collection::Invoices => "invoice_id",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "emails" => Some(Collection::Emails),
            "invoices" => Some(Collection::Invoices),
            _ => None,
        }
    }
}

/// A scored match from a collection query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub score: f32,
    pub document: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub emails_total: i64,
    pub emails_indexed: i64,
    pub invoices_total: i64,
    pub invoices_indexed: i64,
    pub model: String,
}

/// Rebuild the email collection from every archived email.
/// Returns the number of documents indexed.
pub fn reindex_emails(db: &ArchiveDb, embedder: &Embedder) -> Result<usize, String> {
    let documents = db.email_documents()?;
    reindex(db, embedder, Collection::Emails, documents)
}

/// Rebuild the invoice collection from every parsed invoice.
pub fn reindex_invoices(db: &ArchiveDb, embedder: &Embedder) -> Result<usize, String> {
    let documents = db.invoice_documents()?;
    reindex(db, embedder, Collection::Invoices, documents)
}

fn reindex(
    db: &ArchiveDb,
    embedder: &Embedder,
    collection: Collection,
    documents: Vec<(i64, String)>,
) -> Result<usize, String> {
    let model = embedder.model_tag();
    let mut indexed = 0usize;

    for chunk in documents.chunks(EMBED_BATCH) {
        let texts: Vec<String> = chunk.iter().map(|(_, doc)| doc.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;

        db.with_transaction(|tx| {
            for ((id, doc), vector) in chunk.iter().zip(vectors.iter()) {
                tx.conn_ref()
                    .execute(
                        &format!(
                            "INSERT INTO {table} ({key}, document, embedding, model, indexed_at)
                             VALUES (?1, ?2, ?3, ?4, datetime('now'))
                             ON CONFLICT({key}) DO UPDATE SET
                                document = excluded.document,
                                embedding = excluded.embedding,
                                model = excluded.model,
                                indexed_at = excluded.indexed_at",
                            table = collection.table(),
                            key = collection.key_column(),
                        ),
                        params![id, doc, f32_vec_to_blob(vector), model],
                    )
                    .map_err(|e| format!("Failed to index document {id}: {e}"))?;
            }
            Ok(())
        })?;
        indexed += chunk.len();
    }

    log::info!(
        "Reindexed {} documents into {} with model {}",
        indexed,
        collection.table(),
        model
    );
    Ok(indexed)
}

/// Embed the query text and return the top-K matches by cosine similarity.
pub fn query(
    db: &ArchiveDb,
    embedder: &Embedder,
    collection: Collection,
    text: &str,
    k: usize,
) -> Result<Vec<SearchHit>, String> {
    let needle = embedder.embed(text)?;

    let mut stmt = db
        .conn_ref()
        .prepare(&format!(
            "SELECT {key}, document, embedding FROM {table}",
            key = collection.key_column(),
            table = collection.table(),
        ))
        .map_err(|e| format!("Failed to prepare index query: {e}"))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })
        .map_err(|e| format!("Failed to scan index: {e}"))?;

    let mut hits = Vec::new();
    for row in rows {
        let (id, document, blob) = row.map_err(|e| format!("Failed to read index row: {e}"))?;
        let vector = blob_to_f32_vec(&blob)?;
        hits.push(SearchHit {
            id,
            score: cosine_similarity(&needle, &vector),
            document,
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    Ok(hits)
}

/// Row counts for both collections against their source tables.
pub fn status(db: &ArchiveDb, embedder: &Embedder) -> Result<IndexStatus, String> {
    let count = |sql: &str| -> Result<i64, String> {
        db.conn_ref()
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| format!("Failed to count rows: {e}"))
    };

    Ok(IndexStatus {
        emails_total: count("SELECT COUNT(*) FROM emails")?,
        emails_indexed: count("SELECT COUNT(*) FROM email_embeddings")?,
        invoices_total: count("SELECT COUNT(*) FROM parsed_invoices")?,
        invoices_indexed: count("SELECT COUNT(*) FROM invoice_embeddings")?,
        model: embedder.model_tag().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::NewEmail;

    fn seed_email(db: &ArchiveDb, message_id: &str, subject: &str, body: &str) -> i64 {
        db.insert_email(&NewEmail {
            message_id: Some(message_id.to_string()),
            subject: Some(subject.to_string()),
            body_text: Some(body.to_string()),
            folder: "INBOX".to_string(),
            ..Default::default()
        })
        .expect("insert")
        .expect("new row")
    }

    #[test]
    fn test_reindexed_email_surfaces_itself() {
        let db = test_db();
        let embedder = Embedder::hashed();

        let target = seed_email(
            &db,
            "m1@x",
            "Thermal roll production schedule",
            "Production of thermal rolls starts next week.",
        );
        seed_email(
            &db,
            "m2@x",
            "Office party",
            "Snacks in the kitchen on Friday.",
        );

        let indexed = reindex_emails(&db, &embedder).expect("reindex");
        assert_eq!(indexed, 2);

        let hits = query(
            &db,
            &embedder,
            Collection::Emails,
            "Thermal roll production schedule",
            1,
        )
        .expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, target, "an email must surface for its own subject");
    }

    #[test]
    fn test_reindex_upserts_by_row_id() {
        let db = test_db();
        let embedder = Embedder::hashed();
        seed_email(&db, "m1@x", "Subject", "Body");

        reindex_emails(&db, &embedder).expect("first");
        reindex_emails(&db, &embedder).expect("second");

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM email_embeddings", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1, "reindex upserts rather than duplicating");
    }

    #[test]
    fn test_status_reports_drift() {
        let db = test_db();
        let embedder = Embedder::hashed();
        seed_email(&db, "m1@x", "One", "Body");
        reindex_emails(&db, &embedder).expect("reindex");
        seed_email(&db, "m2@x", "Two", "Body");

        let status = status(&db, &embedder).expect("status");
        assert_eq!(status.emails_total, 2);
        assert_eq!(status.emails_indexed, 1);
        assert_eq!(status.invoices_indexed, 0);
    }

    #[test]
    fn test_query_on_empty_collection() {
        let db = test_db();
        let embedder = Embedder::hashed();
        let hits = query(&db, &embedder, Collection::Invoices, "anything", 5).expect("query");
        assert!(hits.is_empty());
    }
}
