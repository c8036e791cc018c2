//! IMAP mail archiver.
//!
//! Connects over TLS, fetches the newest messages from a folder, and persists
//! them: the email row (deduplicated on Message-ID), attachment files under
//! `attachments/YYYY-MM/`, and parsed invoice fields for PDF attachments.
//!
//! The network session and the persistence path are split so the latter can be
//! exercised against raw RFC822 bytes without a server.

use std::net::TcpStream;
use std::path::{Path, PathBuf};

use chrono::Utc;
use imap::Session;
use mail_parser::{HeaderValue, Message, MimeHeaders};
use native_tls::{TlsConnector, TlsStream};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db::{ArchiveDb, NewAttachment, NewEmail};
use crate::error::ArchiveError;
use crate::extract::{self, SupportedFormat};
use crate::parser;

/// Outcome of one download run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub archived: usize,
    pub skipped: usize,
    pub attachments: usize,
    pub invoices: usize,
}

/// Outcome of persisting a single raw message.
#[derive(Debug)]
pub enum PersistOutcome {
    Archived {
        email_id: i64,
        attachments: usize,
        invoices: usize,
    },
    Duplicate,
}

fn connect(config: &Config) -> Result<Session<TlsStream<TcpStream>>, ArchiveError> {
    let account = config
        .imap_email
        .clone()
        .ok_or_else(|| ArchiveError::Connection("IMAP_EMAIL is not configured".to_string()))?;
    let password = config
        .imap_password
        .clone()
        .ok_or_else(|| ArchiveError::Connection("IMAP_PASSWORD is not configured".to_string()))?;

    let tls = TlsConnector::builder()
        .build()
        .map_err(|e| ArchiveError::Connection(e.to_string()))?;

    let client = imap::connect(
        (config.imap_server.as_str(), config.imap_port),
        &config.imap_server,
        &tls,
    )
    .map_err(|e| ArchiveError::Connection(e.to_string()))?;

    client.login(&account, &password).map_err(|e| ArchiveError::Auth {
        account,
        reason: e.0.to_string(),
    })
}

/// Download the newest `limit` messages from `folder` and archive them.
pub fn download_mailbox(
    db: &ArchiveDb,
    config: &Config,
    folder: &str,
    limit: usize,
) -> Result<SyncReport, ArchiveError> {
    let mut session = connect(config)?;

    session
        .select(folder)
        .map_err(|e| ArchiveError::Protocol(format!("SELECT {folder} failed: {e}")))?;

    let ids = session
        .search("ALL")
        .map_err(|e| ArchiveError::Protocol(format!("SEARCH failed: {e}")))?;

    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable();
    let newest: Vec<u32> = ids.into_iter().rev().take(limit).collect();

    log::info!(
        "Fetching {} of the newest messages from {}/{}",
        newest.len(),
        config.imap_server,
        folder
    );

    let mut report = SyncReport::default();
    for id in newest {
        let messages = session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| ArchiveError::Protocol(format!("FETCH {id} failed: {e}")))?;

        for fetched in messages.iter() {
            let Some(raw) = fetched.body() else {
                log::warn!("Message {id} came back without a body, skipping");
                continue;
            };
            report.fetched += 1;

            match persist_message(db, &config.attachments_dir(), raw, folder) {
                Ok(PersistOutcome::Archived {
                    email_id,
                    attachments,
                    invoices,
                }) => {
                    report.archived += 1;
                    report.attachments += attachments;
                    report.invoices += invoices;
                    log::debug!("Archived message {id} as email {email_id}");
                }
                Ok(PersistOutcome::Duplicate) => report.skipped += 1,
                Err(e) => {
                    // One bad message shouldn't sink the whole run
                    log::warn!("Failed to persist message {id}: {e}");
                }
            }
        }
    }

    let _ = session.logout();

    log::info!(
        "Download finished: {} archived, {} duplicates, {} attachments, {} invoices",
        report.archived,
        report.skipped,
        report.attachments,
        report.invoices
    );
    Ok(report)
}

/// Persist one raw RFC822 message: email row, attachments, invoice fields.
pub fn persist_message(
    db: &ArchiveDb,
    attachments_dir: &Path,
    raw: &[u8],
    folder: &str,
) -> Result<PersistOutcome, ArchiveError> {
    let msg = Message::parse(raw)
        .ok_or_else(|| ArchiveError::Parse("not a parseable MIME message".to_string()))?;

    let date_received = msg
        .date()
        .and_then(|d| chrono::DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now)
        .to_rfc3339();

    let email = NewEmail {
        message_id: msg.message_id().map(|s| s.to_string()),
        subject: msg.subject().map(|s| s.to_string()),
        from_address: format_address(msg.from()),
        to_address: format_address(msg.to()),
        date_received: Some(date_received.clone()),
        body_text: msg.body_text(0).map(|s| s.to_string()),
        body_html: msg.body_html(0).map(|s| s.to_string()),
        headers: Some(headers_json(&msg)),
        folder: folder.to_string(),
    };

    let Some(email_id) = db.insert_email(&email).map_err(ArchiveError::Database)? else {
        return Ok(PersistOutcome::Duplicate);
    };

    // "2025-06" bucket from the received date
    let month = &date_received[..7.min(date_received.len())];

    let mut attachments = 0usize;
    let mut invoices = 0usize;
    for part in msg.attachments() {
        let Some(name) = part.attachment_name() else {
            continue;
        };
        let data = part.contents();
        if data.is_empty() {
            continue;
        }

        let content_type = part.content_type().map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        });

        let saved = save_attachment(
            db,
            attachments_dir,
            email_id,
            month,
            name,
            content_type.as_deref(),
            data,
        )?;
        attachments += 1;

        if parse_invoice_attachment(db, saved.0, email_id, &saved.1)? {
            invoices += 1;
        }
    }

    Ok(PersistOutcome::Archived {
        email_id,
        attachments,
        invoices,
    })
}

/// Write attachment bytes to disk and record the row.
/// Returns (attachment row id, saved path).
fn save_attachment(
    db: &ArchiveDb,
    attachments_dir: &Path,
    email_id: i64,
    month: &str,
    name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<(i64, PathBuf), ArchiveError> {
    let dir = attachments_dir.join(month);
    std::fs::create_dir_all(&dir)?;

    let hash = Sha256::digest(data);
    let hash8 = &hex::encode(hash)[..8];

    let sanitized = sanitize_filename(name);
    let (stem, ext) = split_filename(&sanitized);
    let path = dir.join(format!("{stem}_{hash8}{ext}"));

    // Same content-hash suffix means same bytes; no point rewriting
    if !path.exists() {
        std::fs::write(&path, data)?;
    }

    let id = db
        .insert_attachment(&NewAttachment {
            email_id,
            filename: sanitized,
            content_type: content_type.map(|s| s.to_string()),
            size: data.len() as i64,
            file_path: path.to_string_lossy().into_owned(),
            file_hash: hash8.to_string(),
        })
        .map_err(ArchiveError::Database)?;

    Ok((id, path))
}

/// Run the invoice parser over a freshly saved PDF attachment.
/// Returns true when an invoice row was stored.
fn parse_invoice_attachment(
    db: &ArchiveDb,
    attachment_id: i64,
    email_id: i64,
    path: &Path,
) -> Result<bool, ArchiveError> {
    if SupportedFormat::detect(path) != Some(SupportedFormat::Pdf) {
        return Ok(false);
    }

    let text = match extract::extract_text(path) {
        Ok(text) => text,
        Err(e) => {
            // Scanned PDFs without a text layer land here
            log::warn!("Text extraction failed for {}: {e}", path.display());
            return Ok(false);
        }
    };

    let Some(parsed) = parser::parse_invoice_text(&text) else {
        return Ok(false);
    };

    let stored = db
        .store_parsed_invoice(attachment_id, email_id, &parsed, parser::clip_raw_text(&text))
        .map_err(ArchiveError::Database)?;

    if stored.is_some() {
        log::info!(
            "Parsed invoice {:?}, amount {:?} {:?}",
            parsed.invoice_number,
            parsed.currency,
            parsed.amount
        );
    }
    Ok(stored.is_some())
}

fn format_address(value: &HeaderValue) -> Option<String> {
    match value {
        HeaderValue::Address(addr) => {
            let address = addr.address.as_deref().unwrap_or("");
            if address.is_empty() {
                return None;
            }
            Some(match addr.name.as_deref() {
                Some(name) if !name.is_empty() => format!("{name} <{address}>"),
                _ => address.to_string(),
            })
        }
        HeaderValue::AddressList(addrs) => {
            let parts: Vec<String> = addrs
                .iter()
                .filter_map(|addr| {
                    let address = addr.address.as_deref()?;
                    Some(match addr.name.as_deref() {
                        Some(name) if !name.is_empty() => format!("{name} <{address}>"),
                        _ => address.to_string(),
                    })
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

fn headers_json(msg: &Message) -> String {
    let mut map = serde_json::Map::new();
    for header in msg.headers() {
        if let Some(text) = header.value().as_text_ref() {
            map.insert(
                header.name().to_string(),
                serde_json::Value::String(text.to_string()),
            );
        }
    }
    serde_json::Value::Object(map).to_string()
}

/// Strip filesystem-hostile characters from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

fn split_filename(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], name[idx..].to_string()),
        _ => (name, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    fn raw_message(message_id: &str) -> Vec<u8> {
        format!(
            "Message-ID: <{message_id}>\r\n\
             From: Ana Pop <ana@acmelabels.ro>\r\n\
             To: office@example.com\r\n\
             Subject: Invoice 42\r\n\
             Date: Mon, 02 Jun 2025 10:00:00 +0000\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
             \r\n\
             --sep\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             Please find the order confirmation attached.\r\n\
             --sep\r\n\
             Content-Type: text/plain; name=\"note.txt\"\r\n\
             Content-Disposition: attachment; filename=\"note.txt\"\r\n\
             \r\n\
             Order ref 2025/118, 500 rolls.\r\n\
             --sep--\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn test_persist_twice_archives_once() {
        let db = test_db();
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = raw_message("m1@acme");

        let first = persist_message(&db, dir.path(), &raw, "INBOX").expect("persist");
        assert!(matches!(
            first,
            PersistOutcome::Archived { attachments: 1, .. }
        ));

        let second = persist_message(&db, dir.path(), &raw, "INBOX").expect("persist");
        assert!(matches!(second, PersistOutcome::Duplicate));

        let emails: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
            .expect("count");
        assert_eq!(emails, 1);

        // Duplicate run must not duplicate attachments either
        let attachments: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM attachments", [], |row| row.get(0))
            .expect("count");
        assert_eq!(attachments, 1);
    }

    #[test]
    fn test_persisted_fields() {
        let db = test_db();
        let dir = tempfile::tempdir().expect("tempdir");
        persist_message(&db, dir.path(), &raw_message("m2@acme"), "INBOX").expect("persist");

        let email = db.get_email(1).expect("fetch").expect("present");
        assert_eq!(email.subject.as_deref(), Some("Invoice 42"));
        assert_eq!(
            email.from_address.as_deref(),
            Some("Ana Pop <ana@acmelabels.ro>")
        );
        assert_eq!(email.folder.as_deref(), Some("INBOX"));
        assert!(email
            .body_text
            .as_deref()
            .unwrap_or("")
            .contains("order confirmation"));
        assert!(email.date_received.as_deref().unwrap_or("").starts_with("2025-06-02"));
    }

    #[test]
    fn test_attachment_saved_under_month_bucket_with_hash() {
        let db = test_db();
        let dir = tempfile::tempdir().expect("tempdir");
        persist_message(&db, dir.path(), &raw_message("m3@acme"), "INBOX").expect("persist");

        let atts = db.attachments_for_email(1).expect("attachments");
        assert_eq!(atts.len(), 1);

        let path = PathBuf::from(atts[0].file_path.as_deref().expect("path"));
        assert!(path.exists(), "attachment bytes should be on disk");
        assert!(path.parent().map(|p| p.ends_with("2025-06")).unwrap_or(false));

        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        let hash = atts[0].file_hash.as_deref().expect("hash");
        assert_eq!(hash.len(), 8);
        assert_eq!(name, format!("note_{hash}.txt"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("fact/ura: <june>.pdf"),
            "fact_ura_ _june_.pdf"
        );
        assert_eq!(sanitize_filename("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn test_unparseable_bytes_error() {
        let db = test_db();
        let dir = tempfile::tempdir().expect("tempdir");
        let result = persist_message(&db, dir.path(), &[], "INBOX");
        assert!(result.is_err());
    }
}
