use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // Emails
    // =========================================================================

    /// Archive an email. Deduplicates on `message_id` via INSERT OR IGNORE.
    ///
    /// Returns `Some(row_id)` when a new row was inserted, `None` when the
    /// message was already archived.
    pub fn insert_email(&self, email: &NewEmail) -> Result<Option<i64>, String> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO emails (
                    message_id, subject, from_address, to_address, date_received,
                    body_text, body_html, headers, folder
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    email.message_id,
                    email.subject,
                    email.from_address,
                    email.to_address,
                    email.date_received,
                    email.body_text,
                    email.body_html,
                    email.headers,
                    email.folder,
                ],
            )
            .map_err(|e| format!("Failed to archive email: {e}"))?;

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Look up an archived email's row id by message id.
    pub fn email_id_for_message(&self, message_id: &str) -> Result<Option<i64>, String> {
        self.conn
            .query_row(
                "SELECT id FROM emails WHERE message_id = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to look up message id: {e}"))
    }

    /// List archived emails, newest first, with read flag and attachment count.
    pub fn list_emails(
        &self,
        limit: i64,
        offset: i64,
        folder: Option<&str>,
    ) -> Result<Vec<EmailSummary>, String> {
        let mut sql = String::from(
            "SELECT e.id, e.subject, e.from_address, e.to_address, e.date_received, e.folder,
                    COALESCE(r.is_read, 0),
                    (SELECT COUNT(*) FROM attachments a WHERE a.email_id = e.id)
             FROM emails e
             LEFT JOIN email_read_status r ON r.email_id = e.id",
        );
        if folder.is_some() {
            sql.push_str(" WHERE e.folder = ?3");
        }
        sql.push_str(" ORDER BY e.date_received DESC LIMIT ?1 OFFSET ?2");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| format!("Failed to prepare email listing: {e}"))?;

        let mut results = Vec::new();
        if let Some(f) = folder {
            let rows = stmt
                .query_map(params![limit, offset, f], map_summary_row)
                .map_err(|e| format!("Failed to query emails: {e}"))?;
            for row in rows {
                results.push(row.map_err(|e| format!("Failed to read email row: {e}"))?);
            }
        } else {
            let rows = stmt
                .query_map(params![limit, offset], map_summary_row)
                .map_err(|e| format!("Failed to query emails: {e}"))?;
            for row in rows {
                results.push(row.map_err(|e| format!("Failed to read email row: {e}"))?);
            }
        }
        Ok(results)
    }

    /// Fetch a full email by row id.
    pub fn get_email(&self, id: i64) -> Result<Option<DbEmail>, String> {
        self.conn
            .query_row(
                "SELECT id, message_id, subject, from_address, to_address, date_received,
                        body_text, body_html, headers, folder, created_at
                 FROM emails WHERE id = ?1",
                params![id],
                map_email_row,
            )
            .optional()
            .map_err(|e| format!("Failed to fetch email {id}: {e}"))
    }

    /// Set the read flag for an email.
    pub fn set_email_read(&self, id: i64, is_read: bool) -> Result<(), String> {
        let read_at = if is_read { Some(now_string()) } else { None };
        self.conn
            .execute(
                "INSERT INTO email_read_status (email_id, is_read, read_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(email_id) DO UPDATE SET
                    is_read = excluded.is_read,
                    read_at = excluded.read_at",
                params![id, is_read as i32, read_at],
            )
            .map_err(|e| format!("Failed to set read status for {id}: {e}"))?;
        Ok(())
    }

    /// Substring search over subject, sender, and body text.
    pub fn search_emails(&self, term: &str, limit: i64) -> Result<Vec<EmailSummary>, String> {
        let pattern = like_pattern(term);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.id, e.subject, e.from_address, e.to_address, e.date_received, e.folder,
                        COALESCE(r.is_read, 0),
                        (SELECT COUNT(*) FROM attachments a WHERE a.email_id = e.id)
                 FROM emails e
                 LEFT JOIN email_read_status r ON r.email_id = e.id
                 WHERE e.subject LIKE ?1 OR e.from_address LIKE ?1 OR e.body_text LIKE ?1
                 ORDER BY e.date_received DESC
                 LIMIT ?2",
            )
            .map_err(|e| format!("Failed to prepare email search: {e}"))?;

        let rows = stmt
            .query_map(params![pattern, limit], map_summary_row)
            .map_err(|e| format!("Failed to search emails: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read email row: {e}"))?);
        }
        Ok(results)
    }

    /// Most recent full emails, for chat context assembly.
    pub fn recent_emails(&self, limit: i64) -> Result<Vec<DbEmail>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, message_id, subject, from_address, to_address, date_received,
                        body_text, body_html, headers, folder, created_at
                 FROM emails
                 ORDER BY date_received DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare recent emails query: {e}"))?;

        let rows = stmt
            .query_map(params![limit], map_email_row)
            .map_err(|e| format!("Failed to query recent emails: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read email row: {e}"))?);
        }
        Ok(results)
    }

    /// All (id, document) pairs for the email semantic collection.
    /// The document is the subject plus the text body.
    pub fn email_documents(&self) -> Result<Vec<(i64, String)>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, COALESCE(subject, ''), COALESCE(body_text, '')
                 FROM emails",
            )
            .map_err(|e| format!("Failed to prepare email documents query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let subject: String = row.get(1)?;
                let body: String = row.get(2)?;
                Ok((id, subject, body))
            })
            .map_err(|e| format!("Failed to query email documents: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, subject, body) =
                row.map_err(|e| format!("Failed to read email document: {e}"))?;
            let doc = format!("{}\n{}", subject, body).trim().to_string();
            if !doc.is_empty() {
                results.push((id, doc));
            }
        }
        Ok(results)
    }

    /// (from_address, date_received, subject, body_text) for every archived
    /// email. Feeds the contact/organization aggregation.
    pub fn contact_rows(&self) -> Result<Vec<ContactRow>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT from_address, date_received, subject, body_text
                 FROM emails
                 WHERE from_address IS NOT NULL AND from_address != ''
                 ORDER BY date_received DESC",
            )
            .map_err(|e| format!("Failed to prepare contact rows query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ContactRow {
                    from_address: row.get(0)?,
                    date_received: row.get(1)?,
                    subject: row.get(2)?,
                    body_text: row.get(3)?,
                })
            })
            .map_err(|e| format!("Failed to query contact rows: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read contact row: {e}"))?);
        }
        Ok(results)
    }

    /// Aggregate figures for the stats endpoint.
    pub fn email_stats(&self, top_n: i64) -> Result<EmailStats, String> {
        let total_emails: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
            .map_err(|e| format!("Failed to count emails: {e}"))?;

        let total_attachments: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attachments", [], |row| row.get(0))
            .map_err(|e| format!("Failed to count attachments: {e}"))?;

        let unique_senders: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT from_address) FROM emails",
                [],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to count senders: {e}"))?;

        let (earliest, latest): (Option<String>, Option<String>) = self
            .conn
            .query_row(
                "SELECT MIN(date_received), MAX(date_received) FROM emails",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| format!("Failed to read date range: {e}"))?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT from_address, COUNT(*) as n FROM emails
                 WHERE from_address IS NOT NULL
                 GROUP BY from_address ORDER BY n DESC LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare top senders query: {e}"))?;

        let rows = stmt
            .query_map(params![top_n], |row| {
                Ok(SenderCount {
                    address: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(|e| format!("Failed to query top senders: {e}"))?;

        let mut top_senders = Vec::new();
        for row in rows {
            top_senders.push(row.map_err(|e| format!("Failed to read sender row: {e}"))?);
        }

        Ok(EmailStats {
            total_emails,
            total_attachments,
            unique_senders,
            earliest,
            latest,
            top_senders,
        })
    }
}

/// Row mapper for full email SELECTs (11 columns).
fn map_email_row(row: &rusqlite::Row) -> rusqlite::Result<DbEmail> {
    Ok(DbEmail {
        id: row.get(0)?,
        message_id: row.get(1)?,
        subject: row.get(2)?,
        from_address: row.get(3)?,
        to_address: row.get(4)?,
        date_received: row.get(5)?,
        body_text: row.get(6)?,
        body_html: row.get(7)?,
        headers: row.get(8)?,
        folder: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Row mapper for listing/search SELECTs (8 columns).
fn map_summary_row(row: &rusqlite::Row) -> rusqlite::Result<EmailSummary> {
    Ok(EmailSummary {
        id: row.get(0)?,
        subject: row.get(1)?,
        from_address: row.get(2)?,
        to_address: row.get(3)?,
        date_received: row.get(4)?,
        folder: row.get(5)?,
        is_read: row.get::<_, i32>(6)? != 0,
        attachment_count: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_email(message_id: &str, subject: &str) -> NewEmail {
        NewEmail {
            message_id: Some(message_id.to_string()),
            subject: Some(subject.to_string()),
            from_address: Some("Ana Pop <ana@acmelabels.ro>".to_string()),
            to_address: Some("office@example.com".to_string()),
            date_received: Some("2025-06-01T10:00:00+00:00".to_string()),
            body_text: Some("Please find the invoice attached.".to_string()),
            body_html: None,
            headers: None,
            folder: "INBOX".to_string(),
        }
    }

    #[test]
    fn test_insert_email_dedups_on_message_id() {
        let db = test_db();
        let first = db
            .insert_email(&sample_email("<m1@acme>", "Invoice 42"))
            .expect("insert");
        assert!(first.is_some());

        let second = db
            .insert_email(&sample_email("<m1@acme>", "Invoice 42 resent"))
            .expect("insert");
        assert!(second.is_none(), "duplicate message_id should be ignored");

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_read_status_toggle() {
        let db = test_db();
        let id = db
            .insert_email(&sample_email("<m2@acme>", "Hello"))
            .expect("insert")
            .expect("new row");

        db.set_email_read(id, true).expect("mark read");
        let listed = db.list_emails(10, 0, None).expect("list");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_read);

        db.set_email_read(id, false).expect("mark unread");
        let listed = db.list_emails(10, 0, None).expect("list");
        assert!(!listed[0].is_read);
    }

    #[test]
    fn test_search_matches_subject_and_body() {
        let db = test_db();
        db.insert_email(&sample_email("<m3@acme>", "Invoice 42"))
            .expect("insert");
        db.insert_email(&sample_email("<m4@acme>", "Delivery schedule"))
            .expect("insert");

        let hits = db.search_emails("invoice", 10).expect("search");
        // Both match: one by subject, both by body text
        assert_eq!(hits.len(), 2);

        let hits = db.search_emails("schedule", 10).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject.as_deref(), Some("Delivery schedule"));
    }

    #[test]
    fn test_stats_counts() {
        let db = test_db();
        db.insert_email(&sample_email("<m5@acme>", "One"))
            .expect("insert");
        db.insert_email(&sample_email("<m6@acme>", "Two"))
            .expect("insert");

        let stats = db.email_stats(5).expect("stats");
        assert_eq!(stats.total_emails, 2);
        assert_eq!(stats.unique_senders, 1);
        assert_eq!(stats.top_senders.len(), 1);
        assert_eq!(stats.top_senders[0].count, 2);
    }
}
