use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // Attachments
    // =========================================================================

    /// Record a saved attachment. Returns the new row id.
    pub fn insert_attachment(&self, att: &NewAttachment) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO attachments (email_id, filename, content_type, size, file_path, file_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    att.email_id,
                    att.filename,
                    att.content_type,
                    att.size,
                    att.file_path,
                    att.file_hash,
                ],
            )
            .map_err(|e| format!("Failed to record attachment {}: {e}", att.filename))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch attachment metadata by row id.
    pub fn get_attachment(&self, id: i64) -> Result<Option<DbAttachment>, String> {
        self.conn
            .query_row(
                "SELECT id, email_id, filename, content_type, size, file_path, file_hash, created_at
                 FROM attachments WHERE id = ?1",
                params![id],
                map_attachment_row,
            )
            .optional()
            .map_err(|e| format!("Failed to fetch attachment {id}: {e}"))
    }

    /// Attachments belonging to one email.
    pub fn attachments_for_email(&self, email_id: i64) -> Result<Vec<DbAttachment>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, email_id, filename, content_type, size, file_path, file_hash, created_at
                 FROM attachments WHERE email_id = ?1 ORDER BY id",
            )
            .map_err(|e| format!("Failed to prepare attachments query: {e}"))?;

        let rows = stmt
            .query_map(params![email_id], map_attachment_row)
            .map_err(|e| format!("Failed to query attachments: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read attachment row: {e}"))?);
        }
        Ok(results)
    }

    /// All attachments, newest first, capped by `limit`.
    pub fn list_attachments(&self, limit: i64) -> Result<Vec<DbAttachment>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, email_id, filename, content_type, size, file_path, file_hash, created_at
                 FROM attachments ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare attachment listing: {e}"))?;

        let rows = stmt
            .query_map(params![limit], map_attachment_row)
            .map_err(|e| format!("Failed to list attachments: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read attachment row: {e}"))?);
        }
        Ok(results)
    }
}

fn map_attachment_row(row: &rusqlite::Row) -> rusqlite::Result<DbAttachment> {
    Ok(DbAttachment {
        id: row.get(0)?,
        email_id: row.get(1)?,
        filename: row.get(2)?,
        content_type: row.get(3)?,
        size: row.get(4)?,
        file_path: row.get(5)?,
        file_hash: row.get(6)?,
        created_at: row.get(7)?,
    })
}
