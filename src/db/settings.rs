use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // App settings
    // =========================================================================

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, String> {
        self.conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to read setting {key}: {e}"))
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO app_settings (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![key, value, now_string()],
            )
            .map_err(|e| format!("Failed to write setting {key}: {e}"))?;
        Ok(())
    }
}
