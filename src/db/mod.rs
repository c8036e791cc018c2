//! SQLite-backed archive store.
//!
//! One database file holds everything: archived mail, attachment metadata,
//! parsed invoices, organization metadata, production tracking, settings, and
//! the semantic-index vectors. The filesystem only carries attachment bytes;
//! all queryable state lives here.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::Connection;

use crate::config::Config;

pub mod types;
pub use types::*;

mod attachments;
mod documents;
mod emails;
mod invoices;
mod organizations;
mod production;
mod settings;

pub use documents::DocumentKind;
pub use production::ClientDeleteOutcome;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to create data directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub struct ArchiveDb {
    conn: Connection,
}

impl ArchiveDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Self) -> Result<T, String>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| format!("Failed to begin transaction: {e}"))?;
        match f(self) {
            Ok(val) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| format!("Failed to commit transaction: {e}"))?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the configured path and apply migrations.
    pub fn open(config: &Config) -> Result<Self, DbError> {
        Self::open_at(config.db_path())
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }
}

pub(crate) fn now_string() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
pub mod test_utils {
    use super::ArchiveDb;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of the
    /// test. Test temp dirs are cleaned up by the OS. FK enforcement is
    /// disabled so that unit tests can insert rows without satisfying every
    /// foreign key constraint.
    pub fn test_db() -> ArchiveDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let db = ArchiveDb::open_at(path).expect("Failed to open test database");
        db.conn_ref()
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("disable FK for tests");
        db
    }
}

// Scope a LIKE pattern around a user-supplied term.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in ["emails", "attachments", "parsed_invoices", "clients"] {
            let count: i32 = db
                .conn_ref()
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|e| panic!("{} table should exist: {}", table, e));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let db = test_db();
        let result: Result<(), String> = db.with_transaction(|tx| {
            tx.conn_ref()
                .execute(
                    "INSERT INTO emails (message_id, subject) VALUES ('<t@x>', 'Rollback me')",
                    [],
                )
                .map_err(|e| e.to_string())?;
            Err("forced failure".to_string())
        });
        assert!(result.is_err());

        let count: i32 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "rolled-back insert should not persist");
    }
}
