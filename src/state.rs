//! Shared application state for the HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chat::ChatRelay;
use crate::config::Config;
use crate::db::ArchiveDb;
use crate::embeddings::Embedder;

/// State shared across request handlers.
///
/// One SQLite connection behind a mutex; handlers do their DB work
/// synchronously and never hold the guard across an await point.
pub struct AppState {
    pub config: Config,
    pub db: Mutex<ArchiveDb>,
    pub embedder: Embedder,
    pub relay: ChatRelay,
    /// Guard against overlapping background syncs.
    sync_running: AtomicBool,
    /// Last message from the sync task, for the status endpoint.
    pub sync_message: Mutex<Option<String>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, db: ArchiveDb, embedder: Embedder) -> Self {
        let relay = ChatRelay::new(&config);
        Self {
            config,
            db: Mutex::new(db),
            embedder,
            relay,
            sync_running: AtomicBool::new(false),
            sync_message: Mutex::new(None),
        }
    }

    /// Try to claim the sync slot. Returns false when a sync is already running.
    pub fn try_start_sync(&self) -> bool {
        self.sync_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish_sync(&self, message: String) {
        *self.sync_message.lock() = Some(message);
        self.sync_running.store(false, Ordering::SeqCst);
    }

    pub fn sync_running(&self) -> bool {
        self.sync_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    fn test_state() -> AppState {
        let config = Config {
            data_dir: std::path::PathBuf::from("/tmp/opsdesk-test"),
            imap_server: "imap.example.com".to_string(),
            imap_port: 993,
            imap_email: None,
            imap_password: None,
            chat_api_url: "http://127.0.0.1:1/never".to_string(),
            chat_api_key: None,
            chat_model: "sonar-pro".to_string(),
            http_port: 0,
        };
        AppState::new(config, test_db(), Embedder::hashed())
    }

    #[test]
    fn test_sync_slot_is_exclusive() {
        let state = test_state();
        assert!(!state.sync_running());
        assert!(state.try_start_sync());
        assert!(state.sync_running());
        assert!(!state.try_start_sync(), "second claim must fail");

        state.finish_sync("done".to_string());
        assert!(!state.sync_running());
        assert_eq!(state.sync_message.lock().as_deref(), Some("done"));
        assert!(state.try_start_sync());
    }
}
