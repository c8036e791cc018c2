//! Runtime configuration.
//!
//! All settings come from environment variables (a `.env` file is loaded if
//! present). Paths default to `~/.opsdesk/` so a fresh install works with
//! nothing but IMAP credentials set.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_IMAP_SERVER: &str = "mail.your-server.de";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_CHAT_API_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "sonar-pro";
pub const DEFAULT_HTTP_PORT: u16 = 5001;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root for the database and attachment files.
    pub data_dir: PathBuf,
    pub imap_server: String,
    pub imap_port: u16,
    pub imap_email: Option<String>,
    pub imap_password: Option<String>,
    pub chat_api_url: String,
    pub chat_api_key: Option<String>,
    pub chat_model: String,
    pub http_port: u16,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Self {
        // Missing .env is fine; env vars may be set directly
        let _ = dotenvy::dotenv();

        let data_dir = env::var("OPSDESK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Self {
            data_dir,
            imap_server: env::var("IMAP_SERVER")
                .unwrap_or_else(|_| DEFAULT_IMAP_SERVER.to_string()),
            imap_port: env::var("IMAP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_IMAP_PORT),
            imap_email: env::var("IMAP_EMAIL").ok().filter(|v| !v.is_empty()),
            imap_password: env::var("IMAP_PASSWORD").ok().filter(|v| !v.is_empty()),
            chat_api_url: env::var("CHAT_API_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.to_string()),
            chat_api_key: env::var("CHAT_API_KEY")
                .or_else(|_| env::var("PERPLEXITY_API_KEY"))
                .ok()
                .filter(|v| !v.is_empty()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            http_port: env::var("OPSDESK_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("archive.db")
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join("attachments")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".opsdesk")
}
