//! Component error types.
//!
//! The DB layer returns `Result<T, String>` with contextual messages; the
//! component boundaries (archiver, extraction, chat relay) use these enums so
//! callers can distinguish auth failures from transport failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the IMAP archiver.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IMAP connection failed: {0}")]
    Connection(String),

    #[error("IMAP login rejected for {account}: {reason}")]
    Auth { account: String, reason: String },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("Failed to parse message: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(err.to_string())
    }
}

/// Errors from attachment text extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Io(err.to_string())
    }
}

/// Errors from the chat-completion relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Chat API key not configured")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Chat API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    BadResponse(String),
}
