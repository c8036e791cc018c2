pub mod archiver;
pub mod chat;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod index;
mod migrations;
pub mod parser;
pub mod server;
pub mod state;
