pub mod attachments;
pub mod chat;
pub mod documents;
pub mod emails;
pub mod entities;
pub mod invoices;
pub mod production;
pub mod search;
pub mod settings;
pub mod sync;
