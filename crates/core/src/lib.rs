//! SmartDecision Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic of the chat engine: AI
//! configurations, chat sessions, and the knowledge base. It is
//! database-agnostic and defines repository traits that are implemented
//! by the `storage-sqlite` crate.

pub mod configs;
pub mod errors;
pub mod knowledge;
pub mod pagination;
pub mod sessions;

// Re-export error types
pub use errors::Error;
pub use errors::ErrorKind;
pub use errors::Result;
