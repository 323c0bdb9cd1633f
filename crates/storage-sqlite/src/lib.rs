//! SQLite storage implementation for SmartDecision.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `smartdecision-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The single-writer actor every write goes through
//! - Repository implementations for configs, sessions and the knowledge base
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod configs;
pub mod knowledge;
pub mod sessions;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};
pub use errors::{IntoCore, StorageError};

pub use configs::AiConfigRepository;
pub use knowledge::KnowledgeRepository;
pub use sessions::SessionRepository;

// Re-export from smartdecision-core for convenience
pub use smartdecision_core::errors::{DatabaseError, Error, Result};
