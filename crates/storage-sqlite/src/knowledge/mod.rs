//! SQLite storage implementation for the knowledge base.

mod model;
mod repository;

pub use model::{KnowledgeChunkDB, KnowledgeFileDB};
pub use repository::KnowledgeRepository;
