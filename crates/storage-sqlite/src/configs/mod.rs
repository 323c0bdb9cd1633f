//! SQLite storage implementation for AI configurations.

mod model;
mod repository;

pub use model::AiConfigDB;
pub use repository::AiConfigRepository;
