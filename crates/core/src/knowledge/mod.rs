//! Knowledge module - uploaded documents, their chunks, and the ingestion pool.

mod chunker;
mod file_store;
mod ingestion;
mod knowledge_constants;
mod knowledge_model;
mod knowledge_service;
mod knowledge_traits;

pub use chunker::chunk_text;
pub use file_store::{FileStore, LocalFileStore};
pub use ingestion::{IngestionConfig, IngestionPool};
pub use knowledge_constants::*;
pub use knowledge_model::{
    KnowledgeChunk, KnowledgeFile, KnowledgeFileDetail, KnowledgeStatus, NewKnowledgeChunk,
    NewKnowledgeFile,
};
pub use knowledge_service::KnowledgeService;
pub use knowledge_traits::{KnowledgeRepositoryTrait, KnowledgeServiceTrait};
