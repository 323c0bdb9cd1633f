//! Database models for knowledge files and chunks.

use diesel::prelude::*;
use log::warn;
use uuid::Uuid;

use smartdecision_core::knowledge::{
    KnowledgeChunk, KnowledgeFile, KnowledgeStatus, NewKnowledgeChunk, NewKnowledgeFile,
};

use crate::schema::{knowledge_chunks, knowledge_files};
use crate::utils::parse_timestamp;

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = knowledge_files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct KnowledgeFileDB {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: String,
    pub processed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Identifiable, Insertable, Associations, Selectable, PartialEq, Debug, Clone)]
#[diesel(belongs_to(KnowledgeFileDB, foreign_key = file_id))]
#[diesel(table_name = knowledge_chunks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct KnowledgeChunkDB {
    pub id: String,
    pub file_id: String,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vec<u8>,
    pub metadata: String,
    pub created_at: String,
}

impl KnowledgeFileDB {
    /// A freshly uploaded file, always `pending`.
    pub fn from_new(new_file: NewKnowledgeFile, now: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: new_file.user_id,
            file_name: new_file.file_name,
            file_path: new_file.file_path,
            file_size: new_file.file_size,
            file_type: new_file.file_type,
            status: KnowledgeStatus::Pending.as_str().to_string(),
            processed_at: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

impl KnowledgeChunkDB {
    pub fn from_new(file_id: &str, chunk: NewKnowledgeChunk, now: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_id: file_id.to_string(),
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            embedding: chunk.embedding,
            metadata: chunk.metadata,
            created_at: now.to_string(),
        }
    }
}

impl From<KnowledgeFileDB> for KnowledgeFile {
    fn from(db: KnowledgeFileDB) -> Self {
        let status = db.status.parse::<KnowledgeStatus>().unwrap_or_else(|e| {
            warn!("Knowledge file {} has an invalid status: {}", db.id, e);
            KnowledgeStatus::Failed
        });
        Self {
            id: db.id,
            user_id: db.user_id,
            file_name: db.file_name,
            file_path: db.file_path,
            file_size: db.file_size,
            file_type: db.file_type,
            status,
            processed_at: db.processed_at.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&db.created_at),
            updated_at: parse_timestamp(&db.updated_at),
        }
    }
}

impl From<KnowledgeChunkDB> for KnowledgeChunk {
    fn from(db: KnowledgeChunkDB) -> Self {
        Self {
            id: db.id,
            file_id: db.file_id,
            chunk_index: db.chunk_index,
            content: db.content,
            embedding: db.embedding,
            metadata: db.metadata,
            created_at: parse_timestamp(&db.created_at),
        }
    }
}
