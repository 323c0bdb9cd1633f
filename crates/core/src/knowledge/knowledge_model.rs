//! Knowledge domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Ingestion status of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl KnowledgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeStatus::Pending => "pending",
            KnowledgeStatus::Processing => "processing",
            KnowledgeStatus::Completed => "completed",
            KnowledgeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for KnowledgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(KnowledgeStatus::Pending),
            "processing" => Ok(KnowledgeStatus::Processing),
            "completed" => Ok(KnowledgeStatus::Completed),
            "failed" => Ok(KnowledgeStatus::Failed),
            other => Err(Error::Unexpected(format!(
                "Unknown knowledge status: {}",
                other
            ))),
        }
    }
}

/// Domain model of an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeFile {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    /// Location inside the file store; never derived from `file_name`.
    #[serde(skip_serializing, default)]
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: KnowledgeStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for registering an upload; it starts out `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewKnowledgeFile {
    pub user_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
}

/// A slice of a document's text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub id: String,
    pub file_id: String,
    pub chunk_index: i32,
    pub content: String,
    /// Opaque embedding bytes; empty until an embedding backend exists.
    #[serde(skip_serializing, default)]
    pub embedding: Vec<u8>,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewKnowledgeChunk {
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vec<u8>,
    pub metadata: String,
}

impl NewKnowledgeChunk {
    /// Builds the chunk list for a file, tagging each piece with its source.
    pub fn from_pieces(file_name: &str, pieces: Vec<String>) -> Vec<NewKnowledgeChunk> {
        let metadata = serde_json::json!({ "source": file_name }).to_string();
        pieces
            .into_iter()
            .enumerate()
            .map(|(idx, content)| NewKnowledgeChunk {
                chunk_index: idx as i32,
                content,
                embedding: Vec::new(),
                metadata: metadata.clone(),
            })
            .collect()
    }
}

/// A file together with the number of chunks stored for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeFileDetail {
    #[serde(flatten)]
    pub file: KnowledgeFile,
    pub chunk_count: i64,
}
