use crate::errors::Result;
use crate::knowledge::knowledge_model::{
    KnowledgeChunk, KnowledgeFile, KnowledgeFileDetail, KnowledgeStatus, NewKnowledgeChunk,
    NewKnowledgeFile,
};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;

/// Trait for knowledge repository operations.
#[async_trait]
pub trait KnowledgeRepositoryTrait: Send + Sync {
    /// Returns `DatabaseError::NotFound` when absent.
    fn get_file(&self, file_id: &str) -> Result<KnowledgeFile>;

    /// Files of a user, newest first, with the total count.
    fn list_files(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<KnowledgeFile>, i64)>;

    fn list_files_by_status(&self, status: KnowledgeStatus) -> Result<Vec<KnowledgeFile>>;

    fn count_chunks(&self, file_id: &str) -> Result<i64>;

    /// Chunks of those `file_ids` that belong to `user_id` and are completed,
    /// ordered by file then chunk index.
    fn get_retrievable_chunks(
        &self,
        user_id: &str,
        file_ids: &[String],
    ) -> Result<Vec<KnowledgeChunk>>;

    async fn create_file(&self, new_file: NewKnowledgeFile) -> Result<KnowledgeFile>;

    /// Moves a `pending` file to `processing`. Returns false when the file was
    /// not pending, so only one caller ever wins the claim.
    async fn claim_for_processing(&self, file_id: &str) -> Result<bool>;

    /// Stores the chunks and marks the file `completed` in one transaction.
    async fn complete_ingestion(
        &self,
        file_id: &str,
        chunks: Vec<NewKnowledgeChunk>,
    ) -> Result<usize>;

    async fn mark_failed(&self, file_id: &str) -> Result<()>;

    /// Deletes chunks and the file row in one transaction.
    async fn delete_file(&self, file_id: &str) -> Result<usize>;
}

/// Trait for knowledge service operations.
#[async_trait]
pub trait KnowledgeServiceTrait: Send + Sync {
    /// Validates and stores an upload, then schedules its ingestion without
    /// waiting for it.
    async fn upload_file(
        &self,
        user_id: &str,
        file_name: &str,
        declared_size: u64,
        content: Vec<u8>,
    ) -> Result<KnowledgeFile>;

    fn list_files(&self, user_id: &str, page: PageRequest) -> Result<Page<KnowledgeFile>>;

    fn get_file(&self, user_id: &str, file_id: &str) -> Result<KnowledgeFileDetail>;

    /// Concatenated chunk text of the owned, completed files among `file_ids`.
    /// Other ids are skipped silently.
    fn retrieve(&self, user_id: &str, file_ids: &[String]) -> Result<String>;

    async fn delete_file(&self, user_id: &str, file_id: &str) -> Result<()>;

    /// Re-queues files left `pending` and fails files left `processing` by a
    /// previous run. Returns the number of re-queued files.
    async fn resume_ingestion(&self) -> Result<usize>;
}
