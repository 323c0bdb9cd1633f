use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use smartdecision_core::errors::{Error, Result};
use smartdecision_core::knowledge::{
    KnowledgeChunk, KnowledgeFile, KnowledgeRepositoryTrait, KnowledgeStatus, NewKnowledgeChunk,
    NewKnowledgeFile,
};

use super::model::{KnowledgeChunkDB, KnowledgeFileDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{knowledge_chunks, knowledge_files};
use crate::utils::{chunk_for_sqlite, format_timestamp};

/// Rows per multi-row INSERT; seven columns each keeps well under SQLite's
/// parameter limit.
const CHUNK_INSERT_BATCH: usize = 100;

pub struct KnowledgeRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl KnowledgeRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        KnowledgeRepository { pool, writer }
    }

    async fn set_status(&self, file_id: &str, status: KnowledgeStatus) -> Result<usize> {
        let file_id = file_id.to_string();
        let now = format_timestamp(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::update(knowledge_files::table.find(&file_id))
                    .set((
                        knowledge_files::status.eq(status.as_str()),
                        knowledge_files::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}

#[async_trait]
impl KnowledgeRepositoryTrait for KnowledgeRepository {
    fn get_file(&self, file_id: &str) -> Result<KnowledgeFile> {
        let mut conn = get_connection(&self.pool)?;
        knowledge_files::table
            .find(file_id)
            .select(KnowledgeFileDB::as_select())
            .first::<KnowledgeFileDB>(&mut conn)
            .optional()
            .into_core()?
            .map(KnowledgeFile::from)
            .ok_or_else(|| Error::not_found(format!("Knowledge file {}", file_id)))
    }

    fn list_files(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<KnowledgeFile>, i64)> {
        let mut conn = get_connection(&self.pool)?;
        let total = knowledge_files::table
            .filter(knowledge_files::user_id.eq(user_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .into_core()?;
        let rows = knowledge_files::table
            .filter(knowledge_files::user_id.eq(user_id))
            .order((knowledge_files::created_at.desc(), knowledge_files::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(KnowledgeFileDB::as_select())
            .load::<KnowledgeFileDB>(&mut conn)
            .into_core()?;
        Ok((rows.into_iter().map(KnowledgeFile::from).collect(), total))
    }

    fn list_files_by_status(&self, status: KnowledgeStatus) -> Result<Vec<KnowledgeFile>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = knowledge_files::table
            .filter(knowledge_files::status.eq(status.as_str()))
            .order(knowledge_files::created_at.asc())
            .select(KnowledgeFileDB::as_select())
            .load::<KnowledgeFileDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(KnowledgeFile::from).collect())
    }

    fn count_chunks(&self, file_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        knowledge_chunks::table
            .filter(knowledge_chunks::file_id.eq(file_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .into_core()
    }

    fn get_retrievable_chunks(
        &self,
        user_id: &str,
        file_ids: &[String],
    ) -> Result<Vec<KnowledgeChunk>> {
        let mut conn = get_connection(&self.pool)?;
        let mut chunks = Vec::new();
        for ids in chunk_for_sqlite(file_ids) {
            let rows = knowledge_chunks::table
                .inner_join(knowledge_files::table)
                .filter(knowledge_files::user_id.eq(user_id))
                .filter(knowledge_files::status.eq(KnowledgeStatus::Completed.as_str()))
                .filter(knowledge_chunks::file_id.eq_any(ids))
                .order((
                    knowledge_chunks::file_id.asc(),
                    knowledge_chunks::chunk_index.asc(),
                ))
                .select(KnowledgeChunkDB::as_select())
                .load::<KnowledgeChunkDB>(&mut conn)
                .into_core()?;
            chunks.extend(rows.into_iter().map(KnowledgeChunk::from));
        }
        Ok(chunks)
    }

    async fn create_file(&self, new_file: NewKnowledgeFile) -> Result<KnowledgeFile> {
        let row = KnowledgeFileDB::from_new(new_file, &format_timestamp(Utc::now()));
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<KnowledgeFile> {
                diesel::insert_into(knowledge_files::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row.into())
            })
            .await
    }

    async fn claim_for_processing(&self, file_id: &str) -> Result<bool> {
        let file_id = file_id.to_string();
        let now = format_timestamp(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let claimed = diesel::update(
                    knowledge_files::table
                        .filter(knowledge_files::id.eq(&file_id))
                        .filter(knowledge_files::status.eq(KnowledgeStatus::Pending.as_str())),
                )
                .set((
                    knowledge_files::status.eq(KnowledgeStatus::Processing.as_str()),
                    knowledge_files::updated_at.eq(&now),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(claimed == 1)
            })
            .await
    }

    async fn complete_ingestion(
        &self,
        file_id: &str,
        chunks: Vec<NewKnowledgeChunk>,
    ) -> Result<usize> {
        let file_id = file_id.to_string();
        let now = format_timestamp(Utc::now());
        let rows: Vec<KnowledgeChunkDB> = chunks
            .into_iter()
            .map(|chunk| KnowledgeChunkDB::from_new(&file_id, chunk, &now))
            .collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(
                    knowledge_chunks::table.filter(knowledge_chunks::file_id.eq(&file_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                for batch in rows.chunks(CHUNK_INSERT_BATCH) {
                    diesel::insert_into(knowledge_chunks::table)
                        .values(batch)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                // A file deleted mid-ingestion rolls the chunks back.
                let updated = diesel::update(knowledge_files::table.find(&file_id))
                    .set((
                        knowledge_files::status.eq(KnowledgeStatus::Completed.as_str()),
                        knowledge_files::processed_at.eq(&now),
                        knowledge_files::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(Error::not_found(format!("Knowledge file {}", file_id)));
                }
                debug!("Stored {} chunks for file {}", rows.len(), file_id);
                Ok(rows.len())
            })
            .await
    }

    async fn mark_failed(&self, file_id: &str) -> Result<()> {
        self.set_status(file_id, KnowledgeStatus::Failed).await?;
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<usize> {
        let file_id = file_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(
                    knowledge_chunks::table.filter(knowledge_chunks::file_id.eq(&file_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(diesel::delete(knowledge_files::table.find(&file_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
