use super::file_store::FileStore;
use super::ingestion::IngestionPool;
use super::knowledge_constants::{ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
use super::knowledge_model::{
    KnowledgeChunk, KnowledgeFile, KnowledgeFileDetail, KnowledgeStatus, NewKnowledgeFile,
};
use super::knowledge_traits::{KnowledgeRepositoryTrait, KnowledgeServiceTrait};
use crate::errors::{Error, Result};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub struct KnowledgeService {
    repository: Arc<dyn KnowledgeRepositoryTrait>,
    file_store: Arc<dyn FileStore>,
    ingestion: IngestionPool,
}

impl KnowledgeService {
    pub fn new(
        repository: Arc<dyn KnowledgeRepositoryTrait>,
        file_store: Arc<dyn FileStore>,
        ingestion: IngestionPool,
    ) -> Self {
        KnowledgeService {
            repository,
            file_store,
            ingestion,
        }
    }

    fn owned_file(&self, user_id: &str, file_id: &str) -> Result<KnowledgeFile> {
        let file = self.repository.get_file(file_id)?;
        if file.user_id != user_id {
            return Err(Error::Forbidden(format!(
                "Knowledge file {} belongs to another user",
                file_id
            )));
        }
        Ok(file)
    }
}

/// Strips any client-supplied directories and returns `(name, extension)`.
fn validate_file_name(file_name: &str) -> Result<(String, String)> {
    let name = Path::new(file_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::invalid_input("File name is required"))?;

    let extension = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::invalid_input(format!(
            "Unsupported file type '{}', allowed: {}",
            extension,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok((name, extension))
}

fn validate_size(declared_size: u64, actual_size: u64) -> Result<()> {
    if declared_size > MAX_UPLOAD_BYTES || actual_size > MAX_UPLOAD_BYTES {
        return Err(Error::invalid_input(format!(
            "File exceeds the maximum size of {} bytes",
            MAX_UPLOAD_BYTES
        )));
    }
    Ok(())
}

#[async_trait]
impl KnowledgeServiceTrait for KnowledgeService {
    async fn upload_file(
        &self,
        user_id: &str,
        file_name: &str,
        declared_size: u64,
        content: Vec<u8>,
    ) -> Result<KnowledgeFile> {
        let (file_name, extension) = validate_file_name(file_name)?;
        validate_size(declared_size, content.len() as u64)?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.file_store.save(&stored_name, &content).await?;

        let new_file = NewKnowledgeFile {
            user_id: user_id.to_string(),
            file_name,
            file_path: file_path.clone(),
            file_size: content.len() as i64,
            file_type: extension,
        };
        let file = match self.repository.create_file(new_file).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(remove_err) = self.file_store.remove(&file_path).await {
                    warn!("Failed to remove orphaned upload {}: {}", file_path, remove_err);
                }
                return Err(e);
            }
        };

        // A file that cannot be queued stays pending and is picked up on the next start.
        if let Err(e) = self.ingestion.schedule(&file.id).await {
            error!("Failed to schedule ingestion for {}: {}", file.id, e);
        }
        info!("Uploaded knowledge file {} ({} bytes)", file.id, file.file_size);
        Ok(file)
    }

    fn list_files(&self, user_id: &str, page: PageRequest) -> Result<Page<KnowledgeFile>> {
        let (files, total) = self
            .repository
            .list_files(user_id, page.limit(), page.offset())?;
        Ok(Page::new(files, total, page))
    }

    fn get_file(&self, user_id: &str, file_id: &str) -> Result<KnowledgeFileDetail> {
        let file = self.owned_file(user_id, file_id)?;
        let chunk_count = self.repository.count_chunks(file_id)?;
        Ok(KnowledgeFileDetail { file, chunk_count })
    }

    fn retrieve(&self, user_id: &str, file_ids: &[String]) -> Result<String> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = file_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Ok(String::new());
        }

        let chunks = self.repository.get_retrievable_chunks(user_id, &ids)?;
        let mut by_file: HashMap<&str, Vec<&KnowledgeChunk>> = HashMap::new();
        for chunk in &chunks {
            by_file.entry(chunk.file_id.as_str()).or_default().push(chunk);
        }

        let mut content = String::new();
        for id in &ids {
            if let Some(file_chunks) = by_file.get_mut(id.as_str()) {
                file_chunks.sort_by_key(|c| c.chunk_index);
                for chunk in file_chunks.iter() {
                    content.push_str(&chunk.content);
                    content.push('\n');
                }
            }
        }
        debug!(
            "Retrieved {} chunks from {} requested files",
            chunks.len(),
            ids.len()
        );
        Ok(content)
    }

    async fn delete_file(&self, user_id: &str, file_id: &str) -> Result<()> {
        let file = self.owned_file(user_id, file_id)?;
        self.repository.delete_file(file_id).await?;

        // Metadata is already gone; a leftover file on disk is only logged.
        if let Err(e) = self.file_store.remove(&file.file_path).await {
            warn!(
                "Deleted knowledge file {} but could not remove {}: {}",
                file_id, file.file_path, e
            );
        }
        info!("Deleted knowledge file {}", file_id);
        Ok(())
    }

    async fn resume_ingestion(&self) -> Result<usize> {
        for file in self
            .repository
            .list_files_by_status(KnowledgeStatus::Processing)?
        {
            warn!("Ingestion of {} was interrupted, marking failed", file.id);
            self.repository.mark_failed(&file.id).await?;
        }

        let mut queued = 0;
        for file in self
            .repository
            .list_files_by_status(KnowledgeStatus::Pending)?
        {
            if self.ingestion.schedule(&file.id).await? {
                queued += 1;
            }
        }
        if queued > 0 {
            info!("Re-queued {} pending knowledge files", queued);
        }
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::knowledge::ingestion::IngestionConfig;
    use crate::knowledge::knowledge_model::NewKnowledgeChunk;
    use chrono::Utc;
    use std::sync::RwLock;
    use std::time::Duration;

    #[derive(Default)]
    struct MockKnowledgeRepository {
        files: RwLock<Vec<KnowledgeFile>>,
        chunks: RwLock<Vec<KnowledgeChunk>>,
        transitions: RwLock<Vec<(String, KnowledgeStatus)>>,
    }

    impl MockKnowledgeRepository {
        fn set_status(&self, file_id: &str, status: KnowledgeStatus) -> Result<()> {
            let mut files = self.files.write().unwrap();
            let file = files
                .iter_mut()
                .find(|f| f.id == file_id)
                .ok_or_else(|| Error::not_found(file_id.to_string()))?;
            file.status = status;
            if status == KnowledgeStatus::Completed {
                file.processed_at = Some(Utc::now());
            }
            self.transitions
                .write()
                .unwrap()
                .push((file_id.to_string(), status));
            Ok(())
        }

        fn statuses_of(&self, file_id: &str) -> Vec<KnowledgeStatus> {
            self.transitions
                .read()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == file_id)
                .map(|(_, s)| *s)
                .collect()
        }

        fn chunks_of(&self, file_id: &str) -> Vec<KnowledgeChunk> {
            self.chunks
                .read()
                .unwrap()
                .iter()
                .filter(|c| c.file_id == file_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl KnowledgeRepositoryTrait for MockKnowledgeRepository {
        fn get_file(&self, file_id: &str) -> Result<KnowledgeFile> {
            self.files
                .read()
                .unwrap()
                .iter()
                .find(|f| f.id == file_id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("Knowledge file {}", file_id)))
        }

        fn list_files(
            &self,
            user_id: &str,
            limit: i64,
            offset: i64,
        ) -> Result<(Vec<KnowledgeFile>, i64)> {
            let mut files: Vec<KnowledgeFile> = self
                .files
                .read()
                .unwrap()
                .iter()
                .filter(|f| f.user_id == user_id)
                .cloned()
                .collect();
            files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = files.len() as i64;
            Ok((
                files
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect(),
                total,
            ))
        }

        fn list_files_by_status(&self, status: KnowledgeStatus) -> Result<Vec<KnowledgeFile>> {
            Ok(self
                .files
                .read()
                .unwrap()
                .iter()
                .filter(|f| f.status == status)
                .cloned()
                .collect())
        }

        fn count_chunks(&self, file_id: &str) -> Result<i64> {
            Ok(self.chunks_of(file_id).len() as i64)
        }

        fn get_retrievable_chunks(
            &self,
            user_id: &str,
            file_ids: &[String],
        ) -> Result<Vec<KnowledgeChunk>> {
            let files = self.files.read().unwrap();
            let allowed: HashSet<&str> = files
                .iter()
                .filter(|f| {
                    f.user_id == user_id
                        && f.status == KnowledgeStatus::Completed
                        && file_ids.contains(&f.id)
                })
                .map(|f| f.id.as_str())
                .collect();
            Ok(self
                .chunks
                .read()
                .unwrap()
                .iter()
                .filter(|c| allowed.contains(c.file_id.as_str()))
                .cloned()
                .collect())
        }

        async fn create_file(&self, new_file: NewKnowledgeFile) -> Result<KnowledgeFile> {
            let now = Utc::now();
            let file = KnowledgeFile {
                id: Uuid::new_v4().to_string(),
                user_id: new_file.user_id,
                file_name: new_file.file_name,
                file_path: new_file.file_path,
                file_size: new_file.file_size,
                file_type: new_file.file_type,
                status: KnowledgeStatus::Pending,
                processed_at: None,
                created_at: now,
                updated_at: now,
            };
            self.files.write().unwrap().push(file.clone());
            self.transitions
                .write()
                .unwrap()
                .push((file.id.clone(), KnowledgeStatus::Pending));
            Ok(file)
        }

        async fn claim_for_processing(&self, file_id: &str) -> Result<bool> {
            if self.get_file(file_id)?.status != KnowledgeStatus::Pending {
                return Ok(false);
            }
            self.set_status(file_id, KnowledgeStatus::Processing)?;
            Ok(true)
        }

        async fn complete_ingestion(
            &self,
            file_id: &str,
            chunks: Vec<NewKnowledgeChunk>,
        ) -> Result<usize> {
            let count = chunks.len();
            let mut stored = self.chunks.write().unwrap();
            for chunk in chunks {
                stored.push(KnowledgeChunk {
                    id: Uuid::new_v4().to_string(),
                    file_id: file_id.to_string(),
                    chunk_index: chunk.chunk_index,
                    content: chunk.content,
                    embedding: chunk.embedding,
                    metadata: chunk.metadata,
                    created_at: Utc::now(),
                });
            }
            drop(stored);
            self.set_status(file_id, KnowledgeStatus::Completed)?;
            Ok(count)
        }

        async fn mark_failed(&self, file_id: &str) -> Result<()> {
            self.set_status(file_id, KnowledgeStatus::Failed)
        }

        async fn delete_file(&self, file_id: &str) -> Result<usize> {
            self.chunks.write().unwrap().retain(|c| c.file_id != file_id);
            let mut files = self.files.write().unwrap();
            let before = files.len();
            files.retain(|f| f.id != file_id);
            Ok(before - files.len())
        }
    }

    #[derive(Default)]
    struct MemoryFileStore {
        files: RwLock<HashMap<String, Vec<u8>>>,
        fail_removals: bool,
        panic_on_read: bool,
    }

    #[async_trait]
    impl FileStore for MemoryFileStore {
        async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<String> {
            let path = format!("mem://{}", stored_name);
            self.files
                .write()
                .unwrap()
                .insert(path.clone(), bytes.to_vec());
            Ok(path)
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>> {
            if self.panic_on_read {
                panic!("corrupt volume while reading {}", path);
            }
            self.files
                .read()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Io(format!("{} not found", path)))
        }

        async fn remove(&self, path: &str) -> Result<()> {
            if self.fail_removals {
                return Err(Error::Io("read-only volume".to_string()));
            }
            self.files.write().unwrap().remove(path);
            Ok(())
        }
    }

    struct Fixture {
        service: KnowledgeService,
        repo: Arc<MockKnowledgeRepository>,
        store: Arc<MemoryFileStore>,
        pool: IngestionPool,
    }

    fn fixture_with_store(store: MemoryFileStore) -> Fixture {
        let repo = Arc::new(MockKnowledgeRepository::default());
        let store = Arc::new(store);
        let pool = IngestionPool::start(repo.clone(), store.clone(), IngestionConfig::default());
        Fixture {
            service: KnowledgeService::new(repo.clone(), store.clone(), pool.clone()),
            repo,
            store,
            pool,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(MemoryFileStore::default())
    }

    async fn wait_for_status(
        repo: &MockKnowledgeRepository,
        file_id: &str,
        status: KnowledgeStatus,
    ) {
        for _ in 0..200 {
            if repo.get_file(file_id).unwrap().status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("file {} never reached {}", file_id, status);
    }

    #[tokio::test]
    async fn test_upload_ingests_into_chunks() {
        let f = fixture();
        let text = "k".repeat(2500);

        let file = f
            .service
            .upload_file("u1", "notes.txt", 2500, text.clone().into_bytes())
            .await
            .unwrap();
        assert_eq!(file.status, KnowledgeStatus::Pending);
        assert_eq!(file.file_type, "txt");
        assert_ne!(file.file_path, "notes.txt");

        wait_for_status(&f.repo, &file.id, KnowledgeStatus::Completed).await;

        assert_eq!(
            f.repo.statuses_of(&file.id),
            vec![
                KnowledgeStatus::Pending,
                KnowledgeStatus::Processing,
                KnowledgeStatus::Completed
            ]
        );
        let mut chunks = f.repo.chunks_of(&file.id);
        chunks.sort_by_key(|c| c.chunk_index);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, text);

        let detail = f.service.get_file("u1", &file.id).unwrap();
        assert_eq!(detail.chunk_count, 3);
        assert!(detail.file.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_type_and_size() {
        let f = fixture();

        let err = f
            .service
            .upload_file("u1", "script.exe", 10, vec![0; 10])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = f
            .service
            .upload_file("u1", "big.pdf", MAX_UPLOAD_BYTES + 1, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Extension matching ignores case
        assert!(f
            .service
            .upload_file("u1", "README.MD", 2, b"hi".to_vec())
            .await
            .is_ok());
        assert_eq!(f.store.files.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_marked_failed() {
        let f = fixture();
        let file = f
            .service
            .upload_file("u1", "gone.md", 4, b"text".to_vec())
            .await
            .unwrap();
        wait_for_status(&f.repo, &file.id, KnowledgeStatus::Completed).await;

        // A second file whose bytes vanish before ingestion runs
        let orphan = f
            .repo
            .create_file(NewKnowledgeFile {
                user_id: "u1".into(),
                file_name: "lost.txt".into(),
                file_path: "mem://missing".into(),
                file_size: 1,
                file_type: "txt".into(),
            })
            .await
            .unwrap();
        f.service.resume_ingestion().await.unwrap();
        wait_for_status(&f.repo, &orphan.id, KnowledgeStatus::Failed).await;
        assert_eq!(f.service.get_file("u1", &orphan.id).unwrap().chunk_count, 0);
    }

    #[tokio::test]
    async fn test_panicking_worker_releases_its_file() {
        let f = fixture_with_store(MemoryFileStore {
            panic_on_read: true,
            ..Default::default()
        });
        let file = f
            .service
            .upload_file("u1", "boom.txt", 4, b"boom".to_vec())
            .await
            .unwrap();
        wait_for_status(&f.repo, &file.id, KnowledgeStatus::Processing).await;

        for _ in 0..200 {
            if f.pool.in_flight() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(f.pool.in_flight(), 0);
        assert!(f.pool.schedule(&file.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_retrieve_only_owned_completed_files() {
        let f = fixture();
        let owned = f
            .service
            .upload_file("u1", "a.txt", 5, b"alpha".to_vec())
            .await
            .unwrap();
        let foreign = f
            .service
            .upload_file("u2", "b.txt", 4, b"beta".to_vec())
            .await
            .unwrap();
        wait_for_status(&f.repo, &owned.id, KnowledgeStatus::Completed).await;
        wait_for_status(&f.repo, &foreign.id, KnowledgeStatus::Completed).await;

        let pending = f
            .repo
            .create_file(NewKnowledgeFile {
                user_id: "u1".into(),
                file_name: "c.txt".into(),
                file_path: "mem://c".into(),
                file_size: 5,
                file_type: "txt".into(),
            })
            .await
            .unwrap();

        let ids = vec![
            owned.id.clone(),
            pending.id.clone(),
            foreign.id.clone(),
            "missing".to_string(),
        ];
        let content = f.service.retrieve("u1", &ids).unwrap();
        assert_eq!(content, "alpha\n");

        assert_eq!(f.service.retrieve("u1", &[]).unwrap(), "");
    }

    #[tokio::test]
    async fn test_claim_prevents_double_ingestion() {
        let f = fixture();
        let file = f
            .service
            .upload_file("u1", "x.txt", 3, b"abc".to_vec())
            .await
            .unwrap();
        wait_for_status(&f.repo, &file.id, KnowledgeStatus::Completed).await;

        // Scheduling again after completion does nothing
        f.service.resume_ingestion().await.unwrap();
        assert!(f.service.ingestion.schedule(&file.id).await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.repo.chunks_of(&file.id).len(), 1);
        assert_eq!(
            f.repo
                .statuses_of(&file.id)
                .iter()
                .filter(|s| **s == KnowledgeStatus::Processing)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_checks_owner_and_tolerates_disk_errors() {
        let f = fixture_with_store(MemoryFileStore {
            fail_removals: true,
            ..Default::default()
        });
        let file = f
            .service
            .upload_file("u1", "doc.md", 3, b"abc".to_vec())
            .await
            .unwrap();
        wait_for_status(&f.repo, &file.id, KnowledgeStatus::Completed).await;

        let err = f.service.delete_file("u2", &file.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        f.service.delete_file("u1", &file.id).await.unwrap();
        assert!(f.repo.chunks_of(&file.id).is_empty());
        let err = f.service.get_file("u1", &file.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_files_paginates_newest_first() {
        let f = fixture();
        for name in ["one.txt", "two.txt", "three.txt"] {
            f.service
                .upload_file("u1", name, 1, b"x".to_vec())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let page = f
            .service
            .list_files("u1", PageRequest::new(Some(1), Some(2), 10))
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].file_name, "three.txt");
    }
}
