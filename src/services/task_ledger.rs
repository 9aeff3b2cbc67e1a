//! Comment and attachment ledger.
//!
//! Appends are not department-gated and commute with transitions, so they
//! skip the version check and the engine's per-task lock.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FileMetadata, Task, TaskComment, TaskFile, TaskPatch};
use crate::domain::ports::{BlobStore, TaskRepository};
use crate::services::event_bus::{EventBus, EventPayload};

pub struct TaskLedger<T: TaskRepository, B: BlobStore> {
    repo: Arc<T>,
    blobs: Arc<B>,
    bus: Arc<EventBus>,
}

impl<T: TaskRepository, B: BlobStore> TaskLedger<T, B> {
    pub fn new(repo: Arc<T>, blobs: Arc<B>, bus: Arc<EventBus>) -> Self {
        Self { repo, blobs, bus }
    }

    /// Append a comment. Text is trimmed and must not be empty.
    #[instrument(skip(self, text))]
    pub async fn add_comment(&self, task_id: Uuid, text: &str, user_id: &str) -> DomainResult<Task> {
        require_user(user_id)?;
        let comment = TaskComment::new(text, user_id)?;

        let updated = self
            .repo
            .update_atomic(task_id, None, TaskPatch::AddComment(comment.clone()))
            .await?;

        self.bus.publish_payload(EventPayload::CommentAdded { task_id, comment });
        info!(%task_id, comments = updated.comments.len(), "comment added");
        Ok(updated)
    }

    /// Record a file whose bytes already live in blob storage.
    #[instrument(skip(self, metadata), fields(name = %metadata.name))]
    pub async fn add_file(&self, task_id: Uuid, metadata: FileMetadata, user_id: &str) -> DomainResult<Task> {
        require_user(user_id)?;
        let file = TaskFile::new(metadata, user_id)?;

        let updated = self
            .repo
            .update_atomic(task_id, None, TaskPatch::AddFile(file.clone()))
            .await?;

        self.bus.publish_payload(EventPayload::FileAdded { task_id, file });
        info!(%task_id, files = updated.files.len(), "file added");
        Ok(updated)
    }

    /// Store `bytes` in blob storage, then record the returned reference.
    ///
    /// The task must exist before anything is uploaded.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_file(
        &self,
        task_id: Uuid,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        user_id: &str,
    ) -> DomainResult<Task> {
        require_user(user_id)?;
        if self.repo.get(task_id).await?.is_none() {
            return Err(DomainError::TaskNotFound(task_id));
        }

        let url = self.blobs.put(name, bytes).await?;
        let metadata = FileMetadata {
            name: name.to_string(),
            url,
            content_type: content_type.to_string(),
        };
        self.add_file(task_id, metadata, user_id).await
    }

    /// Read back the bytes of an attached file.
    pub async fn download_file(&self, task_id: Uuid, file_id: Uuid) -> DomainResult<(TaskFile, Vec<u8>)> {
        let task = self.repo.get(task_id).await?.ok_or(DomainError::TaskNotFound(task_id))?;
        let file = task
            .files
            .into_iter()
            .find(|f| f.id == file_id)
            .ok_or(DomainError::FileNotFound { task_id, file_id })?;
        let bytes = self.blobs.get(&file.url).await?;
        Ok((file, bytes))
    }
}

fn require_user(user_id: &str) -> DomainResult<()> {
    if user_id.trim().is_empty() {
        return Err(DomainError::validation("User id cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::blob::InMemoryBlobStore;
    use crate::adapters::memory::InMemoryTaskRepository;
    use crate::domain::errors::ErrorKind;
    use crate::domain::models::NewTask;

    async fn setup() -> (TaskLedger<InMemoryTaskRepository, InMemoryBlobStore>, Task, Arc<EventBus>) {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let task = Task::create(NewTask::new("Invitation", "Foil print", "Salma & Omar"), "sales-1").unwrap();
        repo.create(&task).await.unwrap();
        let bus = Arc::new(EventBus::default());
        (TaskLedger::new(repo, Arc::new(InMemoryBlobStore::new()), bus.clone()), task, bus)
    }

    #[tokio::test]
    async fn test_add_comment() {
        let (ledger, task, bus) = setup().await;
        let mut rx = bus.subscribe();

        let updated = ledger.add_comment(task.id, "  gold foil  ", "designer-2").await.unwrap();
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].text, "gold foil");
        assert_eq!(updated.version, task.version);
        assert!(matches!(rx.recv().await.unwrap().payload, EventPayload::CommentAdded { .. }));
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let (ledger, task, _) = setup().await;
        let err = ledger.add_comment(task.id, " \n ", "u").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let (ledger, task, _) = setup().await;
        let updated = ledger
            .upload_file(task.id, "proof.png", "image/png", vec![1, 2, 3], "designer-2")
            .await
            .unwrap();

        let file = &updated.files[0];
        assert!(file.url.starts_with("memory://"));
        assert_eq!(file.content_type, "image/png");

        let (meta, bytes) = ledger.download_file(task.id, file.id).await.unwrap();
        assert_eq!(meta.name, "proof.png");
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_download_unknown_file() {
        let (ledger, task, _) = setup().await;
        let err = ledger.download_file(task.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::FileNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_upload_to_missing_task() {
        let (ledger, _, _) = setup().await;
        let err = ledger
            .upload_file(Uuid::new_v4(), "a.pdf", "application/pdf", vec![], "u")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
