//! Filesystem-backed blob store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::sanitize_file_name;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::BlobStore;

const SCHEME: &str = "file://";

/// Stores each blob as its own file under `root`; references are
/// `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> DomainResult<PathBuf> {
        let path = reference
            .strip_prefix(SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| DomainError::Validation(format!("Not a file reference: {reference}")))?;

        if path.parent() != Some(self.root.as_path()) {
            return Err(DomainError::Validation(format!(
                "Reference {reference} is outside {}",
                self.root.display()
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> DomainResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to create {}: {e}", self.root.display())))?;

        let path = self
            .root
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name)));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "stored blob");
        Ok(format!("{SCHEME}{}", path.display()))
    }

    async fn get(&self, reference: &str) -> DomainResult<Vec<u8>> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to read {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("files"));

        let reference = store.put("proof.pdf", b"%PDF-1.7".to_vec()).await.unwrap();
        assert!(reference.starts_with("file://"));
        assert!(reference.ends_with("proof.pdf"));
        assert_eq!(store.get(&reference).await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_rejects_foreign_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store.get("file:///etc/hostname").await.is_err());
        assert!(store.get("memory://x").await.is_err());
    }
}
