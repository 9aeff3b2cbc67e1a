//! In-memory blob store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::sanitize_file_name;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::BlobStore;

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> DomainResult<String> {
        let reference = format!("memory://{}/{}", Uuid::new_v4(), sanitize_file_name(file_name));
        self.blobs.write().await.insert(reference.clone(), bytes);
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> DomainResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| DomainError::Storage(format!("Blob not found: {reference}")))
    }
}
