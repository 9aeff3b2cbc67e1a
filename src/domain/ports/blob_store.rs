use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// External storage for attachment bytes. Tasks only keep the returned
/// reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a name derived from `file_name` and return an
    /// opaque reference to it.
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> DomainResult<String>;

    /// Fetch the bytes behind a reference returned by `put`.
    async fn get(&self, reference: &str) -> DomainResult<Vec<u8>>;
}
