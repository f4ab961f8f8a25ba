use anyhow::Result;
use async_trait::async_trait;

/// Key/value blob persistence boundary. The settings service reads and writes
/// one JSON blob under a fixed key; the backing store decides where it lives.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn load_blob(&self, key: &str) -> Result<Option<String>>;
    async fn save_blob(&self, key: &str, value: &str) -> Result<()>;
}
