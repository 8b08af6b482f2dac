//! Object storage for uploaded originals
//!
//! Blobs are addressed by flat string keys of the form `{uuid}{ext}`.

use async_trait::async_trait;
use docflow_common::DocumentUploadType;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Key under which a document's original is stored
pub fn blob_key(uuid: Uuid, upload_type: DocumentUploadType) -> String {
    format!("{}{}", uuid, upload_type.extension())
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data`, replacing any previous blob under `key`
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Fetch a blob; [`StorageError::BlobNotFound`] when absent
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete a blob; [`StorageError::BlobNotFound`] when absent
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    fn store_type(&self) -> &'static str;
}

// ========================================
// Filesystem
// ========================================

/// Blobs as plain files under a root directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys are flat names; anything that could escape the root is refused
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::InvalidInput(format!("Invalid blob key: {:?}", key)));
        }
        Ok(self.root.join(key))
    }
}

fn not_found_or(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::BlobNotFound(key.to_string())
    } else {
        StorageError::BlobStore(err)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Stored blob {:?} ({} bytes)", path, data.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| not_found_or(key, e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).await.map_err(|e| not_found_or(key, e))?;
        tracing::debug!("Deleted blob {:?}", path);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn store_type(&self) -> &'static str {
        "fs"
    }
}

// ========================================
// Memory
// ========================================

/// Process-local store for tests and throwaway deployments
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::BlobNotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::BlobNotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key() {
        let uuid = Uuid::nil();
        assert_eq!(
            blob_key(uuid, DocumentUploadType::Pdf),
            "00000000-0000-0000-0000-000000000000.pdf"
        );
        assert!(blob_key(uuid, DocumentUploadType::Jpeg).ends_with(".jpg"));
    }

    async fn exercise(store: &dyn BlobStore) {
        assert!(!store.exists("a.jpg").await.unwrap());
        assert!(matches!(store.get("a.jpg").await, Err(StorageError::BlobNotFound(_))));

        store.put("a.jpg", b"first".to_vec()).await.unwrap();
        store.put("a.jpg", b"second".to_vec()).await.unwrap();
        assert!(store.exists("a.jpg").await.unwrap());
        assert_eq!(store.get("a.jpg").await.unwrap(), b"second");

        store.delete("a.jpg").await.unwrap();
        assert!(!store.exists("a.jpg").await.unwrap());
        assert!(matches!(store.delete("a.jpg").await, Err(StorageError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        let store = MemoryBlobStore::new();
        exercise(&store).await;
        assert!(store.is_empty().await);
        assert_eq!(store.store_type(), "memory");
    }

    #[tokio::test]
    async fn test_fs_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        exercise(&store).await;
        assert_eq!(store.store_type(), "fs");
    }

    #[tokio::test]
    async fn test_fs_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        for key in ["../escape.jpg", "nested/a.jpg", ".hidden", ""] {
            assert!(matches!(
                store.put(key, vec![1]).await,
                Err(StorageError::InvalidInput(_))
            ));
        }
    }
}
