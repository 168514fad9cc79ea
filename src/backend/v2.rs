//! Adapter for versioned (V2) mounts.
//!
//! The versioned store keeps numbered history per path with soft-delete and
//! permanent destruction. The adapter passes version selectors through and
//! folds the store's deletion timestamps into boolean version records.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::KvBackend;
use crate::error::Result;
use crate::transport::StoreTransport;
use crate::types::{DeleteOptions, Generation, GetOptions, SecretVersion};

/// Adapter translating the uniform operation set onto a versioned mount.
pub struct V2Backend {
    transport: Arc<dyn StoreTransport>,
}

impl V2Backend {
    pub fn new(transport: Arc<dyn StoreTransport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for V2Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V2Backend").field("generation", &Generation::V2).finish()
    }
}

#[async_trait]
impl KvBackend for V2Backend {
    async fn get(&self, path: &str, opts: &GetOptions) -> Result<(Value, SecretVersion)> {
        let (value, meta) = self.transport.kv2_get(path, opts.version).await?;
        tracing::debug!(path = %path, version = meta.version, "Read secret version");
        Ok((value, SecretVersion::from(&meta)))
    }

    async fn set(&self, path: &str, values: &Value) -> Result<SecretVersion> {
        let meta = self.transport.kv2_set(path, values).await?;
        tracing::debug!(path = %path, version = meta.version, "Wrote secret version");
        Ok(SecretVersion::from(&meta))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.transport.kv2_list(path).await
    }

    async fn delete(&self, path: &str, opts: &DeleteOptions) -> Result<()> {
        self.transport.kv2_delete(path, &opts.versions).await?;
        tracing::info!(path = %path, versions = ?opts.versions, "Soft-deleted secret versions");
        Ok(())
    }

    async fn undelete(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.transport.kv2_undelete(path, versions).await?;
        tracing::info!(path = %path, versions = ?versions, "Undeleted secret versions");
        Ok(())
    }

    async fn destroy(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.transport.kv2_destroy(path, versions).await?;
        tracing::info!(path = %path, versions = ?versions, "Destroyed secret versions");
        Ok(())
    }

    async fn destroy_all(&self, path: &str) -> Result<()> {
        self.transport.kv2_destroy_metadata(path).await?;
        tracing::info!(path = %path, "Destroyed all versions and metadata");
        Ok(())
    }

    async fn versions(&self, path: &str) -> Result<Vec<SecretVersion>> {
        let mut meta = self.transport.kv2_read_metadata(path).await?;
        // The ascending-order contract is ours, not the transport's.
        meta.sort_by_key(|m| m.version);
        Ok(meta.iter().map(SecretVersion::from).collect())
    }

    fn generation(&self) -> Generation {
        Generation::V2
    }
}
