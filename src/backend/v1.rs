//! Adapter for unversioned (V1) mounts.
//!
//! The unversioned store keeps one value per path: writes overwrite in
//! place and removal is outright. The adapter reports a synthetic version 1
//! for every live value and refuses the operations that need history.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::KvBackend;
use crate::error::{KvError, Result};
use crate::transport::StoreTransport;
use crate::types::{DeleteOptions, Generation, GetOptions, SecretVersion};

/// Adapter translating the uniform operation set onto an unversioned mount.
pub struct V1Backend {
    transport: Arc<dyn StoreTransport>,
}

impl V1Backend {
    pub fn new(transport: Arc<dyn StoreTransport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for V1Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V1Backend").field("generation", &Generation::V1).finish()
    }
}

/// Whether a destroy targeting `versions` touches the sole version an
/// unversioned mount can hold. An empty list means "everything".
fn removes_sole_version(versions: &[u64]) -> bool {
    versions.is_empty() || versions.iter().any(|&v| v <= 1)
}

#[async_trait]
impl KvBackend for V1Backend {
    async fn get(&self, path: &str, opts: &GetOptions) -> Result<(Value, SecretVersion)> {
        if let Some(version) = opts.version {
            if version > 1 {
                return Err(KvError::not_found(format!(
                    "no version {} at {}: unversioned mounts only hold version 1",
                    version, path
                )));
            }
        }
        let value = self.transport.kv1_get(path).await?;
        tracing::debug!(path = %path, "Read secret from unversioned mount");
        Ok((value, SecretVersion::live(1)))
    }

    async fn set(&self, path: &str, values: &Value) -> Result<SecretVersion> {
        self.transport.kv1_set(path, values).await?;
        tracing::debug!(path = %path, "Wrote secret to unversioned mount");
        Ok(SecretVersion::live(1))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.transport.kv1_list(path).await
    }

    async fn delete(&self, path: &str, opts: &DeleteOptions) -> Result<()> {
        if !opts.destroy_on_v1 {
            return Err(KvError::unsupported(format!(
                "refusing to destroy the unversioned value at {} from a delete call; \
                 set destroy_on_v1 to allow it",
                path
            )));
        }
        tracing::warn!(path = %path, "Delete redirected to destroy on unversioned mount");
        self.destroy(path, &opts.versions).await
    }

    async fn undelete(&self, path: &str, _versions: &[u64]) -> Result<()> {
        Err(KvError::unsupported(format!(
            "cannot undelete at {}: unversioned mounts have no soft-delete",
            path
        )))
    }

    async fn destroy(&self, path: &str, versions: &[u64]) -> Result<()> {
        if !removes_sole_version(versions) {
            tracing::debug!(path = %path, versions = ?versions, "Destroy targeted versions above 1, nothing to do");
            return Ok(());
        }
        self.transport.kv1_delete(path).await?;
        tracing::info!(path = %path, "Destroyed secret on unversioned mount");
        Ok(())
    }

    async fn destroy_all(&self, path: &str) -> Result<()> {
        self.destroy(path, &[]).await
    }

    async fn versions(&self, path: &str) -> Result<Vec<SecretVersion>> {
        // Existence probe; the payload is discarded.
        self.transport.kv1_get(path).await?;
        Ok(vec![SecretVersion::live(1)])
    }

    fn generation(&self) -> Generation {
        Generation::V1
    }
}
