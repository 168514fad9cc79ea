//! Generation-agnostic client facade and mount resolution.
//!
//! [`KvClient`] exposes one operation set over paths that may live on
//! unversioned or versioned mounts. The first operation touching a mount
//! detects its generation through the transport and caches the resulting
//! adapter; every later operation on that mount reuses the cached adapter
//! with no further detection I/O. Resolved generations are never
//! invalidated because a mount keeps its generation for life.
//!
//! # Example
//!
//! ```rust,ignore
//! use strongroom::{Generation, GetOptions, KvClient, MemoryTransport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(
//!     MemoryTransport::new()
//!         .with_mount("secret", Generation::V2)
//!         .with_mount("legacy", Generation::V1),
//! );
//! let client = KvClient::new(transport);
//!
//! // Same call shape on both mounts; dispatch is resolved per path.
//! client.set("secret/app/db", &json!({"password": "hunter2"})).await?;
//! client.set("legacy/app", &json!({"password": "hunter2"})).await?;
//!
//! let (creds, version): (serde_json::Value, _) =
//!     client.get("secret/app/db", GetOptions::default()).await?;
//! assert_eq!(version.version, 1);
//! ```
//!
//! # Concurrency
//!
//! The resolved-mount cache sits behind a `tokio::sync::RwLock`. Reads take
//! the shared phase; first-time resolution takes the exclusive phase,
//! re-checks, and detects while holding the lock, so racing resolutions of
//! one mount collapse into a single detection call. Clones share the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{KvBackend, V1Backend, V2Backend};
use crate::error::Result;
use crate::transport::StoreTransport;
use crate::types::{DeleteOptions, Generation, GetOptions, SecretVersion};

/// Client for a secret store with mixed-generation mounts.
///
/// Cheap to clone; clones share the transport and the resolved-mount cache.
#[derive(Clone)]
pub struct KvClient {
    transport: Arc<dyn StoreTransport>,
    mounts: Arc<RwLock<HashMap<String, Arc<dyn KvBackend>>>>,
}

impl std::fmt::Debug for KvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mounts = match self.mounts.try_read() {
            Ok(mounts) => mounts.keys().cloned().collect::<Vec<_>>(),
            Err(_) => vec!["<locked>".to_string()],
        };
        f.debug_struct("KvClient").field("resolved_mounts", &mounts).finish_non_exhaustive()
    }
}

impl KvClient {
    /// Creates a client over the given transport with an empty mount cache.
    pub fn new(transport: Arc<dyn StoreTransport>) -> Self {
        Self { transport, mounts: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Resolve the adapter for the mount governing `path`.
    ///
    /// Fast path takes the shared lock only. On a miss the exclusive lock
    /// is taken, presence re-checked, and detection performed while the
    /// lock is held. A failed detection inserts nothing, so a later call
    /// retries it.
    async fn backend_for_path(&self, path: &str) -> Result<Arc<dyn KvBackend>> {
        let (mount, _) = self.transport.split_mount(path);

        {
            let mounts = self.mounts.read().await;
            if let Some(backend) = mounts.get(&mount) {
                debug!(mount = %mount, "Mount generation cache hit");
                return Ok(backend.clone());
            }
        }

        let mut mounts = self.mounts.write().await;
        if let Some(backend) = mounts.get(&mount) {
            return Ok(backend.clone());
        }

        let backend: Arc<dyn KvBackend> = match self.transport.is_v2_mount(&mount).await {
            Ok(true) => Arc::new(V2Backend::new(self.transport.clone())),
            Ok(false) => Arc::new(V1Backend::new(self.transport.clone())),
            Err(e) => {
                warn!(mount = %mount, error = %e, "Mount generation detection failed");
                return Err(e);
            }
        };
        info!(mount = %mount, generation = %backend.generation(), "Detected mount generation");
        mounts.insert(mount, backend.clone());
        Ok(backend)
    }

    /// Read the secret at `path` and deserialize it.
    ///
    /// `opts` selects a specific version on versioned mounts; the default
    /// reads the latest live version. Returns the payload together with the
    /// generation-normalized version record.
    ///
    /// # Errors
    ///
    /// - `KvError::NotFound` if the path, version, or mount does not exist,
    ///   or the selected version holds no live value
    /// - `KvError::Serialization` if the payload does not fit `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: GetOptions,
    ) -> Result<(T, SecretVersion)> {
        let backend = self.backend_for_path(path).await?;
        let (value, version) = backend.get(path, &opts.normalized()).await?;
        let parsed = serde_json::from_value(value)?;
        Ok((parsed, version))
    }

    /// Store `values` at `path`, returning the version record of the write.
    ///
    /// Versioned mounts append a new version; unversioned mounts overwrite
    /// the sole value in place.
    pub async fn set<T: Serialize>(&self, path: &str, values: &T) -> Result<SecretVersion> {
        let backend = self.backend_for_path(path).await?;
        let value = serde_json::to_value(values)?;
        backend.set(path, &value).await
    }

    /// List the child entries under `path`. Folder entries carry a trailing
    /// `/`.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.backend_for_path(path).await?.list(path).await
    }

    /// Soft-delete versions at `path` (the latest if `opts.versions` is
    /// empty). Soft-deleted versions can be restored with
    /// [`KvClient::undelete`].
    ///
    /// Unversioned mounts have no soft-delete: the call fails with
    /// `KvError::Unsupported` unless `opts.destroy_on_v1` is set, in which
    /// case the data is DESTROYED PERMANENTLY instead. See
    /// [`DeleteOptions::destroy_on_v1`].
    pub async fn delete(&self, path: &str, opts: DeleteOptions) -> Result<()> {
        self.backend_for_path(path).await?.delete(path, &opts).await
    }

    /// Remove the soft-delete marker from the named versions at `path`.
    /// Always fails with `KvError::Unsupported` on unversioned mounts.
    pub async fn undelete(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.backend_for_path(path).await?.undelete(path, versions).await
    }

    /// Permanently destroy the named versions at `path`. On unversioned
    /// mounts an empty list, or any version number at most 1, removes the
    /// sole value; a list naming only higher versions does nothing.
    pub async fn destroy(&self, path: &str, versions: &[u64]) -> Result<()> {
        self.backend_for_path(path).await?.destroy(path, versions).await
    }

    /// Permanently remove every version and all metadata at `path`.
    pub async fn destroy_all(&self, path: &str) -> Result<()> {
        self.backend_for_path(path).await?.destroy_all(path).await
    }

    /// Version records at `path` in ascending version order. Unversioned
    /// mounts report a single synthetic record numbered 1 when the path
    /// exists.
    pub async fn versions(&self, path: &str) -> Result<Vec<SecretVersion>> {
        self.backend_for_path(path).await?.versions(path).await
    }

    /// The generation governing `path`'s mount.
    ///
    /// Resolves (and caches) the mount without touching any data. Repeated
    /// calls answer from the cache.
    pub async fn mount_generation(&self, path: &str) -> Result<Generation> {
        Ok(self.backend_for_path(path).await?.generation())
    }

    /// Mounts whose generation has been resolved so far, sorted by name.
    pub async fn resolved_mounts(&self) -> Vec<String> {
        let mounts = self.mounts.read().await;
        let mut names: Vec<String> = mounts.keys().cloned().collect();
        names.sort();
        names
    }
}
