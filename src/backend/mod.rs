//! Backend generation adapters.
//!
//! Defines the capability interface the client facade dispatches through,
//! plus one adapter per store generation.

pub mod v1;
pub mod v2;

pub use v1::V1Backend;
pub use v2::V2Backend;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{DeleteOptions, Generation, GetOptions, SecretVersion};

/// Uniform operation set over one resolved mount.
///
/// One implementation exists per store generation. Adapters are stateless
/// beyond their transport handle and are shared across tasks behind
/// `Arc<dyn KvBackend>` once a mount is resolved.
///
/// Implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait KvBackend: Send + Sync + std::fmt::Debug {
    /// Read the value at `path` together with its version record.
    ///
    /// A selector of `None` reads the latest live version. Unversioned
    /// mounts only ever hold version 1; asking them for a higher version
    /// fails with `KvError::NotFound`.
    async fn get(&self, path: &str, opts: &GetOptions) -> Result<(Value, SecretVersion)>;

    /// Write `values` at `path`, returning the record of the written
    /// version. Versioned mounts append history; unversioned mounts
    /// overwrite in place.
    async fn set(&self, path: &str, values: &Value) -> Result<SecretVersion>;

    /// List child entries under `path`. Folder entries carry a trailing `/`.
    async fn list(&self, path: &str) -> Result<Vec<String>>;

    /// Soft-delete versions at `path` (the latest if none are named).
    ///
    /// Unversioned mounts have no soft-delete and refuse the call with
    /// `KvError::Unsupported` unless the options carry the
    /// `destroy_on_v1` escape hatch, which redirects to destroy semantics.
    async fn delete(&self, path: &str, opts: &DeleteOptions) -> Result<()>;

    /// Remove the soft-delete marker from the named versions.
    /// Always unsupported on unversioned mounts.
    async fn undelete(&self, path: &str, versions: &[u64]) -> Result<()>;

    /// Permanently destroy the named versions.
    async fn destroy(&self, path: &str, versions: &[u64]) -> Result<()>;

    /// Permanently remove every version and all metadata at `path`.
    async fn destroy_all(&self, path: &str) -> Result<()>;

    /// Version records at `path`, ascending by version number.
    async fn versions(&self, path: &str) -> Result<Vec<SecretVersion>>;

    /// The generation this adapter speaks.
    fn generation(&self) -> Generation;
}
