//! Transport seam to the remote secret store.
//!
//! The client core never performs wire I/O itself. Everything that actually
//! talks to the store (HTTP calls, authentication, TLS, retries) lives behind
//! the [`StoreTransport`] trait, so the dispatch layer can be exercised
//! against the bundled in-memory store or a production HTTP implementation
//! interchangeably.
//!
//! Transport errors are propagated verbatim by the layers above; no retry or
//! recovery policy belongs here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::SecretVersion;

/// Wire-shaped metadata for one stored version on a versioned mount.
///
/// The store reports soft-deletion as a deletion timestamp; consumers that
/// want the boolean view convert via `From<&VersionMetadata>` for
/// [`SecretVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Version number (1-based).
    pub version: u64,

    /// When this version was written.
    pub created_time: Option<DateTime<Utc>>,

    /// When this version was soft-deleted. `None` means the version is live.
    pub deletion_time: Option<DateTime<Utc>>,

    /// Whether this version's data was permanently destroyed.
    pub destroyed: bool,
}

impl From<&VersionMetadata> for SecretVersion {
    fn from(meta: &VersionMetadata) -> Self {
        Self {
            version: meta.version,
            deleted: meta.deletion_time.is_some(),
            destroyed: meta.destroyed,
        }
    }
}

/// Raw operations against the remote secret store.
///
/// Implementations must be Send + Sync for use across async tasks. Paths are
/// full store paths including the mount prefix; routing a path to a mount is
/// the transport's concern (see [`StoreTransport::split_mount`]).
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret payloads
/// - Network communication MUST use TLS in production
///
/// # Example Implementation
///
/// ```rust,ignore
/// use strongroom::{Result, StoreTransport, VersionMetadata};
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct HttpTransport {
///     // HTTP client, base URL, auth token, ...
/// }
///
/// #[async_trait]
/// impl StoreTransport for HttpTransport {
///     async fn kv1_get(&self, path: &str) -> Result<Value> {
///         // GET /v1/{path}
///         # unimplemented!()
///     }
///     // ... remaining operations
/// }
/// ```
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// Read the value at `path` on an unversioned mount.
    ///
    /// # Errors
    ///
    /// - `KvError::NotFound` if nothing is stored at `path`
    /// - `KvError::Transport` if the store is unreachable or rejects the call
    async fn kv1_get(&self, path: &str) -> Result<Value>;

    /// Write `values` at `path` on an unversioned mount, replacing any
    /// previous value.
    async fn kv1_set(&self, path: &str, values: &Value) -> Result<()>;

    /// Permanently remove the value at `path` on an unversioned mount.
    async fn kv1_delete(&self, path: &str) -> Result<()>;

    /// List child entries under `path` on an unversioned mount. Folder
    /// entries carry a trailing `/`.
    ///
    /// # Errors
    ///
    /// - `KvError::NotFound` if `path` does not exist or is not a folder
    async fn kv1_list(&self, path: &str) -> Result<Vec<String>>;

    /// Read a value from a versioned mount.
    ///
    /// `version` of `None` selects the latest version. Returns the payload
    /// together with the version's metadata.
    ///
    /// # Errors
    ///
    /// - `KvError::NotFound` if the path or requested version does not
    ///   exist, or the version is soft-deleted or destroyed
    async fn kv2_get(&self, path: &str, version: Option<u64>) -> Result<(Value, VersionMetadata)>;

    /// Write `values` at `path` on a versioned mount, creating a new
    /// version. Returns the new version's metadata.
    async fn kv2_set(&self, path: &str, values: &Value) -> Result<VersionMetadata>;

    /// List child entries under `path` on a versioned mount. Folder entries
    /// carry a trailing `/`.
    async fn kv2_list(&self, path: &str) -> Result<Vec<String>>;

    /// Soft-delete the given versions at `path`. An empty slice selects the
    /// latest version.
    async fn kv2_delete(&self, path: &str, versions: &[u64]) -> Result<()>;

    /// Remove the soft-delete marker from the given versions at `path`.
    async fn kv2_undelete(&self, path: &str, versions: &[u64]) -> Result<()>;

    /// Permanently destroy the data of the given versions at `path`. The
    /// version records remain, flagged as destroyed.
    async fn kv2_destroy(&self, path: &str, versions: &[u64]) -> Result<()>;

    /// Permanently remove all versions and metadata at `path`.
    async fn kv2_destroy_metadata(&self, path: &str) -> Result<()>;

    /// Read the version metadata for every version recorded at `path`. No
    /// ordering is guaranteed.
    async fn kv2_read_metadata(&self, path: &str) -> Result<Vec<VersionMetadata>>;

    /// Determine whether the named mount speaks the versioned protocol.
    ///
    /// # Errors
    ///
    /// - `KvError::NotFound` if no such mount exists
    /// - `KvError::Transport` if mount metadata cannot be read
    async fn is_v2_mount(&self, mount: &str) -> Result<bool>;

    /// Split a full path into its mount name and the path inside the mount.
    ///
    /// The default takes the first path segment as the mount. Transports
    /// that know the store's mount table should override this with
    /// longest-prefix matching so nested mount names resolve correctly.
    fn split_mount(&self, path: &str) -> (String, String) {
        let trimmed = path.trim_matches('/');
        match trimmed.split_once('/') {
            Some((mount, rest)) => (mount.to_string(), rest.to_string()),
            None => (trimmed.to_string(), String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KvError;
    use proptest::prelude::*;

    struct NullTransport;

    #[async_trait]
    impl StoreTransport for NullTransport {
        async fn kv1_get(&self, _path: &str) -> Result<Value> {
            Err(KvError::transport("not wired"))
        }
        async fn kv1_set(&self, _path: &str, _values: &Value) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv1_delete(&self, _path: &str) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv1_list(&self, _path: &str) -> Result<Vec<String>> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_get(
            &self,
            _path: &str,
            _version: Option<u64>,
        ) -> Result<(Value, VersionMetadata)> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_set(&self, _path: &str, _values: &Value) -> Result<VersionMetadata> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_list(&self, _path: &str) -> Result<Vec<String>> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_delete(&self, _path: &str, _versions: &[u64]) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_undelete(&self, _path: &str, _versions: &[u64]) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_destroy(&self, _path: &str, _versions: &[u64]) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_destroy_metadata(&self, _path: &str) -> Result<()> {
            Err(KvError::transport("not wired"))
        }
        async fn kv2_read_metadata(&self, _path: &str) -> Result<Vec<VersionMetadata>> {
            Err(KvError::transport("not wired"))
        }
        async fn is_v2_mount(&self, _mount: &str) -> Result<bool> {
            Err(KvError::transport("not wired"))
        }
    }

    #[test]
    fn test_default_split_mount_takes_first_segment() {
        let t = NullTransport;
        assert_eq!(t.split_mount("secret/app/db"), ("secret".to_string(), "app/db".to_string()));
        assert_eq!(t.split_mount("/secret/app"), ("secret".to_string(), "app".to_string()));
        assert_eq!(t.split_mount("secret"), ("secret".to_string(), String::new()));
        assert_eq!(t.split_mount("secret/"), ("secret".to_string(), String::new()));
    }

    #[test]
    fn test_version_metadata_to_secret_version() {
        let live = VersionMetadata {
            version: 4,
            created_time: Some(Utc::now()),
            deletion_time: None,
            destroyed: false,
        };
        assert_eq!(SecretVersion::from(&live), SecretVersion::live(4));

        let deleted = VersionMetadata { deletion_time: Some(Utc::now()), ..live.clone() };
        let record = SecretVersion::from(&deleted);
        assert!(record.deleted);
        assert!(!record.destroyed);

        let destroyed = VersionMetadata { destroyed: true, ..live };
        let record = SecretVersion::from(&destroyed);
        assert!(!record.deleted);
        assert!(record.destroyed);
    }

    proptest! {
        #[test]
        fn prop_default_split_takes_first_segment(
            segments in proptest::collection::vec("[a-z0-9_-]{1,8}", 1..5),
            leading in any::<bool>(),
            trailing in any::<bool>(),
        ) {
            let mut path = segments.join("/");
            if leading {
                path.insert(0, '/');
            }
            if trailing {
                path.push('/');
            }

            let (mount, rest) = NullTransport.split_mount(&path);
            prop_assert_eq!(mount, segments[0].clone());
            prop_assert_eq!(rest, segments[1..].join("/"));
        }
    }
}
