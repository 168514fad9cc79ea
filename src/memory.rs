//! In-memory store transport with full two-generation semantics.
//!
//! This module provides a complete in-process implementation of
//! [`StoreTransport`] for tests, doctests, and local development without a
//! running store. Mounts are declared up front with their generation; paths
//! inside a mount behave like the real store:
//! - unversioned mounts keep one value per path, overwritten in place and
//!   removed outright
//! - versioned mounts keep numbered history per path with soft-delete,
//!   undelete, destroy, and metadata removal
//!
//! # Example
//!
//! ```rust,ignore
//! use strongroom::{Generation, MemoryTransport, StoreTransport};
//! use serde_json::json;
//!
//! let transport = MemoryTransport::new()
//!     .with_mount("secret", Generation::V2)
//!     .with_mount("legacy", Generation::V1);
//!
//! transport.kv2_set("secret/app/db", &json!({"password": "hunter2"})).await?;
//! let (value, meta) = transport.kv2_get("secret/app/db", None).await?;
//! assert_eq!(meta.version, 1);
//! ```
//!
//! # Security Considerations
//!
//! Values live in plain process memory with no encryption at rest. The
//! `Debug` output shows mount names and generations only, never stored
//! values.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tokio::sync::RwLock;

use crate::error::{KvError, Result};
use crate::transport::{StoreTransport, VersionMetadata};
use crate::types::Generation;

/// One stored version on a versioned mount. The value is dropped when the
/// version is destroyed; the metadata record stays.
#[derive(Debug, Clone)]
struct StoredVersion {
    value: Option<Value>,
    meta: VersionMetadata,
}

/// Version history of one path on a versioned mount, keyed by version
/// number so iteration is already ascending.
#[derive(Debug, Clone, Default)]
struct VersionHistory {
    versions: BTreeMap<u64, StoredVersion>,
}

impl VersionHistory {
    fn next_version(&self) -> u64 {
        self.versions.keys().next_back().copied().unwrap_or(0) + 1
    }
}

/// Per-mount storage. The variant is the mount's generation.
#[derive(Debug, Clone)]
enum MountData {
    V1(HashMap<String, Value>),
    V2(HashMap<String, VersionHistory>),
}

/// In-memory implementation of [`StoreTransport`].
///
/// The mount table is fixed at construction; only the stored data changes
/// afterwards, guarded by a single `RwLock`. The transport is cheap to share
/// behind an `Arc` across tasks.
#[derive(Default)]
pub struct MemoryTransport {
    generations: HashMap<String, Generation>,
    data: RwLock<HashMap<String, MountData>>,
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mounts: BTreeMap<_, _> =
            self.generations.iter().map(|(name, generation)| (name, generation.as_str())).collect();
        f.debug_struct("MemoryTransport").field("mounts", &mounts).finish_non_exhaustive()
    }
}

impl MemoryTransport {
    /// Creates a transport with no mounts. Every operation fails until
    /// mounts are registered via [`MemoryTransport::with_mount`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mount with the given generation.
    pub fn with_mount(mut self, name: impl Into<String>, generation: Generation) -> Self {
        let name = name.into();
        let data = match generation {
            Generation::V1 => MountData::V1(HashMap::new()),
            Generation::V2 => MountData::V2(HashMap::new()),
        };
        self.generations.insert(name.clone(), generation);
        self.data.get_mut().insert(name, data);
        self
    }

    /// Mount name plus the path inside the mount, or not-found when no
    /// registered mount covers `path`.
    fn locate(&self, path: &str) -> Result<(String, String)> {
        let (mount, rest) = self.split_mount(path);
        if self.generations.contains_key(&mount) {
            Ok((mount, rest))
        } else {
            Err(KvError::not_found(format!("no mount matches path {}", path)))
        }
    }
}

fn v1_entries<'a>(
    data: &'a HashMap<String, MountData>,
    mount: &str,
) -> Result<&'a HashMap<String, Value>> {
    match data.get(mount) {
        Some(MountData::V1(entries)) => Ok(entries),
        Some(MountData::V2(_)) => Err(KvError::transport(format!(
            "mount {} does not speak the unversioned protocol",
            mount
        ))),
        None => Err(KvError::not_found(format!("no mount named {}", mount))),
    }
}

fn v1_entries_mut<'a>(
    data: &'a mut HashMap<String, MountData>,
    mount: &str,
) -> Result<&'a mut HashMap<String, Value>> {
    match data.get_mut(mount) {
        Some(MountData::V1(entries)) => Ok(entries),
        Some(MountData::V2(_)) => Err(KvError::transport(format!(
            "mount {} does not speak the unversioned protocol",
            mount
        ))),
        None => Err(KvError::not_found(format!("no mount named {}", mount))),
    }
}

fn v2_entries<'a>(
    data: &'a HashMap<String, MountData>,
    mount: &str,
) -> Result<&'a HashMap<String, VersionHistory>> {
    match data.get(mount) {
        Some(MountData::V2(entries)) => Ok(entries),
        Some(MountData::V1(_)) => Err(KvError::transport(format!(
            "mount {} does not speak the versioned protocol",
            mount
        ))),
        None => Err(KvError::not_found(format!("no mount named {}", mount))),
    }
}

fn v2_entries_mut<'a>(
    data: &'a mut HashMap<String, MountData>,
    mount: &str,
) -> Result<&'a mut HashMap<String, VersionHistory>> {
    match data.get_mut(mount) {
        Some(MountData::V2(entries)) => Ok(entries),
        Some(MountData::V1(_)) => Err(KvError::transport(format!(
            "mount {} does not speak the versioned protocol",
            mount
        ))),
        None => Err(KvError::not_found(format!("no mount named {}", mount))),
    }
}

/// Direct children of `folder` among `keys`, subfolders marked with a
/// trailing `/`, sorted and deduplicated. Not-found when `folder` has no
/// children.
fn list_folder<'a>(
    keys: impl Iterator<Item = &'a String>,
    folder: &str,
    path: &str,
) -> Result<Vec<String>> {
    let prefix = if folder.is_empty() { String::new() } else { format!("{}/", folder) };
    let mut entries = BTreeSet::new();
    for key in keys {
        if let Some(rest) = key.strip_prefix(prefix.as_str()) {
            if rest.is_empty() {
                continue;
            }
            match rest.split_once('/') {
                Some((child, _)) => entries.insert(format!("{}/", child)),
                None => entries.insert(rest.to_string()),
            };
        }
    }
    if entries.is_empty() {
        return Err(KvError::not_found(format!("no folder at {}", path)));
    }
    Ok(entries.into_iter().collect())
}

#[async_trait]
impl StoreTransport for MemoryTransport {
    async fn kv1_get(&self, path: &str) -> Result<Value> {
        let (mount, key) = self.locate(path)?;
        let data = self.data.read().await;
        let entries = v1_entries(&data, &mount)?;
        entries
            .get(&key)
            .cloned()
            .ok_or_else(|| KvError::not_found(format!("no value at {}", path)))
    }

    async fn kv1_set(&self, path: &str, values: &Value) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let entries = v1_entries_mut(&mut data, &mount)?;
        entries.insert(key, values.clone());
        Ok(())
    }

    async fn kv1_delete(&self, path: &str) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let entries = v1_entries_mut(&mut data, &mount)?;
        // Removing an absent value succeeds, like the real store.
        entries.remove(&key);
        Ok(())
    }

    async fn kv1_list(&self, path: &str) -> Result<Vec<String>> {
        let (mount, folder) = self.locate(path)?;
        let data = self.data.read().await;
        let entries = v1_entries(&data, &mount)?;
        list_folder(entries.keys(), &folder, path)
    }

    async fn kv2_get(&self, path: &str, version: Option<u64>) -> Result<(Value, VersionMetadata)> {
        let (mount, key) = self.locate(path)?;
        let data = self.data.read().await;
        let histories = v2_entries(&data, &mount)?;
        let history = histories
            .get(&key)
            .ok_or_else(|| KvError::not_found(format!("no secret at {}", path)))?;

        let stored = match version {
            Some(v) => history
                .versions
                .get(&v)
                .ok_or_else(|| KvError::not_found(format!("no version {} at {}", v, path)))?,
            None => {
                let Some((_, stored)) = history.versions.iter().next_back() else {
                    return Err(KvError::not_found(format!("no secret at {}", path)));
                };
                stored
            }
        };

        if stored.meta.destroyed || stored.meta.deletion_time.is_some() {
            return Err(KvError::not_found(format!(
                "no live value for version {} at {}",
                stored.meta.version, path
            )));
        }
        let value = stored.value.clone().ok_or_else(|| {
            KvError::not_found(format!(
                "no live value for version {} at {}",
                stored.meta.version, path
            ))
        })?;
        Ok((value, stored.meta.clone()))
    }

    async fn kv2_set(&self, path: &str, values: &Value) -> Result<VersionMetadata> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let histories = v2_entries_mut(&mut data, &mount)?;
        let history = histories.entry(key).or_default();
        let meta = VersionMetadata {
            version: history.next_version(),
            created_time: Some(Utc::now()),
            deletion_time: None,
            destroyed: false,
        };
        history
            .versions
            .insert(meta.version, StoredVersion { value: Some(values.clone()), meta: meta.clone() });
        Ok(meta)
    }

    async fn kv2_list(&self, path: &str) -> Result<Vec<String>> {
        let (mount, folder) = self.locate(path)?;
        let data = self.data.read().await;
        let histories = v2_entries(&data, &mount)?;
        list_folder(histories.keys(), &folder, path)
    }

    async fn kv2_delete(&self, path: &str, versions: &[u64]) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let histories = v2_entries_mut(&mut data, &mount)?;
        if let Some(history) = histories.get_mut(&key) {
            let targets: Vec<u64> = if versions.is_empty() {
                history.versions.keys().next_back().copied().into_iter().collect()
            } else {
                versions.to_vec()
            };
            let now = Utc::now();
            for v in targets {
                if let Some(stored) = history.versions.get_mut(&v) {
                    if stored.meta.deletion_time.is_none() {
                        stored.meta.deletion_time = Some(now);
                    }
                }
            }
        }
        Ok(())
    }

    async fn kv2_undelete(&self, path: &str, versions: &[u64]) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let histories = v2_entries_mut(&mut data, &mount)?;
        if let Some(history) = histories.get_mut(&key) {
            for v in versions {
                if let Some(stored) = history.versions.get_mut(v) {
                    stored.meta.deletion_time = None;
                }
            }
        }
        Ok(())
    }

    async fn kv2_destroy(&self, path: &str, versions: &[u64]) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let histories = v2_entries_mut(&mut data, &mount)?;
        if let Some(history) = histories.get_mut(&key) {
            for v in versions {
                if let Some(stored) = history.versions.get_mut(v) {
                    stored.value = None;
                    stored.meta.destroyed = true;
                }
            }
        }
        Ok(())
    }

    async fn kv2_destroy_metadata(&self, path: &str) -> Result<()> {
        let (mount, key) = self.locate(path)?;
        let mut data = self.data.write().await;
        let histories = v2_entries_mut(&mut data, &mount)?;
        histories.remove(&key);
        Ok(())
    }

    async fn kv2_read_metadata(&self, path: &str) -> Result<Vec<VersionMetadata>> {
        let (mount, key) = self.locate(path)?;
        let data = self.data.read().await;
        let histories = v2_entries(&data, &mount)?;
        let history = histories
            .get(&key)
            .ok_or_else(|| KvError::not_found(format!("no secret at {}", path)))?;
        Ok(history.versions.values().map(|stored| stored.meta.clone()).collect())
    }

    async fn is_v2_mount(&self, mount: &str) -> Result<bool> {
        match self.generations.get(mount) {
            Some(generation) => Ok(*generation == Generation::V2),
            None => Err(KvError::not_found(format!("no mount named {}", mount))),
        }
    }

    /// Longest registered prefix wins, so nested mount names resolve to the
    /// more specific mount. Unregistered paths fall back to the first
    /// segment, which then fails mount detection with not-found.
    fn split_mount(&self, path: &str) -> (String, String) {
        let trimmed = path.trim_matches('/');
        let mut best: Option<&str> = None;
        for name in self.generations.keys() {
            let covers = trimmed == name.as_str()
                || (trimmed.starts_with(name.as_str())
                    && trimmed.as_bytes().get(name.len()) == Some(&b'/'));
            if covers && best.map_or(true, |b| name.len() > b.len()) {
                best = Some(name);
            }
        }
        match best {
            Some(name) => {
                let rest = trimmed[name.len()..].trim_start_matches('/');
                (name.to_string(), rest.to_string())
            }
            None => match trimmed.split_once('/') {
                Some((mount, rest)) => (mount.to_string(), rest.to_string()),
                None => (trimmed.to_string(), String::new()),
            },
        }
    }
}
