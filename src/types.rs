//! Shared types for the key/value store surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend generation governing a mount.
///
/// A mount keeps one generation for its entire lifetime; the client caches
/// the resolved generation per mount and never re-detects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Unversioned store. One implicit value per path, no history.
    V1,
    /// Versioned store with per-path history, soft-delete, and destroy.
    V2,
}

impl Generation {
    /// Get the string representation of this generation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// Numeric generation as reported by mount metadata (1 or 2).
    pub fn number(&self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            _ => Err(format!("Unknown backend generation: {}", s)),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one stored version of a secret.
///
/// Unversioned mounts report a single synthetic record numbered 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretVersion {
    /// Version number (1-based).
    pub version: u64,

    /// A soft-delete marker is present. The data is recoverable via undelete.
    pub deleted: bool,

    /// The data was permanently removed. Terminal for this version.
    pub destroyed: bool,
}

impl SecretVersion {
    /// Record for a live (readable) version.
    pub fn live(version: u64) -> Self {
        Self { version, deleted: false, destroyed: false }
    }
}

/// Options for reading a secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Specific version to read. `None` selects the latest live version.
    /// Version 0 is accepted as an alias for "latest".
    pub version: Option<u64>,
}

impl GetOptions {
    /// Read a specific version instead of the latest.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Selector with the 0 sentinel folded into "latest", so backends never
    /// see it.
    pub(crate) fn normalized(self) -> Self {
        match self.version {
            Some(0) => Self { version: None },
            _ => self,
        }
    }
}

/// Options for deleting a secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Version numbers to soft-delete. Empty selects the latest version.
    pub versions: Vec<u64>,

    /// Permit delete on an unversioned (V1) mount by destroying the value.
    ///
    /// V1 mounts have no soft-delete, so a plain delete fails with
    /// `KvError::Unsupported`. Setting this flag redirects the call to
    /// destroy semantics instead: the value is REMOVED PERMANENTLY and
    /// cannot be undeleted. Has no effect on V2 mounts.
    pub destroy_on_v1: bool,
}

impl DeleteOptions {
    /// Soft-delete the given versions instead of the latest.
    pub fn with_versions(mut self, versions: Vec<u64>) -> Self {
        self.versions = versions;
        self
    }

    /// Allow permanent destruction when the mount turns out to be V1.
    /// See [`DeleteOptions::destroy_on_v1`] for the exact semantics.
    pub fn with_destroy_on_v1(mut self) -> Self {
        self.destroy_on_v1 = true;
        self
    }
}
