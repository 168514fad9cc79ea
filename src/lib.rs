//! # Strongroom
//!
//! Strongroom is a generation-agnostic client layer for remote secret
//! stores whose key/value backends come in two incompatible protocol
//! generations: an unversioned store (V1) and a versioned store (V2) with
//! per-key history, soft-deletion, and permanent destruction. Callers get
//! one uniform operation set; which protocol a path speaks is detected per
//! mount, cached, and dispatched automatically.
//!
//! ## Architecture
//!
//! ```text
//! KvClient (facade) → Mount Resolver & Cache → V1Backend / V2Backend
//!                                                      ↓
//!                                              StoreTransport (seam)
//! ```
//!
//! ## Core Components
//!
//! - **[`KvClient`]**: caller-facing facade with the uniform operation set
//! - **Mount resolver**: detects each mount's generation once and caches
//!   the adapter, safely under concurrent access
//! - **[`V1Backend`] / [`V2Backend`]**: per-generation protocol adapters,
//!   including graceful degradation for operations V1 cannot support
//! - **[`StoreTransport`]**: trait seam to the wire transport; the bundled
//!   [`MemoryTransport`] implements it fully in-process
//!
//! ## Example Usage
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
//! client.set("secret/app/db", &json!({"password": "hunter2"})).await?;
//! let (creds, version): (serde_json::Value, _) =
//!     client.get("secret/app/db", GetOptions::default()).await?;
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;
pub mod transport;
pub mod types;

// Re-export commonly used types and traits
pub use backend::{KvBackend, V1Backend, V2Backend};
pub use client::KvClient;
pub use error::{KvError, Result};
pub use memory::MemoryTransport;
pub use transport::{StoreTransport, VersionMetadata};
pub use types::{DeleteOptions, Generation, GetOptions, SecretVersion};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
    }
}
