//! Core traits for vocp operations
//!
//! [`StorageAdapter`] is the boundary the copy engine talks to. [`NodeClient`]
//! is the opaque capability through which the remote node store is reached;
//! the remote adapter is a thin layer over it.

use crate::{AccessMode, Checksum, Node, Result};
use async_trait::async_trait;

/// Capability set shared by the local and remote backends
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Whether this adapter serves the remote store
    fn is_remote(&self) -> bool;

    /// Snapshot of the node at `path`
    async fn node(&self, path: &str) -> Result<Node>;

    /// Whether `path` is a directory; missing paths are not directories
    async fn is_directory(&self, path: &str) -> Result<bool>;

    /// Whether `path` is a symbolic link
    async fn is_symlink(&self, path: &str) -> Result<bool>;

    /// Whether `path` can be accessed in `mode`; never fails
    async fn can_access(&self, path: &str, mode: AccessMode) -> bool;

    /// Names of the children of a directory, freshly listed. A child whose
    /// name cannot be represented is an `Err` entry; its siblings still list.
    async fn list_children(&self, path: &str) -> Result<Vec<Result<String>>>;

    /// Create one directory; the parent must exist
    async fn create_directory(&self, path: &str) -> Result<()>;

    /// Content checksum, [`Checksum::ZERO`] when unknown
    async fn checksum(&self, path: &str) -> Result<Checksum>;

    /// Copy `source` to `destination`
    async fn transfer(&self, source: &str, destination: &str, headers_only: bool) -> Result<()>;
}

/// Client of the remote hierarchical node store
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Look up a node
    async fn get_node(&self, path: &str) -> Result<Node>;

    /// List child names of a container; `force` bypasses any client cache
    async fn list_dir(&self, path: &str, force: bool) -> Result<Vec<String>>;

    /// Create a container node
    async fn mkdir(&self, path: &str) -> Result<()>;

    /// Expand a wildcard pattern into matching node paths
    async fn glob(&self, pattern: &str) -> Result<Vec<String>>;

    /// Copy data between the store and the local filesystem (either direction)
    /// or within the store
    async fn copy(&self, source: &str, destination: &str, head: bool) -> Result<()>;
}

/// Confirmation step used before overwriting an existing destination
pub trait OverwritePrompt: Send + Sync {
    /// Ask whether `path` may be overwritten; only an explicit yes returns true
    fn confirm_overwrite(&self, path: &str) -> Result<bool>;
}

/// Prompt that refuses every overwrite, for non-interactive callers
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyOverwrite;

impl OverwritePrompt for DenyOverwrite {
    fn confirm_overwrite(&self, _path: &str) -> Result<bool> {
        Ok(false)
    }
}
