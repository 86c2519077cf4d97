//! Storage backends for vocp
//!
//! Two [`StorageAdapter`] implementations share one capability set:
//! [`LocalAdapter`] over the OS filesystem and [`RemoteAdapter`] over any
//! [`NodeClient`]. [`Storage`] classifies a path once, syntactically, and hands
//! out the matching adapter.
//!
//! Node store clients shipped here:
//!
//! - [`MemoryNodeStore`]: in-memory tree with scripted failures
//! - [`DirectoryNodeStore`]: remote namespace served from a local directory

#![deny(missing_docs)]

pub mod checksum;
pub mod directory;
pub mod glob;
pub mod local;
pub mod memory;
pub mod remote;

pub use directory::DirectoryNodeStore;
pub use local::LocalAdapter;
pub use memory::{MemoryNodeStore, TransferRecord};
pub use remote::RemoteAdapter;

use std::sync::Arc;
use vocp_types::paths::{self, SEPARATOR};
use vocp_types::{NodeClient, StorageAdapter};

/// Which backend a path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// OS filesystem
    Local,
    /// Remote node store
    Remote,
}

/// Both backends plus the path classifier
#[derive(Debug, Clone)]
pub struct Storage {
    schemes: Vec<String>,
    local: LocalAdapter,
    remote: RemoteAdapter,
}

impl Storage {
    /// Build storage over a node store client serving `schemes`
    pub fn new<I, S>(client: Arc<dyn NodeClient>, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
            local: LocalAdapter::new(),
            remote: RemoteAdapter::new(client),
        }
    }

    /// Classify a path by its scheme prefix
    pub fn classify(&self, path: &str) -> Backend {
        match paths::scheme(path) {
            Some(scheme) if self.schemes.iter().any(|s| s == scheme) => Backend::Remote,
            _ => Backend::Local,
        }
    }

    /// Whether `path` addresses the remote store
    pub fn is_remote(&self, path: &str) -> bool {
        self.classify(path) == Backend::Remote
    }

    /// Adapter serving `path`
    pub fn adapter(&self, path: &str) -> &dyn StorageAdapter {
        match self.classify(path) {
            Backend::Local => &self.local,
            Backend::Remote => &self.remote,
        }
    }

    /// Adapter that carries a transfer: the remote client whenever either
    /// side is remote
    pub fn transfer_adapter(&self, source: &str, destination: &str) -> &dyn StorageAdapter {
        if self.is_remote(source) || self.is_remote(destination) {
            &self.remote
        } else {
            &self.local
        }
    }

    /// Remote adapter, for wildcard expansion
    pub fn remote(&self) -> &RemoteAdapter {
        &self.remote
    }

    /// Configured remote schemes
    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }
}

/// Byte offset where a trailing cutout suffix of the last path component
/// starts, if the path ends in `]` or `)`
pub(crate) fn cutout_start(path: &str) -> Option<usize> {
    let name_start = path.rfind(SEPARATOR).map_or(0, |pos| pos + 1);
    let name = &path[name_start..];
    let offset = if name.ends_with(']') {
        name.find('[')
    } else if name.ends_with(')') {
        name.rfind('(')
    } else {
        None
    }?;
    (offset > 0).then_some(name_start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn storage() -> Storage {
        Storage::new(Arc::new(MemoryNodeStore::new()), ["vos", "arc"])
    }

    #[rstest]
    #[case("vos:data/a.fits", Backend::Remote)]
    #[case("arc:projects/x", Backend::Remote)]
    #[case("vos://cadc.nrc.ca~vault/a", Backend::Remote)]
    #[case("/tmp/a.fits", Backend::Local)]
    #[case("relative/a.fits", Backend::Local)]
    #[case("http://example.org/a", Backend::Local)]
    #[case("C:\\data", Backend::Local)]
    fn test_classify(#[case] path: &str, #[case] expected: Backend) {
        assert_eq!(storage().classify(path), expected);
    }

    #[test]
    fn test_adapter_dispatch() {
        let storage = storage();
        assert!(storage.adapter("vos:a").is_remote());
        assert!(!storage.adapter("/tmp/a").is_remote());
        assert!(storage.transfer_adapter("/tmp/a", "vos:b").is_remote());
        assert!(storage.transfer_adapter("vos:a", "/tmp/b").is_remote());
        assert!(!storage.transfer_adapter("/tmp/a", "/tmp/b").is_remote());
        assert_eq!(storage.schemes(), ["vos", "arc"]);
    }

    #[rstest]
    #[case("vos:a.fits[1:10,1:10]", Some(10))]
    #[case("vos:a.fits[1][2:3]", Some(10))]
    #[case("vos:dir/a.fits(10.5,-2,0.1)", Some(14))]
    #[case("vos:a.fits", None)]
    #[case("vos:dir[1]/a.fits", None)]
    #[case("[1]", None)]
    fn test_cutout_start(#[case] path: &str, #[case] expected: Option<usize>) {
        assert_eq!(cutout_start(path), expected);
    }
}
