//! Local filesystem backend

use crate::checksum::md5_file;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};
use vocp_types::{AccessMode, Checksum, Error, Node, Result, StorageAdapter};

/// Storage adapter over the OS filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdapter;

impl LocalAdapter {
    /// Create a new local adapter
    pub fn new() -> Self {
        Self
    }
}

fn io_error(error: &std::io::Error, path: &str) -> Error {
    Error::from_io(error, path)
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn is_remote(&self) -> bool {
        false
    }

    async fn node(&self, path: &str) -> Result<Node> {
        let link_metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| io_error(&e, path))?;

        if link_metadata.file_type().is_symlink() {
            let target = tokio::fs::read_link(path)
                .await
                .map_err(|e| io_error(&e, path))?;
            let mut node = Node::symlink(path, target.to_string_lossy());
            // Dangling links keep the defaults
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                node.is_directory = metadata.is_dir();
                node.size_bytes = metadata.len();
            }
            return Ok(node);
        }

        if link_metadata.is_dir() {
            Ok(Node::directory(path))
        } else {
            Ok(Node::file(path, link_metadata.len()))
        }
    }

    async fn is_directory(&self, path: &str) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) => {
                debug!("is_directory({}): {}", path, e);
                Ok(false)
            }
        }
    }

    async fn is_symlink(&self, path: &str) -> Result<bool> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => Ok(metadata.file_type().is_symlink()),
            Err(e) => {
                debug!("is_symlink({}): {}", path, e);
                Ok(false)
            }
        }
    }

    async fn can_access(&self, path: &str, mode: AccessMode) -> bool {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                let error = io_error(&e, path);
                if error.is_access_denial() {
                    debug!("can_access({}): {}", path, error);
                } else {
                    warn!("can_access({}): {}", path, error);
                }
                return false;
            }
        };

        match mode {
            AccessMode::Exists => true,
            AccessMode::Read if metadata.is_dir() => tokio::fs::read_dir(path).await.is_ok(),
            AccessMode::Read => tokio::fs::File::open(path).await.is_ok(),
        }
    }

    async fn list_children(&self, path: &str) -> Result<Vec<Result<String>>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| io_error(&e, path))?;

        let mut names = Vec::new();
        let mut undecodable = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&e, path))?
        {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => undecodable.push(Error::InvalidArgument {
                    message: format!("{}: undecodable name {:?}", path, raw),
                }),
            }
        }
        names.sort();

        debug!(
            "Listed {} children of {} ({} undecodable)",
            names.len(),
            path,
            undecodable.len()
        );
        Ok(names
            .into_iter()
            .map(Ok)
            .chain(undecodable.into_iter().map(Err))
            .collect())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        debug!("Creating local directory {}", path);
        tokio::fs::create_dir(path)
            .await
            .map_err(|e| io_error(&e, path))
    }

    async fn checksum(&self, path: &str) -> Result<Checksum> {
        md5_file(Path::new(path)).await
    }

    async fn transfer(&self, source: &str, destination: &str, headers_only: bool) -> Result<()> {
        if headers_only {
            return Err(Error::unsupported(
                "header-only transfers need a remote source",
            ));
        }

        debug!("Copying local {} -> {}", source, destination);
        tokio::fs::copy(source, destination)
            .await
            .map_err(|e| io_error(&e, source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_directory_and_file_queries() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("dir");
        let file = temp_dir.path().join("file.txt");
        tokio::fs::create_dir(&dir).await.unwrap();
        tokio::fs::write(&file, b"content").await.unwrap();

        let adapter = LocalAdapter::new();
        assert!(!adapter.is_remote());
        assert!(adapter.is_directory(&path_str(&dir)).await.unwrap());
        assert!(!adapter.is_directory(&path_str(&file)).await.unwrap());
        assert!(!adapter
            .is_directory(&path_str(&temp_dir.path().join("absent")))
            .await
            .unwrap());

        let node = adapter.node(&path_str(&file)).await.unwrap();
        assert_eq!(node.size_bytes, 7);
        assert!(!node.is_directory);
        assert!(node.checksum.is_none());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new();
        let missing = path_str(&temp_dir.path().join("absent"));
        assert!(!adapter.is_symlink(&missing).await.unwrap());
        assert!(!adapter.can_access(&missing, AccessMode::Exists).await);
        assert!(matches!(
            adapter.node(&missing).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_access_of_invalid_path() {
        let adapter = LocalAdapter::new();
        assert!(!adapter.can_access("bad\0name", AccessMode::Exists).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_undecodable_child_keeps_siblings() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let root = path_str(temp_dir.path());
        tokio::fs::write(temp_dir.path().join("good.txt"), b"x").await.unwrap();
        let bad = temp_dir.path().join(OsStr::from_bytes(b"bad\xff.txt"));
        if tokio::fs::write(&bad, b"y").await.is_err() {
            // Filesystem rejects non-UTF-8 names
            return;
        }

        let children = LocalAdapter::new().list_children(&root).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], Ok("good.txt".to_string()));
        let error = children[1].as_ref().unwrap_err();
        assert!(error.is_skippable());
        assert_eq!(error.errno(), 22);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_node() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("real");
        let link = temp_dir.path().join("link");
        tokio::fs::create_dir(&dir).await.unwrap();
        std::os::unix::fs::symlink(&dir, &link).unwrap();

        let adapter = LocalAdapter::new();
        assert!(adapter.is_symlink(&path_str(&link)).await.unwrap());
        assert!(adapter.is_directory(&path_str(&link)).await.unwrap());

        let node = adapter.node(&path_str(&link)).await.unwrap();
        assert!(node.is_symlink);
        assert!(node.is_directory);
        assert_eq!(node.link_target, Some(path_str(&dir)));
    }

    #[tokio::test]
    async fn test_list_and_create() {
        let temp_dir = TempDir::new().unwrap();
        let root = path_str(temp_dir.path());
        let adapter = LocalAdapter::new();

        adapter.create_directory(&format!("{root}/b")).await.unwrap();
        tokio::fs::write(temp_dir.path().join("a.txt"), b"x").await.unwrap();

        let children = adapter.list_children(&root).await.unwrap();
        assert_eq!(children, vec![Ok("a.txt".to_string()), Ok("b".to_string())]);

        let nested = adapter.create_directory(&format!("{root}/missing/child")).await;
        assert!(matches!(nested, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_transfer_and_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let destination = temp_dir.path().join("destination.txt");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let adapter = LocalAdapter::new();
        adapter
            .transfer(&path_str(&source), &path_str(&destination), false)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"hello");
        assert_eq!(
            adapter
                .checksum(&path_str(&destination))
                .await
                .unwrap()
                .to_string(),
            "5d41402abc4b2a76b9719d911017c592"
        );

        let head = adapter
            .transfer(&path_str(&source), &path_str(&destination), true)
            .await;
        assert!(matches!(head, Err(Error::Unsupported { .. })));
    }

    #[tokio::test]
    async fn test_readable() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        tokio::fs::write(&file, b"x").await.unwrap();

        let adapter = LocalAdapter::new();
        assert!(adapter.can_access(&path_str(&file), AccessMode::Read).await);
        assert!(
            adapter
                .can_access(&path_str(temp_dir.path()), AccessMode::Read)
                .await
        );
    }
}
