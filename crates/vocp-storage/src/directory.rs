//! Node store backed by a local directory
//!
//! Serves the remote namespace from `remote.store_root`, so the tool can run
//! without a network service. Node URIs map onto paths below the root; `..`
//! never escapes it.

use crate::checksum::md5_file;
use crate::{cutout_start, glob};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use vocp_types::paths::{self, SEPARATOR};
use vocp_types::{Error, LockState, Node, NodeClient, Result};

/// Node store rooted at a local directory
#[derive(Debug, Clone)]
pub struct DirectoryNodeStore {
    schemes: Vec<String>,
    root: PathBuf,
}

impl DirectoryNodeStore {
    /// Serve `schemes` from `root`; the root must be an existing directory
    pub fn new<I, S>(root: impl Into<PathBuf>, schemes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::config(format!(
                "store root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
            root,
        })
    }

    /// Directory backing the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn serves(&self, path: &str) -> bool {
        paths::scheme(path).is_some_and(|scheme| self.schemes.iter().any(|s| s == scheme))
    }

    fn primary_scheme(&self) -> &str {
        self.schemes.first().map_or("vos", String::as_str)
    }

    /// Local path backing a node URI
    fn local_path(&self, path: &str) -> Result<PathBuf> {
        let rest = match paths::split_scheme(path) {
            Some((scheme, rest)) if self.schemes.iter().any(|s| s == scheme) => rest,
            _ => {
                return Err(Error::NotFound {
                    path: path.to_string(),
                })
            }
        };
        let body = match rest.strip_prefix("//") {
            Some(stripped) => stripped.find(SEPARATOR).map_or("", |end| &stripped[end..]),
            None => rest,
        };
        let normalized = paths::normalize(&format!("{SEPARATOR}{body}"));
        let relative = normalized.trim_start_matches(SEPARATOR);
        if relative.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(relative))
        }
    }

    /// Endpoint of a copy: node URIs map below the root, local paths stay
    fn endpoint(&self, path: &str) -> Result<PathBuf> {
        if self.serves(path) {
            self.local_path(path)
        } else {
            Ok(PathBuf::from(path))
        }
    }

    /// Present a link target below the root as a node URI
    fn target_uri(&self, target: &Path) -> String {
        match target.strip_prefix(&self.root) {
            Ok(relative) if target.is_absolute() => {
                let relative = relative.to_string_lossy().replace('\\', "/");
                format!("{}:{}", self.primary_scheme(), relative)
            }
            _ => target.to_string_lossy().into_owned(),
        }
    }
}

#[async_trait]
impl NodeClient for DirectoryNodeStore {
    async fn get_node(&self, path: &str) -> Result<Node> {
        let local = self.local_path(path)?;
        let link_metadata = tokio::fs::symlink_metadata(&local)
            .await
            .map_err(|e| Error::from_io(&e, path))?;

        let mut node = if link_metadata.file_type().is_symlink() {
            let target = tokio::fs::read_link(&local)
                .await
                .map_err(|e| Error::from_io(&e, path))?;
            let mut node = Node::symlink(path, self.target_uri(&target));
            if let Ok(metadata) = tokio::fs::metadata(&local).await {
                node.is_directory = metadata.is_dir();
            }
            node
        } else if link_metadata.is_dir() {
            Node::directory(path)
        } else {
            let mut node = Node::file(path, link_metadata.len());
            node.checksum = Some(md5_file(&local).await?);
            node
        };
        node.lock_state = Some(LockState::Unlocked);
        Ok(node)
    }

    async fn list_dir(&self, path: &str, force: bool) -> Result<Vec<String>> {
        debug!("list_dir({}, force={})", path, force);
        let local = self.local_path(path)?;
        let mut entries = tokio::fs::read_dir(&local)
            .await
            .map_err(|e| Error::from_io(&e, path))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::from_io(&e, path))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        debug!("mkdir({})", path);
        let local = self.local_path(path)?;
        tokio::fs::create_dir(&local)
            .await
            .map_err(|e| Error::from_io(&e, path))
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        glob::expand(self, pattern).await
    }

    async fn copy(&self, source: &str, destination: &str, head: bool) -> Result<()> {
        if head {
            return Err(Error::unsupported(
                "header-only transfers need a remote service",
            ));
        }

        let from = self.endpoint(source)?;
        if self.serves(source) && cutout_start(source).is_some() && !from.exists() {
            return Err(Error::unsupported(format!(
                "cutouts need a remote service: {source}"
            )));
        }
        let to = self.endpoint(destination)?;

        debug!("copy {} -> {}", from.display(), to.display());
        tokio::fs::copy(&from, &to)
            .await
            .map_err(|e| Error::from_io(&e, source))?;
        Ok(())
    }
}
