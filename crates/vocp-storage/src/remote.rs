//! Remote node store backend

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use vocp_types::{AccessMode, Checksum, Error, Node, NodeClient, Result, StorageAdapter};

const MAX_LINK_DEPTH: usize = 16;

/// Storage adapter delegating to a [`NodeClient`]
#[derive(Clone)]
pub struct RemoteAdapter {
    client: Arc<dyn NodeClient>,
}

impl std::fmt::Debug for RemoteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAdapter").finish_non_exhaustive()
    }
}

impl RemoteAdapter {
    /// Wrap a node store client
    pub fn new(client: Arc<dyn NodeClient>) -> Self {
        Self { client }
    }

    /// Expand a wildcard pattern through the client
    pub async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        debug!("glob({})", pattern);
        self.client.glob(pattern).await
    }
}

#[async_trait]
impl StorageAdapter for RemoteAdapter {
    fn is_remote(&self) -> bool {
        true
    }

    async fn node(&self, path: &str) -> Result<Node> {
        debug!("get_node({})", path);
        self.client.get_node(path).await
    }

    async fn is_directory(&self, path: &str) -> Result<bool> {
        let mut current = path.to_string();
        for _ in 0..MAX_LINK_DEPTH {
            let node = match self.client.get_node(&current).await {
                Ok(node) => node,
                Err(Error::NotFound { .. }) => return Ok(false),
                Err(e) => return Err(e),
            };
            if node.is_directory {
                return Ok(true);
            }
            match node.link_target {
                Some(target) if node.is_symlink => current = target,
                _ => return Ok(false),
            }
        }
        debug!("is_directory({}): link chain too deep", path);
        Ok(false)
    }

    async fn is_symlink(&self, path: &str) -> Result<bool> {
        Ok(self.client.get_node(path).await?.is_symlink)
    }

    async fn can_access(&self, path: &str, _mode: AccessMode) -> bool {
        match self.client.get_node(path).await {
            Ok(_) => true,
            Err(e) if e.is_access_denial() => {
                debug!("can_access({}): {}", path, e);
                false
            }
            Err(e) => {
                warn!("can_access({}): {}", path, e);
                false
            }
        }
    }

    async fn list_children(&self, path: &str) -> Result<Vec<Result<String>>> {
        let names = self.client.list_dir(path, true).await?;
        Ok(names.into_iter().map(Ok).collect())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.client.mkdir(path).await
    }

    async fn checksum(&self, path: &str) -> Result<Checksum> {
        Ok(self.client.get_node(path).await?.checksum_or_zero())
    }

    async fn transfer(&self, source: &str, destination: &str, headers_only: bool) -> Result<()> {
        debug!(
            "copy({}, {}, head={})",
            source, destination, headers_only
        );
        self.client.copy(source, destination, headers_only).await
    }
}
