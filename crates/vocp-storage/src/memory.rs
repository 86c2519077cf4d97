//! In-memory node store
//!
//! A complete [`NodeClient`] holding its tree in a map. Besides serving the
//! engine's tests it can script transfer failures per source path and records
//! every transfer attempt it receives.

use crate::checksum::md5_bytes;
use crate::{cutout_start, glob};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use vocp_types::paths::{self, SEPARATOR};
use vocp_types::{Checksum, Error, LockState, Node, NodeClient, Result};

const ENOTDIR: i32 = 20;
const EISDIR: i32 = 21;
const EEXIST: i32 = 17;
const MAX_LINK_DEPTH: usize = 16;

/// Bytes kept by a header-only transfer: one FITS header block
pub const HEADER_BYTES: usize = 2880;

#[derive(Debug, Clone)]
enum Entry {
    Directory,
    File {
        data: Vec<u8>,
        checksum: Option<Checksum>,
    },
    Link {
        target: String,
    },
}

/// One `copy` call received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Source exactly as passed
    pub source: String,
    /// Destination exactly as passed
    pub destination: String,
    /// Whether only headers were requested
    pub head: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: BTreeMap<String, Entry>,
    locked: HashSet<String>,
    scripted_failures: HashMap<String, VecDeque<Error>>,
    persistent_failures: HashMap<String, Error>,
    transfers: Vec<TransferRecord>,
}

/// Node store kept entirely in memory
#[derive(Debug)]
pub struct MemoryNodeStore {
    schemes: Vec<String>,
    state: Mutex<StoreState>,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStore {
    /// Empty store serving the `vos` scheme
    pub fn new() -> Self {
        Self::with_schemes(["vos"])
    }

    /// Empty store serving the given schemes, all sharing one namespace
    pub fn with_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = StoreState::default();
        state.entries.insert(String::new(), Entry::Directory);
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn serves(&self, path: &str) -> bool {
        paths::scheme(path).is_some_and(|scheme| self.schemes.iter().any(|s| s == scheme))
    }

    /// Map a node URI to its key in the tree; the root is the empty key
    fn key(&self, path: &str) -> Result<String> {
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
        Ok(normalized.trim_start_matches(SEPARATOR).to_string())
    }

    fn parent_key(key: &str) -> &str {
        key.rfind(SEPARATOR).map_or("", |pos| &key[..pos])
    }

    /// Follow links from `key` until a non-link entry is reached
    fn resolve(&self, state: &StoreState, path: &str) -> Result<(String, Entry)> {
        let mut key = self.key(path)?;
        for _ in 0..MAX_LINK_DEPTH {
            match state.entries.get(&key) {
                Some(Entry::Link { target }) => key = self.key(target)?,
                Some(entry) => return Ok((key, entry.clone())),
                None => {
                    return Err(Error::NotFound {
                        path: path.to_string(),
                    })
                }
            }
        }
        Err(Error::io(format!("{path}: Too many levels of symbolic links"), 40))
    }

    fn insert(&self, path: &str, entry: Entry) -> Result<()> {
        let key = self.key(path)?;
        let mut state = self.state();
        if state.entries.contains_key(&key) {
            return Err(Error::io(format!("{path}: File exists"), EEXIST));
        }
        match state.entries.get(Self::parent_key(&key)) {
            Some(Entry::Directory) => {}
            _ => {
                return Err(Error::NotFound {
                    path: path.to_string(),
                })
            }
        }
        state.entries.insert(key, entry);
        Ok(())
    }

    /// Add a container node; its parent must exist
    pub fn add_dir(&self, path: &str) -> Result<()> {
        self.insert(path, Entry::Directory)
    }

    /// Add a data node whose checksum property is the MD5 of `data`
    pub fn add_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.insert(
            path,
            Entry::File {
                data: data.to_vec(),
                checksum: Some(md5_bytes(data)),
            },
        )
    }

    /// Add a link node pointing at another node URI
    pub fn add_symlink(&self, path: &str, target: &str) -> Result<()> {
        self.insert(
            path,
            Entry::Link {
                target: target.to_string(),
            },
        )
    }

    /// Drop the checksum property of a data node
    pub fn clear_checksum(&self, path: &str) -> Result<()> {
        let key = self.key(path)?;
        let mut state = self.state();
        match state.entries.get_mut(&key) {
            Some(Entry::File { checksum, .. }) => {
                *checksum = None;
                Ok(())
            }
            _ => Err(Error::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Lock a node against writes
    pub fn lock(&self, path: &str) -> Result<()> {
        let key = self.key(path)?;
        self.state().locked.insert(key);
        Ok(())
    }

    /// Make the next `copy` calls from `source` fail with `errors`, in order
    pub fn fail_next<I>(&self, source: &str, errors: I)
    where
        I: IntoIterator<Item = Error>,
    {
        self.state()
            .scripted_failures
            .entry(source.to_string())
            .or_default()
            .extend(errors);
    }

    /// Make every `copy` call from `source` fail with `error`
    pub fn fail_always(&self, source: &str, error: Error) {
        self.state()
            .persistent_failures
            .insert(source.to_string(), error);
    }

    /// Every `copy` call received so far, failed ones included
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.state().transfers.clone()
    }

    /// Content of a data node
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state();
        match self.resolve(&state, path) {
            Ok((_, Entry::File { data, .. })) => Some(data),
            _ => None,
        }
    }

    /// Whether a node exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.key(path)
            .is_ok_and(|key| self.state().entries.contains_key(&key))
    }

    /// Whether `path` is a container node
    pub fn is_dir(&self, path: &str) -> bool {
        let state = self.state();
        matches!(self.resolve(&state, path), Ok((_, Entry::Directory)))
    }

    fn read_data(&self, path: &str) -> Result<Vec<u8>> {
        let node_path = cutout_start(path).map_or(path, |start| &path[..start]);
        let state = self.state();
        match self.resolve(&state, node_path)? {
            (_, Entry::File { data, .. }) => Ok(data),
            _ => Err(Error::io(format!("{path}: Is a directory"), EISDIR)),
        }
    }

    fn write_data(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let key = self.key(path)?;
        let mut state = self.state();
        if state.locked.contains(&key) {
            return Err(Error::NodeLocked {
                path: path.to_string(),
            });
        }
        match state.entries.get(&key) {
            Some(Entry::Directory) => {
                return Err(Error::io(format!("{path}: Is a directory"), EISDIR));
            }
            Some(_) => {}
            None => match state.entries.get(Self::parent_key(&key)) {
                Some(Entry::Directory) => {}
                _ => {
                    return Err(Error::NotFound {
                        path: path.to_string(),
                    })
                }
            },
        }
        let checksum = Some(md5_bytes(&data));
        state.entries.insert(key, Entry::File { data, checksum });
        Ok(())
    }
}

#[async_trait]
impl NodeClient for MemoryNodeStore {
    async fn get_node(&self, path: &str) -> Result<Node> {
        let key = self.key(path)?;
        let state = self.state();
        let entry = state.entries.get(&key).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;

        let mut node = match entry {
            Entry::Directory => Node::directory(path),
            Entry::File { data, checksum } => {
                let mut node = Node::file(path, data.len() as u64);
                node.checksum = *checksum;
                node
            }
            Entry::Link { target } => Node::symlink(path, target.as_str()),
        };
        node.lock_state = Some(if state.locked.contains(&key) {
            LockState::Locked
        } else {
            LockState::Unlocked
        });
        Ok(node)
    }

    async fn list_dir(&self, path: &str, force: bool) -> Result<Vec<String>> {
        debug!("list_dir({}, force={})", path, force);
        let state = self.state();
        let (key, entry) = self.resolve(&state, path)?;
        if !matches!(entry, Entry::Directory) {
            return Err(Error::io(format!("{path}: Not a directory"), ENOTDIR));
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}{SEPARATOR}")
        };
        Ok(state
            .entries
            .keys()
            .filter(|child| !child.is_empty())
            .filter_map(|child| child.strip_prefix(prefix.as_str()))
            .filter(|name| !name.is_empty() && !name.contains(SEPARATOR))
            .map(str::to_string)
            .collect())
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        debug!("mkdir({})", path);
        self.add_dir(path)
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        glob::expand(self, pattern).await
    }

    async fn copy(&self, source: &str, destination: &str, head: bool) -> Result<()> {
        {
            let mut state = self.state();
            state.transfers.push(TransferRecord {
                source: source.to_string(),
                destination: destination.to_string(),
                head,
            });
            if let Some(error) = state
                .scripted_failures
                .get_mut(source)
                .and_then(VecDeque::pop_front)
            {
                return Err(error);
            }
            if let Some(error) = state.persistent_failures.get(source) {
                return Err(error.clone());
            }
        }

        let mut data = if self.serves(source) {
            self.read_data(source)?
        } else {
            tokio::fs::read(source)
                .await
                .map_err(|e| Error::from_io(&e, source))?
        };
        if head {
            data.truncate(HEADER_BYTES);
        }

        if self.serves(destination) {
            self.write_data(destination, data)
        } else if self.serves(source) {
            tokio::fs::write(destination, data)
                .await
                .map_err(|e| Error::from_io(&e, destination))
        } else {
            Err(Error::unsupported(format!(
                "neither {source} nor {destination} is a node"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tree_and_nodes() {
        let store = MemoryNodeStore::new();
        store.add_dir("vos:data").unwrap();
        store.add_file("vos:data/a.fits", b"hello").unwrap();
        store.add_symlink("vos:link", "vos:data").unwrap();
        store.lock("vos:data/a.fits").unwrap();

        let node = store.get_node("vos:data/a.fits").await.unwrap();
        assert_eq!(node.size_bytes, 5);
        assert_eq!(
            node.checksum_or_zero().to_string(),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert!(node.is_locked());

        let link = store.get_node("vos:link").await.unwrap();
        assert!(link.is_symlink);
        assert_eq!(link.link_target.as_deref(), Some("vos:data"));

        assert_eq!(store.list_dir("vos:", true).await.unwrap(), vec!["data", "link"]);
        assert_eq!(store.list_dir("vos:link", true).await.unwrap(), vec!["a.fits"]);
        assert!(store.is_dir("vos:link"));
        assert!(store.contains("vos:/data/./a.fits"));
    }

    #[tokio::test]
    async fn test_missing_parent_and_duplicates() {
        let store = MemoryNodeStore::new();
        assert!(matches!(
            store.mkdir("vos:a/b").await,
            Err(Error::NotFound { .. })
        ));
        store.mkdir("vos:a").await.unwrap();
        let duplicate = store.mkdir("vos:a").await.unwrap_err();
        assert_eq!(duplicate.errno(), EEXIST);
        assert!(matches!(
            store.get_node("vos:absent").await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.get_node("arc:a").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_both_directions() {
        let temp_dir = TempDir::new().unwrap();
        let local_source = temp_dir.path().join("up.txt");
        let local_destination = temp_dir.path().join("down.txt");
        tokio::fs::write(&local_source, b"payload").await.unwrap();

        let store = MemoryNodeStore::new();
        let source = local_source.to_string_lossy().into_owned();
        store.copy(&source, "vos:up.txt", false).await.unwrap();
        assert_eq!(store.read_file("vos:up.txt").unwrap(), b"payload");

        let destination = local_destination.to_string_lossy().into_owned();
        store
            .copy("vos:up.txt[1:2]", &destination, false)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&local_destination).await.unwrap(), b"payload");

        store.copy("vos:up.txt", "vos:copy.txt", false).await.unwrap();
        assert_eq!(store.read_file("vos:copy.txt").unwrap(), b"payload");

        let transfers = store.transfers();
        assert_eq!(transfers.len(), 3);
        assert_eq!(transfers[1].source, "vos:up.txt[1:2]");
    }

    #[tokio::test]
    async fn test_header_only_copy() {
        let store = MemoryNodeStore::new();
        store.add_file("vos:big.fits", &vec![7u8; HEADER_BYTES * 3]).unwrap();
        store.copy("vos:big.fits", "vos:head.fits", true).await.unwrap();
        assert_eq!(store.read_file("vos:head.fits").unwrap().len(), HEADER_BYTES);
    }

    #[tokio::test]
    async fn test_locked_destination() {
        let store = MemoryNodeStore::new();
        store.add_file("vos:a", b"1").unwrap();
        store.add_file("vos:b", b"2").unwrap();
        store.lock("vos:b").unwrap();

        let error = store.copy("vos:a", "vos:b", false).await.unwrap_err();
        assert_eq!(error, Error::NodeLocked { path: "vos:b".into() });
        assert_eq!(store.read_file("vos:b").unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let store = MemoryNodeStore::new();
        store.add_file("vos:a", b"1").unwrap();
        store.fail_next(
            "vos:a",
            [
                Error::io("disk", vocp_types::errno::EIO),
                Error::ConnectionReset {
                    message: "reset".into(),
                },
            ],
        );

        assert_eq!(
            store.copy("vos:a", "vos:b", false).await.unwrap_err().errno(),
            5
        );
        assert_eq!(
            store.copy("vos:a", "vos:b", false).await.unwrap_err().errno(),
            104
        );
        store.copy("vos:a", "vos:b", false).await.unwrap();

        store.fail_always("vos:a", Error::other("broken"));
        for _ in 0..3 {
            assert!(store.copy("vos:a", "vos:c", false).await.is_err());
        }
        assert_eq!(store.transfers().len(), 6);
    }
}
