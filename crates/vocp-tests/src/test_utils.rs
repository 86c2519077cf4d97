//! Unified test utilities for vocp tests

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use vocp_storage::{MemoryNodeStore, Storage};
use vocp_types::{NodeClient, Result};

/// Files of the tree built by [`create_test_directory_structure`]
pub const TREE_FILES: [(&str, &[u8]); 4] = [
    ("small.fits", b"SIMPLE  =                    T"),
    ("notes.txt", b"observing log"),
    ("subdir1/file1.fits", b"BITPIX  =                  -32"),
    ("subdir1/nested/file2.fits", b"NAXIS   =                    2"),
];

/// Build a small local tree with files at several depths plus an empty
/// directory
pub fn create_test_directory_structure(base_path: &Path) -> io::Result<()> {
    create_files(base_path, &TREE_FILES)?;
    fs::create_dir_all(base_path.join("empty"))
}

/// Write `files` below `base_path`, creating parent directories as needed
pub fn create_files(base_path: &Path, files: &[(&str, &[u8])]) -> io::Result<()> {
    for (relative, data) in files {
        let path = base_path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
    }
    Ok(())
}

/// Relative paths of every file and directory below `root`, sorted, with a
/// trailing `/` on directories
pub fn local_tree(root: &Path) -> io::Result<Vec<String>> {
    let mut entries = Vec::new();
    walk_local(root, "", &mut entries)?;
    entries.sort();
    Ok(entries)
}

fn walk_local(dir: &Path, prefix: &str, entries: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
        if entry.file_type()?.is_dir() {
            entries.push(format!("{name}/"));
            walk_local(&entry.path(), &format!("{name}/"), entries)?;
        } else {
            entries.push(name);
        }
    }
    Ok(())
}

/// Relative paths of every node below `root` in a node store, in the same
/// shape as [`local_tree`]
pub async fn remote_tree(client: &dyn NodeClient, root: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut pending = vec![(root.trim_end_matches('/').to_string(), String::new())];
    while let Some((path, prefix)) = pending.pop() {
        for child in client.list_dir(&path, true).await? {
            let child_path = format!("{path}/{child}");
            let name = format!("{prefix}{child}");
            if client.get_node(&child_path).await?.is_directory {
                entries.push(format!("{name}/"));
                pending.push((child_path, format!("{name}/")));
            } else {
                entries.push(name);
            }
        }
    }
    entries.sort();
    Ok(entries)
}

/// Empty in-memory store serving `vos` and the storage routing to it
pub fn memory_storage() -> (Arc<MemoryNodeStore>, Storage) {
    let store = Arc::new(MemoryNodeStore::new());
    let storage = Storage::new(store.clone(), ["vos"]);
    (store, storage)
}

/// Seed a store with `files`, creating the containers on the way
pub fn seed_store(store: &MemoryNodeStore, root: &str, files: &[(&str, &[u8])]) -> Result<()> {
    for (relative, data) in files {
        let mut path = root.trim_end_matches('/').to_string();
        let mut components = relative.split('/').peekable();
        while let Some(component) = components.next() {
            path = format!("{path}/{component}");
            if components.peek().is_some() {
                if !store.contains(&path) {
                    store.add_dir(&path)?;
                }
            } else {
                store.add_file(&path, data)?;
            }
        }
    }
    Ok(())
}

/// Owned argument list for [`vocp_engine::CopyEngine::copy`]
pub fn sources(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// Lossy string form of a local path
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
