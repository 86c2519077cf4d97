//! Destination resolution with Unix `cp` target rules

use crate::pattern::ResolvedSource;
use tracing::debug;
use vocp_storage::Storage;
use vocp_types::paths;
use vocp_types::{AccessMode, Error, Result};

/// Computes the concrete destination of each source item
#[derive(Debug, Clone, Copy)]
pub struct DestinationResolver<'a> {
    storage: &'a Storage,
    source_count: usize,
}

impl<'a> DestinationResolver<'a> {
    /// Resolver for a run given `source_count` source arguments
    pub fn new(storage: &'a Storage, source_count: usize) -> Self {
        Self {
            storage,
            source_count,
        }
    }

    /// Destination for `source` when copying to `destination`.
    ///
    /// - directory source onto an existing directory: `destination/basename`
    /// - directory source onto an existing non-directory: error
    /// - directory source onto a missing path with several sources: error
    /// - anything onto a path ending in `/` or naming a directory:
    ///   `destination/basename`
    /// - otherwise `destination` itself
    pub async fn resolve(&self, source: &ResolvedSource, destination: &str) -> Result<String> {
        let source_adapter = self.storage.adapter(&source.path);
        let destination_adapter = self.storage.adapter(destination);
        let source_name = source.to_string();

        if source_adapter.is_directory(&source.path).await? {
            debug!("{} is a directory or link to one", source.path);
            if destination_adapter
                .can_access(destination, AccessMode::Exists)
                .await
            {
                if !destination_adapter.is_directory(destination).await? {
                    return Err(Error::usage(format!(
                        "Can't write a directory ({}) to a file ({})",
                        source.path, destination
                    )));
                }
                return Ok(paths::normalize(&paths::join(
                    destination,
                    paths::basename(&source_name),
                )));
            }
            if self.source_count > 1 {
                return Err(multiple_into_missing(destination));
            }
            return Ok(destination.to_string());
        }

        if paths::has_trailing_separator(destination)
            || destination_adapter.is_directory(destination).await?
        {
            return Ok(paths::join(destination, paths::basename(&source_name)));
        }

        Ok(destination.to_string())
    }
}

/// Error for several sources aimed at a destination that does not exist
pub fn multiple_into_missing(destination: &str) -> Error {
    Error::usage(format!(
        "can not copy multiple things into a non-existent location ({destination})"
    ))
}
