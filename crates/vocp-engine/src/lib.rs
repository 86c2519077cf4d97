//! Copy engine for vocp
//!
//! The engine copies trees between the local filesystem and a remote node
//! store with Unix `cp` semantics:
//!
//! 1. [`PatternResolver`] splits off cutout suffixes and expands wildcards
//! 2. [`DestinationResolver`] applies the `cp` target rules per source
//! 3. [`CopyEngine`] walks each source tree, filters leaves and transfers them
//! 4. [`TransferRetryPolicy`] decides whether a failed transfer is retried,
//!    skipped or fatal
//!
//! Skipped items add their error code to [`CopyResult::exit_code`]; a fatal
//! error ends the run as a [`CopyError`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use vocp_engine::CopyEngine;
//! use vocp_storage::{MemoryNodeStore, Storage};
//! use vocp_types::CopyOptions;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryNodeStore::new());
//! store.add_file("vos:img.fits", b"SIMPLE").unwrap();
//!
//! let engine = CopyEngine::new(Storage::new(store.clone(), ["vos"]), CopyOptions::new());
//! let result = engine
//!     .copy(&["vos:img.fits".to_string()], "vos:renamed.fits")
//!     .await
//!     .unwrap();
//! assert_eq!(result.exit_code, 0);
//! assert_eq!(store.read_file("vos:renamed.fits").unwrap(), b"SIMPLE");
//! # });
//! ```

#![deny(missing_docs)]

pub mod destination;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod retry;

pub use destination::DestinationResolver;
pub use engine::{absolute_local, CopyEngine, EngineBuilder};
pub use error::CopyError;
pub use pattern::{split_cutout, PatternResolver, ResolvedSource};
pub use retry::{RetryDecision, TransferOutcome, TransferRetryPolicy};

pub use vocp_types::{CopyOptions, CopyResult, CopyStats};
