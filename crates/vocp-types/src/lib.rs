//! Core type system and error handling for vocp
//!
//! This crate provides the foundational types shared by every vocp crate:
//!
//! - **Error handling**: [`Error`] with errno-style codes and transfer classification
//! - **Core types**: [`Node`], [`CutoutSpec`], [`CopyOptions`], [`CopyResult`]
//! - **Traits**: the [`StorageAdapter`] and [`NodeClient`] backend capabilities
//! - **Paths**: string helpers for scheme-prefixed remote paths
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use vocp_types::{CopyOptions, CopyResult, Error};
//!
//! let options = CopyOptions::new().exclude(".tmp,.log").ignore_errors(true);
//! assert_eq!(options.exclude_patterns.as_ref().map(Vec::len), Some(2));
//!
//! let mut result = CopyResult::new();
//! result.record_failed_skip(Error::InvalidArgument { message: "bad".into() }.errno());
//! assert_eq!(result.exit_code, 22);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod paths;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{errno, Error, TransferClass};
pub use result::Result;
pub use traits::*;
pub use types::*;
