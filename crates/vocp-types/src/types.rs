//! Core data types for vocp
//!
//! Nodes are read-only snapshots produced by a storage backend. Options and
//! cutouts are fixed for the duration of a run; [`CopyResult`] is the only value
//! the engine mutates while copying.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a copy run
pub type OperationId = uuid::Uuid;

/// MD5 digest of a node's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Sentinel for "checksum unknown"
    pub const ZERO: Self = Self([0; 16]);

    /// Wrap a raw digest
    pub fn new(digest: [u8; 16]) -> Self {
        Self(digest)
    }

    /// Parse a 32-character hex digest
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !hex.is_ascii() {
            return None;
        }
        let mut digest = [0u8; 16];
        for (i, byte) in digest.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(digest))
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Whether this is the unknown sentinel
    pub fn is_unknown(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Lock flag of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LockState {
    /// Node can be written
    #[default]
    Unlocked,
    /// Node is locked against writes
    Locked,
}

/// One storage object, local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// Full path or URI of the node
    pub path: String,
    /// Whether the node is a directory (container)
    pub is_directory: bool,
    /// Whether the node is a symbolic link
    pub is_symlink: bool,
    /// Link target for symbolic links
    pub link_target: Option<String>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Content checksum, remote nodes only
    pub checksum: Option<Checksum>,
    /// Lock flag, remote nodes only
    pub lock_state: Option<LockState>,
}

impl Node {
    /// A plain file node
    pub fn file(path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            is_symlink: false,
            link_target: None,
            size_bytes,
            checksum: None,
            lock_state: None,
        }
    }

    /// A directory node
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            is_directory: true,
            ..Self::file(path, 0)
        }
    }

    /// A symbolic link node
    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            is_symlink: true,
            link_target: Some(target.into()),
            ..Self::file(path, 0)
        }
    }

    /// Checksum or the unknown sentinel
    pub fn checksum_or_zero(&self) -> Checksum {
        self.checksum.unwrap_or(Checksum::ZERO)
    }

    /// Whether the node is locked
    pub fn is_locked(&self) -> bool {
        self.lock_state == Some(LockState::Locked)
    }
}

/// Access check performed by `can_access`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Path exists
    Exists,
    /// Path exists and is readable
    Read,
}

/// Grammar a cutout suffix was written in
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CutoutKind {
    /// `[x1:x2,y1:y2]` pixel ranges, possibly repeated per extension
    PixelRange,
    /// `(ra,dec,radius)` sky region
    Spatial {
        /// Right ascension
        ra: f64,
        /// Declination
        dec: f64,
        /// Radius
        radius: f64,
    },
}

/// Sub-region request attached to a remote source path
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutoutSpec {
    /// Which grammar matched
    pub kind: CutoutKind,
    /// The suffix exactly as written by the caller
    pub suffix: String,
}

impl CutoutSpec {
    /// Re-attach the suffix to an expanded path
    pub fn apply(&self, path: &str) -> String {
        format!("{path}{}", self.suffix)
    }
}

impl fmt::Display for CutoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix)
    }
}

/// Options for one copy invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Skip leaves whose destination contains any of these substrings
    pub exclude_patterns: Option<Vec<String>>,
    /// Copy only leaves whose destination contains one of these substrings
    pub include_patterns: Option<Vec<String>>,
    /// Dereference symbolic links instead of skipping them
    pub follow_symlinks: bool,
    /// Ask before overwriting existing files
    pub interactive_overwrite: bool,
    /// Keep going after persistent transfer errors
    pub ignore_errors: bool,
    /// Copy only file headers (remote sources)
    pub headers_only: bool,
}

impl CopyOptions {
    /// Create options with every flag off
    pub fn new() -> Self {
        Self::default()
    }

    /// Set comma-separated exclude substrings
    pub fn exclude(mut self, patterns: &str) -> Self {
        self.exclude_patterns = Some(split_patterns(patterns));
        self
    }

    /// Set comma-separated include substrings
    pub fn include(mut self, patterns: &str) -> Self {
        self.include_patterns = Some(split_patterns(patterns));
        self
    }

    /// Follow symbolic links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Prompt before overwriting
    pub fn interactive_overwrite(mut self, interactive: bool) -> Self {
        self.interactive_overwrite = interactive;
        self
    }

    /// Ignore persistent transfer errors
    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    /// Transfer headers only
    pub fn headers_only(mut self, head: bool) -> Self {
        self.headers_only = head;
        self
    }
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns.split(',').map(str::to_string).collect()
}

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CopyStats {
    /// Leaves transferred successfully
    pub files_copied: u64,
    /// Destination directories created
    pub directories_created: u64,
    /// Leaves skipped by filters or errors
    pub files_skipped: u64,
    /// Symbolic links skipped
    pub symlinks_skipped: u64,
    /// Transfer attempts that were retried
    pub retries: u64,
}

impl CopyStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }
}

/// Accumulated outcome of a copy run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CopyResult {
    /// Identifier used in log spans
    pub run_id: OperationId,
    /// Sum of the error codes of every non-fatal failure
    pub exit_code: i32,
    /// Counters
    pub stats: CopyStats,
}

impl CopyResult {
    /// Start a new run
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            exit_code: 0,
            stats: CopyStats::new(),
        }
    }

    /// Add a non-fatal error code to the aggregate
    pub fn add_error_code(&mut self, code: i32) {
        self.exit_code = self.exit_code.wrapping_add(code);
    }

    /// Record a skipped leaf that contributes `code` to the aggregate
    pub fn record_failed_skip(&mut self, code: i32) {
        self.stats.files_skipped += 1;
        self.add_error_code(code);
    }

    /// Whether no non-fatal error was recorded
    pub fn is_clean(&self) -> bool {
        self.exit_code == 0
    }
}

impl Default for CopyResult {
    fn default() -> Self {
        Self::new()
    }
}
