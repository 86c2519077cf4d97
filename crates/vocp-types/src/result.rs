//! Result type alias for vocp operations

use crate::Error;

/// Result type alias for vocp operations
pub type Result<T> = std::result::Result<T, Error>;
