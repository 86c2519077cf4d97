//! Error types and handling for vocp
//!
//! Every backend reports failures through [`Error`]. The copy engine never
//! inspects error messages; it relies on [`Error::errno`] and
//! [`Error::transfer_class`] to decide between retrying, skipping and aborting.

/// errno-like codes carried by errors and summed into the run's exit status.
///
/// The values are the Linux ones, which is what the remote service reports
/// regardless of the client platform.
pub mod errno {
    /// No such file or directory
    pub const ENOENT: i32 = 2;
    /// I/O error
    pub const EIO: i32 = 5;
    /// Permission denied
    pub const EACCES: i32 = 13;
    /// Invalid argument
    pub const EINVAL: i32 = 22;
    /// Object is remote
    pub const EREMOTE: i32 = 66;
    /// Connection reset by peer
    pub const ECONNRESET: i32 = 104;
    /// Code used when an error carries no errno of its own
    pub const UNKNOWN: i32 = -1;
}

/// How a failed transfer should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferClass {
    /// The peer reset the connection
    ConnectionReset,
    /// Low-level I/O failure
    Io,
    /// Anything else
    Other,
}

/// Main error type for vocp operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
        /// OS error code, [`errno::UNKNOWN`] when none was reported
        errno: i32,
    },

    /// Node or file does not exist
    #[error("Not found: {path}")]
    NotFound {
        /// Path that was looked up
        path: String,
    },

    /// Access refused by the backend
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path with permission issues
        path: String,
    },

    /// Caller is not authenticated for the path
    #[error("Unauthorized: {path}")]
    Unauthorized {
        /// Path that required credentials
        path: String,
    },

    /// Invalid path or argument given to a local filesystem call
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Connection reset by the remote peer
    #[error("Connection reset by peer: {message}")]
    ConnectionReset {
        /// Error message from the transport
        message: String,
    },

    /// Remote node is locked
    #[error("NodeLocked: {path}")]
    NodeLocked {
        /// Locked node
        path: String,
    },

    /// The remote service failed while serving the request
    #[error("Remote failure: {message}")]
    RemoteFailure {
        /// Error message reported by the service
        message: String,
    },

    /// Copy between two different remote services
    #[error("Can not copy between services ({from} -> {to})")]
    CrossService {
        /// Source path
        from: String,
        /// Destination path
        to: String,
    },

    /// Invalid invocation detected by the engine
    #[error("{message}")]
    Usage {
        /// Description of the problem
        message: String,
    },

    /// User declined to overwrite an existing file
    #[error("File exists: {path}")]
    OverwriteDeclined {
        /// Existing destination
        path: String,
    },

    /// Backend does not support the requested operation
    #[error("Unsupported operation: {message}")]
    Unsupported {
        /// Description of the unsupported request
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

impl Error {
    /// errno-like code of this error, [`errno::UNKNOWN`] when it has none
    pub fn errno(&self) -> i32 {
        match self {
            Self::Io { errno, .. } => *errno,
            Self::NotFound { .. } => errno::ENOENT,
            Self::PermissionDenied { .. } => errno::EACCES,
            Self::InvalidArgument { .. } => errno::EINVAL,
            Self::ConnectionReset { .. } => errno::ECONNRESET,
            Self::RemoteFailure { .. } => errno::EREMOTE,
            _ => errno::UNKNOWN,
        }
    }

    /// Classify a transfer failure for the retry policy
    pub fn transfer_class(&self) -> TransferClass {
        match self.errno() {
            errno::ECONNRESET => TransferClass::ConnectionReset,
            errno::EIO => TransferClass::Io,
            _ => TransferClass::Other,
        }
    }

    /// Local invalid-path conditions are skipped instead of aborting the run
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Lookup failures that `can_access` folds into `false`
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::PermissionDenied { .. } | Self::Unauthorized { .. }
        )
    }

    /// Map an I/O error on `path` to the matching variant
    pub fn from_io(error: &std::io::Error, path: impl Into<String>) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => {
                let mut mapped = Self::from_io_error(error);
                if let Self::Io { message, .. } | Self::InvalidArgument { message } = &mut mapped {
                    *message = format!("{path}: {message}");
                }
                mapped
            }
        }
    }

    fn from_io_error(error: &std::io::Error) -> Self {
        let message = error.to_string();
        match (error.raw_os_error(), error.kind()) {
            (Some(errno::EINVAL), _) | (None, std::io::ErrorKind::InvalidInput) => {
                Self::InvalidArgument { message }
            }
            (Some(errno::ECONNRESET), _) | (None, std::io::ErrorKind::ConnectionReset) => {
                Self::ConnectionReset { message }
            }
            (Some(code), _) => Self::Io {
                message,
                errno: code,
            },
            (None, _) => Self::Io {
                message,
                errno: errno::UNKNOWN,
            },
        }
    }

    /// Create a new I/O error with an explicit code
    pub fn io<S: Into<String>>(message: S, errno: i32) -> Self {
        Self::Io {
            message: message.into(),
            errno,
        }
    }

    /// Create a new usage error
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new unsupported-operation error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                path: error.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: error.to_string(),
            },
            _ => Self::from_io_error(&error),
        }
    }
}
