//! Fatal copy errors with the context they occurred in

use vocp_types::{errno, Error};

/// A fatal error that ended a copy run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct CopyError {
    /// Underlying error
    pub error: Error,
    /// Source being copied when the error occurred
    pub source_path: Option<String>,
    /// Destination being written when the error occurred
    pub destination: String,
}

impl CopyError {
    /// Wrap `error` raised while writing `destination`
    pub fn new(error: Error, destination: impl Into<String>) -> Self {
        Self {
            error,
            source_path: None,
            destination: destination.into(),
        }
    }

    /// Attach the source being copied
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_path = Some(source.into());
        self
    }

    /// Hint shown to the user after the error, for failures with a known fix
    pub fn remediation(&self) -> Option<String> {
        match &self.error {
            Error::NodeLocked { .. } => Some(format!(
                "Clear the lock on the node before copying to {}.",
                self.destination
            )),
            error if error.errno() == errno::EREMOTE => Some(format!(
                "Failure at remote server while copying {} -> {}",
                self.source_path.as_deref().unwrap_or("?"),
                self.destination
            )),
            _ => None,
        }
    }

    /// Process exit status for a fatal error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_remediation() {
        let error = CopyError::new(
            Error::NodeLocked {
                path: "vos:out/a.fits".into(),
            },
            "vos:out/a.fits",
        );
        assert_eq!(error.to_string(), "NodeLocked: vos:out/a.fits");
        assert_eq!(
            error.remediation().unwrap(),
            "Clear the lock on the node before copying to vos:out/a.fits."
        );
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_remote_failure_remediation() {
        let error = CopyError::new(
            Error::RemoteFailure {
                message: "500 Internal Server Error".into(),
            },
            "/tmp/a.fits",
        )
        .with_source("vos:a.fits");
        assert_eq!(
            error.remediation().unwrap(),
            "Failure at remote server while copying vos:a.fits -> /tmp/a.fits"
        );
    }

    #[test]
    fn test_no_remediation() {
        let error = CopyError::new(Error::usage("bad"), "x");
        assert!(error.remediation().is_none());
    }
}
