use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an analysis call. Chain-quality findings
/// (truncated/cyclic chains) are reported as data, not through this type.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Volume unavailable: {0}")]
    VolumeUnavailable(String),

    #[error("Invalid volume format: {0}")]
    InvalidVolumeFormat(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Access denied: {}", .path.display())]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory entry not found: {0}")]
    DirectoryEntryNotFound(String),

    /// A pipeline ordering contract was broken, e.g. a node resolved
    /// before its parent directory.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalyzerError {
    /// Short read from the volume: fewer bytes came back than requested.
    pub fn short_read(requested: usize, got: usize) -> Self {
        AnalyzerError::IoFailure(format!(
            "short read: requested {} bytes, got {}",
            requested, got
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_message_carries_byte_counts() {
        let err = AnalyzerError::short_read(512, 100);
        assert_eq!(err.to_string(), "I/O failure: short read: requested 512 bytes, got 100");
    }

    #[test]
    fn access_denied_preserves_source() {
        use std::error::Error;
        let err = AnalyzerError::AccessDenied {
            path: PathBuf::from("/locked"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.source().is_some());
    }
}
