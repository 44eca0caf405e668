// Host filesystem enumeration seam
// The directory tree mirror never touches the disk itself; it consumes
// the names and counts this collaborator yields.

use crate::AnalyzerError;
use std::path::{Path, PathBuf};

/// Lists the children of a host directory. Implementations must yield a
/// stable order; the tree mirror records subdirectories first, then files.
pub trait HostEnumerator: Send + Sync {
    fn list_subdirectories(&self, path: &Path) -> Result<Vec<PathBuf>, AnalyzerError>;

    fn list_files(&self, path: &Path) -> Result<Vec<PathBuf>, AnalyzerError>;

    fn path_exists(&self, path: &Path) -> bool;

    /// Number of directory entries (subdirectories + files) under `path`.
    /// Used to bound on-disk directory scans.
    fn entry_count(&self, path: &Path) -> Result<usize, AnalyzerError> {
        Ok(self.list_subdirectories(path)?.len() + self.list_files(path)?.len())
    }
}
