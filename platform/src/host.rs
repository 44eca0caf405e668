// Host directory enumeration
// Serves the tree mirror with names and counts. Yields a stable order
// (name-sorted) so repeated runs over the same tree line up.

use fatscope_core::{AnalyzerError, HostEnumerator};
use log::trace;
use std::path::{Path, PathBuf};

pub struct StdHostEnumerator;

impl StdHostEnumerator {
    fn list(&self, path: &Path, want_dirs: bool) -> Result<Vec<PathBuf>, AnalyzerError> {
        let reader = std::fs::read_dir(path).map_err(|source| access_error(path, source))?;

        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|source| access_error(path, source))?;
            let entry_path = entry.path();
            let is_dir = entry
                .file_type()
                .map_err(|source| access_error(&entry_path, source))?
                .is_dir();
            if is_dir == want_dirs {
                entries.push(entry_path);
            }
        }
        entries.sort();
        trace!(
            "{}: {} {}",
            path.display(),
            entries.len(),
            if want_dirs { "subdirectories" } else { "files" }
        );
        Ok(entries)
    }
}

impl HostEnumerator for StdHostEnumerator {
    fn list_subdirectories(&self, path: &Path) -> Result<Vec<PathBuf>, AnalyzerError> {
        self.list(path, true)
    }

    fn list_files(&self, path: &Path) -> Result<Vec<PathBuf>, AnalyzerError> {
        self.list(path, false)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn access_error(path: &Path, source: std::io::Error) -> AnalyzerError {
    match source.kind() {
        std::io::ErrorKind::PermissionDenied => AnalyzerError::AccessDenied {
            path: path.to_path_buf(),
            source,
        },
        std::io::ErrorKind::NotFound => AnalyzerError::PathNotFound(path.to_path_buf()),
        _ => AnalyzerError::Io(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_directories_and_files_separately_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let host = StdHostEnumerator;
        let dirs = host.list_subdirectories(dir.path()).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("alpha"), dir.path().join("zeta")]
        );
        let files = host.list_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt"), dir.path().join("b.txt")]);
        assert_eq!(host.entry_count(dir.path()).unwrap(), 4);
    }

    #[test]
    fn missing_path_maps_to_path_not_found() {
        let host = StdHostEnumerator;
        let err = host
            .list_files(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::PathNotFound(_)));
    }
}
