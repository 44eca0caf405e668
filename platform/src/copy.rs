// Recursive host copy
// The collaborator the CLI invokes between two analysis runs to observe
// how a copy changes cluster allocation. Ordinary host file I/O; the
// analyzer core has no dependency on it.

use fatscope_core::AnalyzerError;
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files_copied: u64,
    pub directories_created: u64,
    pub bytes_copied: u64,
}

/// Copy the directory tree at `source` into `dest` (created if absent).
pub fn copy_directory(source: &Path, dest: &Path) -> Result<CopyStats, AnalyzerError> {
    if !source.is_dir() {
        return Err(AnalyzerError::PathNotFound(source.to_path_buf()));
    }

    let mut stats = CopyStats::default();
    copy_into(source, dest, &mut stats)?;
    info!(
        "copied {} files ({} bytes) in {} directories from {} to {}",
        stats.files_copied,
        stats.bytes_copied,
        stats.directories_created,
        source.display(),
        dest.display()
    );
    Ok(stats)
}

fn copy_into(source: &Path, dest: &Path, stats: &mut CopyStats) -> Result<(), AnalyzerError> {
    std::fs::create_dir_all(dest).map_err(|e| map_io(dest, e))?;
    stats.directories_created += 1;

    for entry in std::fs::read_dir(source).map_err(|e| map_io(source, e))? {
        let entry = entry.map_err(|e| map_io(source, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if entry.file_type().map_err(|e| map_io(&from, e))?.is_dir() {
            copy_into(&from, &to, stats)?;
        } else {
            debug!("copy {} -> {}", from.display(), to.display());
            stats.bytes_copied += std::fs::copy(&from, &to).map_err(|e| map_io(&from, e))?;
            stats.files_copied += 1;
        }
    }
    Ok(())
}

fn map_io(path: &Path, source: std::io::Error) -> AnalyzerError {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        AnalyzerError::AccessDenied {
            path: path.to_path_buf(),
            source,
        }
    } else {
        AnalyzerError::Io(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_nested_tree() {
        let from = tempfile::tempdir().unwrap();
        std::fs::create_dir(from.path().join("sub")).unwrap();
        std::fs::write(from.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(from.path().join("sub/b.bin"), b"abc").unwrap();

        let to = tempfile::tempdir().unwrap();
        let dest = to.path().join("clone");
        let stats = copy_directory(from.path(), &dest).unwrap();

        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.directories_created, 2);
        assert_eq!(stats.bytes_copied, 8);
        assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dest.join("sub/b.bin")).unwrap(), b"abc");
    }

    #[test]
    fn missing_source_is_path_not_found() {
        let to = tempfile::tempdir().unwrap();
        let err = copy_directory(Path::new("/no/such/tree"), to.path()).unwrap_err();
        assert!(matches!(err, AnalyzerError::PathNotFound(_)));
    }
}
