//! Per-job output directories.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::InbetweenError;

/// Prefix of every per-job output directory.
pub const OUTPUT_DIR_PREFIX: &str = "genime_bf";

/// Where a job's frames are written.
#[derive(Debug)]
pub struct OutputDirectory {
    pub path: PathBuf,
    /// Set when the unique directory could not be created and `path` is the
    /// base directory instead.
    pub fallback: Option<InbetweenError>,
}

/// Returns a fresh `genime_bf_<uuid>` directory name.
pub fn unique_dir_name() -> String {
    format!("{}_{}", OUTPUT_DIR_PREFIX, Uuid::new_v4())
}

/// Creates a unique directory under `base`.
///
/// Never fails: if creation is refused the base directory is used and the
/// error is kept on the result.
pub fn create_unique_directory(base: &Path) -> OutputDirectory {
    let path = base.join(unique_dir_name());
    match std::fs::create_dir_all(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "Created output directory");
            OutputDirectory {
                path,
                fallback: None,
            }
        }
        Err(e) => {
            let error = InbetweenError::directory_create_failed(&path, e);
            warn!(error = %error.message, base = %base.display(), "Falling back to base output directory");
            OutputDirectory {
                path: base.to_path_buf(),
                fallback: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::tempdir;

    #[test]
    fn names_are_prefixed_and_unique() {
        let a = unique_dir_name();
        let b = unique_dir_name();
        assert!(a.starts_with("genime_bf_"));
        assert_ne!(a, b);
    }

    #[test]
    fn creates_directory_under_base() {
        let base = tempdir().unwrap();
        let first = create_unique_directory(base.path());
        let second = create_unique_directory(base.path());

        assert!(first.fallback.is_none());
        assert!(first.path.is_dir());
        assert_eq!(first.path.parent(), Some(base.path()));
        assert_ne!(first.path, second.path);
    }

    #[test]
    fn falls_back_to_base_when_creation_fails() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("not-a-dir");
        std::fs::write(&base, b"file in the way").unwrap();

        let output = create_unique_directory(&base);
        assert_eq!(output.path, base);
        let error = output.fallback.unwrap();
        assert_eq!(error.code, ErrorCode::DirectoryCreateFailed);
    }
}
