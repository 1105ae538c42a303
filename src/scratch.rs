use crate::error::SplitError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Run-scoped temporary directory holding the single-page units of one source.
///
/// Created once per run and removed once: either explicitly through
/// [`ScratchArea::close`], which reports failures, or on drop when a run is
/// abandoned early.
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Create a fresh directory, under `parent` if given, else the system temp dir
    pub fn create(parent: Option<&Path>) -> Result<Self, SplitError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chapsplit-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| SplitError::Scratch(format!("failed to create scratch directory: {}", e)))?;

        debug!("created scratch area {}", dir.path().display());
        Ok(ScratchArea { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of the unit for a 1-based page number
    pub fn page_path(&self, page: u32) -> PathBuf {
        self.dir.path().join(format!("page_{:04}.pdf", page))
    }

    /// Remove the directory and every page unit in it
    pub fn close(self) -> Result<(), SplitError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| SplitError::Cleanup {
                path: path.clone(),
                source,
            })?;
        debug!("removed scratch area {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_close() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchArea::create(Some(parent.path())).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.starts_with(parent.path()));
        assert!(path.is_dir());

        std::fs::write(scratch.page_path(1), b"x").unwrap();
        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchArea::create(Some(parent.path())).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_distinct_runs_do_not_collide() {
        let parent = tempfile::tempdir().unwrap();
        let a = ScratchArea::create(Some(parent.path())).unwrap();
        let b = ScratchArea::create(Some(parent.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_page_path_naming() {
        let scratch = ScratchArea::create(None).unwrap();
        assert!(scratch.page_path(7).ends_with("page_0007.pdf"));
        assert!(scratch.page_path(12345).ends_with("page_12345.pdf"));
    }

    #[test]
    fn test_missing_parent_is_scratch_error() {
        let parent = tempfile::tempdir().unwrap();
        let missing = parent.path().join("nope");
        let err = ScratchArea::create(Some(&missing)).err().unwrap();
        assert!(matches!(err, SplitError::Scratch(_)));
    }
}
