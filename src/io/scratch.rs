use std::path::{Path, PathBuf};

/// Files removed when the guard is dropped, on success and failure alike
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Stop tracking `path` so it survives the guard
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|tracked| tracked != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scratch_files_removed_on_drop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let kept = temp_dir.path().join("kept.tif");
        let scratch = temp_dir.path().join("scratch.tif");
        std::fs::write(&kept, b"keep").unwrap();
        std::fs::write(&scratch, b"drop").unwrap();

        {
            let mut files = ScratchFiles::new();
            files.track(scratch.clone());
            files.track(temp_dir.path().join("never_created.tif"));
            assert_eq!(files.paths().len(), 2);
        }

        assert!(kept.exists());
        assert!(!scratch.exists());
    }

    #[test]
    fn test_released_file_survives() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let product = temp_dir.path().join("product.tif");
        std::fs::write(&product, b"keep").unwrap();

        {
            let mut files = ScratchFiles::new();
            files.track(product.clone());
            files.release(&product);
            assert!(files.paths().is_empty());
        }

        assert!(product.exists());
    }
}
