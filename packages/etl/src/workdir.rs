//! Scoped ownership of the download directory.

use std::io;
use std::path::{Path, PathBuf};

/// A directory that exists for the lifetime of this value.
///
/// [`DownloadDir::create`] starts from an empty directory, clearing any
/// leftovers from an interrupted run, and `Drop` removes it again.
#[derive(Debug)]
pub struct DownloadDir {
    path: PathBuf,
}

impl DownloadDir {
    /// Creates `path` (and its parents), emptying it if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be cleared or created.
    pub fn create(path: &Path) -> io::Result<Self> {
        if path.exists() {
            log::warn!("Clearing stale download directory {}", path.display());
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;
        log::debug!("Created download directory {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::info!("Removed download directory {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove download directory {}: {e}",
                self.path.display()
            ),
        }
    }
}
