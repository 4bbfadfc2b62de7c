//! Descriptor store
//!
//! Owns the scope directory: resolves descriptor paths, writes them
//! atomically, and enumerates the ones that follow our naming convention.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::context::ExecContext;
use crate::label;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write descriptor {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Descriptor files in one scope directory
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    dir: PathBuf,
}

impl DescriptorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_context(ctx: &ExecContext) -> Self {
        Self::new(ctx.scope_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<scope-dir>/<label>.plist`
    pub fn resolve_path(&self, label: &str) -> PathBuf {
        self.dir.join(label::file_name(label))
    }

    /// Write through a temporary file in the destination directory, then
    /// rename over the destination
    pub fn write(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        let err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path.parent().unwrap_or(&self.dir);
        std::fs::create_dir_all(dir).map_err(err)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(err)?;
        temp.write_all(content.as_bytes()).map_err(err)?;
        temp.as_file().sync_all().map_err(err)?;
        temp.persist(path).map_err(|e| err(e.error))?;

        log::debug!("Wrote descriptor {}", path.display());
        Ok(())
    }

    /// A file or symlink is present at `path`; the link target may be missing
    pub fn exists(&self, path: &Path) -> bool {
        is_descriptor_entry(path)
    }

    /// Best-effort delete. Missing files are fine; other failures are logged.
    pub fn remove(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed descriptor {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// Descriptor files present on disk, as (label, path), sorted by label
    pub fn descriptors(&self) -> Vec<(String, PathBuf)> {
        let pattern = self
            .dir
            .join(format!("{}.*.{}", label::NAMESPACE, label::EXTENSION));
        let Some(pattern) = pattern.to_str() else {
            log::warn!("Scope directory is not valid UTF-8: {}", self.dir.display());
            return Vec::new();
        };

        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("Bad descriptor pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };

        let mut found: Vec<(String, PathBuf)> = paths
            .flatten()
            .filter(|path| is_descriptor_entry(path))
            .filter_map(|path| {
                let file_name = path.file_name()?.to_str()?;
                let label = label::label_from_file_name(file_name)?.to_string();
                Some((label, path))
            })
            .collect();
        found.sort();
        found
    }
}

/// Anything but a directory, without following symlinks
fn is_descriptor_entry(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|meta| !meta.is_dir())
}
