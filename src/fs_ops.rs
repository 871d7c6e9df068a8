//! Filesystem capabilities used by the pipeline
//!
//! Each capability is a small trait so the pipeline can be driven with
//! fakes in tests. [`LocalFs`] implements all of them on the real filesystem.

use log::debug;
use std::fs;
use std::path::Path;

use crate::error::OrganizeError;

/// Byte-for-byte file copy
pub trait ByteCopier {
    /// Copy `source` to `destination`, creating parent folders and
    /// overwriting an existing destination. Returns the number of bytes copied.
    fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, OrganizeError>;
}

/// File deletion
pub trait PathDeleter {
    /// Delete the file at `path`. A missing file is not an error.
    fn delete_file(&self, path: &Path) -> Result<(), OrganizeError>;
}

/// Recursive directory creation
pub trait DirectoryCreator {
    /// Create `path` and any missing parents. An existing directory is not an error.
    fn create_directories(&self, path: &Path) -> Result<(), OrganizeError>;
}

/// Whether two paths name the same location
///
/// Equal paths always match; otherwise both must exist and resolve to the
/// same canonical path.
pub fn is_same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Capabilities backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl ByteCopier for LocalFs {
    fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, OrganizeError> {
        debug!("copying file {:?} to {:?}", source, destination);
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_directories(parent)?;
            }
        }
        fs::copy(source, destination).map_err(|e| OrganizeError::io(source, e))
    }
}

impl PathDeleter for LocalFs {
    fn delete_file(&self, path: &Path) -> Result<(), OrganizeError> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("deleted {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrganizeError::io(path, e)),
        }
    }
}

impl DirectoryCreator for LocalFs {
    fn create_directories(&self, path: &Path) -> Result<(), OrganizeError> {
        fs::create_dir_all(path).map_err(|e| OrganizeError::io(path, e))
    }
}
