//! Relation file management under a database directory.

use std::path::{Path, PathBuf};

use super::error::HeapError;
use super::file::HeapFile;

/// Longest permitted relation file name.
const MAX_FILE_NAME: usize = 64;

/// Creates, opens, and destroys relation files under a base directory.
///
/// The manager holds no open handles itself; each call to
/// [`HeapManager::open_file`] returns an independently owned
/// [`HeapFile`] that closes when dropped.
#[derive(Debug, Clone)]
pub struct HeapManager {
    dir: PathBuf,
}

impl HeapManager {
    /// Creates a manager rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the base directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new relation file for records of `data_len` tuple bytes
    /// and `null_count` nullable attributes.
    pub fn create_file(
        &self,
        name: &str,
        data_len: usize,
        null_count: usize,
    ) -> Result<(), HeapError> {
        let path = self.path_for(name)?;
        HeapFile::create(&path, data_len, null_count)?;
        Ok(())
    }

    /// Opens the relation file `name`.
    pub fn open_file(&self, name: &str) -> Result<HeapFile, HeapError> {
        HeapFile::open(&self.path_for(name)?)
    }

    /// Removes the relation file `name` and all its records.
    pub fn destroy_file(&self, name: &str) -> Result<(), HeapError> {
        let path = self.path_for(name)?;
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HeapError::FileNotFound { name: name.into() }
            } else {
                HeapError::Io(e)
            }
        })
    }

    /// Returns true if a relation file `name` exists.
    pub fn file_exists(&self, name: &str) -> bool {
        match self.path_for(name) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, HeapError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_FILE_NAME
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(HeapError::InvalidName { name: name.into() });
        }
        Ok(self.dir.join(name))
    }
}
