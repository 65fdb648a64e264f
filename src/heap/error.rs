//! Record-manager errors.

use std::fmt;

use super::record::Rid;

/// Errors from heap file operations.
#[derive(Debug)]
pub enum HeapError {
    /// Underlying file I/O failed.
    Io(std::io::Error),

    /// A file with this relation name already exists.
    FileExists { name: String },

    /// No file exists for this relation name.
    FileNotFound { name: String },

    /// Relation name is empty, too long, or contains a path separator.
    InvalidName { name: String },

    /// File contents do not look like a heap file.
    Corrupted(String),

    /// Record does not fit in a single page.
    RecordTooLarge { size: usize, max: usize },

    /// RID does not address a live record.
    InvalidRid(Rid),

    /// Record buffer lengths do not match the file's record layout.
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::Io(e) => write!(f, "i/o error: {}", e),
            HeapError::FileExists { name } => {
                write!(f, "relation file \"{}\" already exists", name)
            }
            HeapError::FileNotFound { name } => {
                write!(f, "relation file \"{}\" does not exist", name)
            }
            HeapError::InvalidName { name } => {
                write!(f, "invalid relation file name \"{}\"", name)
            }
            HeapError::Corrupted(msg) => write!(f, "corrupted heap file: {}", msg),
            HeapError::RecordTooLarge { size, max } => {
                write!(f, "record of {} bytes exceeds page capacity {}", size, max)
            }
            HeapError::InvalidRid(rid) => {
                write!(f, "rid ({}, {}) does not address a record", rid.page, rid.slot)
            }
            HeapError::LengthMismatch { expected, found } => {
                write!(
                    f,
                    "record length mismatch: expected {} bytes, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for HeapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeapError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HeapError {
    fn from(e: std::io::Error) -> Self {
        HeapError::Io(e)
    }
}
