//! Executor-specific errors.
//!
//! One variant per statement-validation failure, plus wrappers for the
//! catalog and record-manager errors that bubble through a statement.
//! End-of-scan is not represented here: scans report it as `Ok(None)`
//! and the drivers consume it.

use std::fmt;

use crate::catalog::CatalogError;
use crate::datum::AttrType;
use crate::heap::HeapError;

/// Errors that can occur while validating or executing a statement.
#[derive(Debug)]
pub enum ExecutorError {
    /// Reference names a missing attribute, or a qualified reference
    /// outside the statement's relations.
    AttrNotExist { attr: String },

    /// Unqualified name occurs in more than one FROM relation.
    AmbiguousAttrName { attr: String },

    /// Attribute-to-attribute condition over differing attribute types.
    AttrTypesMismatch { lhs: AttrType, rhs: AttrType },

    /// A value is not assignable to its target attribute.
    ValueTypesMismatch { attr: String, attr_type: AttrType },

    /// INSERT value count differs from the attribute count.
    AttrCountMismatch { expected: usize, found: usize },

    /// A string value exceeds the attribute's capacity.
    StringValTooLong { attr: String, max: usize, len: usize },

    /// UPDATE would store NULL into a NOT NULL attribute.
    AttrIsNotnull { attr: String },

    /// DML against a system catalog relation.
    Forbidden { rel: String },

    /// Catalog error during metadata lookup.
    Catalog(CatalogError),

    /// Record-manager error during scans or mutations.
    Heap(HeapError),

    /// Output sink failure while printing results.
    Io(std::io::Error),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::AttrNotExist { attr } => {
                write!(f, "attribute \"{}\" does not exist", attr)
            }
            ExecutorError::AmbiguousAttrName { attr } => {
                write!(f, "attribute name \"{}\" is ambiguous", attr)
            }
            ExecutorError::AttrTypesMismatch { lhs, rhs } => {
                write!(f, "cannot compare attribute types {} and {}", lhs, rhs)
            }
            ExecutorError::ValueTypesMismatch { attr, attr_type } => {
                write!(
                    f,
                    "value is not assignable to attribute \"{}\" of type {}",
                    attr, attr_type
                )
            }
            ExecutorError::AttrCountMismatch { expected, found } => {
                write!(f, "expected {} values, found {}", expected, found)
            }
            ExecutorError::StringValTooLong { attr, max, len } => {
                write!(
                    f,
                    "string of {} bytes exceeds attribute \"{}\" capacity {}",
                    len, attr, max
                )
            }
            ExecutorError::AttrIsNotnull { attr } => {
                write!(f, "attribute \"{}\" is declared NOT NULL", attr)
            }
            ExecutorError::Forbidden { rel } => {
                write!(f, "relation \"{}\" cannot be modified", rel)
            }
            ExecutorError::Catalog(e) => write!(f, "{}", e),
            ExecutorError::Heap(e) => write!(f, "{}", e),
            ExecutorError::Io(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Catalog(e) => Some(e),
            ExecutorError::Heap(e) => Some(e),
            ExecutorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CatalogError> for ExecutorError {
    fn from(e: CatalogError) -> Self {
        ExecutorError::Catalog(e)
    }
}

impl From<HeapError> for ExecutorError {
    fn from(e: HeapError) -> Self {
        ExecutorError::Heap(e)
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(e: std::io::Error) -> Self {
        ExecutorError::Io(e)
    }
}
