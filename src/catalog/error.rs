//! Catalog-specific errors.

use std::fmt;

use crate::heap::HeapError;

/// Errors from catalog lookups and schema changes.
#[derive(Debug)]
pub enum CatalogError {
    /// A relation with this name is already defined.
    RelationExists { name: String },

    /// No relation with this name is defined.
    RelationNotFound { name: String },

    /// The name is reserved for a system catalog relation.
    ReservedName { name: String },

    /// Relation or attribute name exceeds the catalog name limit.
    NameTooLong { name: String },

    /// A table definition without attributes.
    NoAttributes { rel: String },

    /// The same attribute name appears twice in one definition.
    DuplicateAttr { rel: String, attr: String },

    /// A catalog record did not decode; the catalog files are damaged.
    InvalidRecord(String),

    /// Record-manager failure underneath a catalog operation.
    Heap(HeapError),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::RelationExists { name } => {
                write!(f, "relation \"{}\" already exists", name)
            }
            CatalogError::RelationNotFound { name } => {
                write!(f, "relation \"{}\" does not exist", name)
            }
            CatalogError::ReservedName { name } => {
                write!(f, "\"{}\" is a reserved catalog relation", name)
            }
            CatalogError::NameTooLong { name } => {
                write!(f, "name \"{}\" exceeds the catalog name limit", name)
            }
            CatalogError::NoAttributes { rel } => {
                write!(f, "relation \"{}\" defines no attributes", rel)
            }
            CatalogError::DuplicateAttr { rel, attr } => {
                write!(f, "duplicate attribute \"{}\" in relation \"{}\"", attr, rel)
            }
            CatalogError::InvalidRecord(msg) => write!(f, "invalid catalog record: {}", msg),
            CatalogError::Heap(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Heap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeapError> for CatalogError {
    fn from(e: HeapError) -> Self {
        CatalogError::Heap(e)
    }
}
