//! System catalog for relation and attribute metadata.
//!
//! The catalog stores metadata in two heap files managed by the record
//! manager itself:
//!
//! - `relcat`: one record per relation (tuple length, record count,
//!   attribute count)
//! - `attrcat`: one record per attribute (type, sizes, offset,
//!   specifiers, nullable index)
//!
//! Both files are bootstrapped on first open. The catalog relations can
//! be queried like any other relation (their schemas are hardcoded in
//! the schema module), but DML against them is rejected upstream.

mod core;
mod error;
mod schema;

pub use self::core::{is_reserved, Catalog, ATTRCAT_NAME, RELCAT_NAME};
pub use error::CatalogError;
pub use schema::{AttrDef, AttrInfo, AttrSpecs, RelationEntry, MAX_NAME, NUMERIC_DISPLAY_LEN};
