//! Catalog record layouts and attribute descriptors.
//!
//! relcat and attrcat records have fixed byte layouts so the catalog can
//! read and write them through the same record manager it describes.
//! Name fields are NUL-terminated within a 28-byte slot (24 significant
//! characters plus terminator, padded for alignment).

use crate::datum::AttrType;
use crate::tuple::{decode_field, write_int, write_str, FieldRef};

use super::error::CatalogError;

/// Longest permitted relation or attribute name.
pub const MAX_NAME: usize = 24;

/// Print width reserved for INT and FLOAT columns at table creation.
pub const NUMERIC_DISPLAY_LEN: usize = 12;

/// Byte slot for a name field in catalog records.
const NAME_FIELD: usize = 28;

// relcat record layout.
const REL_NAME_OFF: usize = 0;
const REL_TUPLE_LEN_OFF: usize = 28;
const REL_RECORD_COUNT_OFF: usize = 32;
const REL_ATTR_COUNT_OFF: usize = 36;
pub(crate) const RELCAT_RECORD_SIZE: usize = 40;

// attrcat record layout.
const ATTR_REL_NAME_OFF: usize = 0;
const ATTR_NAME_OFF: usize = 28;
const ATTR_OFFSET_OFF: usize = 56;
const ATTR_TYPE_OFF: usize = 60;
const ATTR_SIZE_OFF: usize = 64;
const ATTR_DISPLAY_OFF: usize = 68;
const ATTR_SPECS_OFF: usize = 72;
const ATTR_NULLABLE_OFF: usize = 76;
pub(crate) const ATTRCAT_RECORD_SIZE: usize = 80;

/// Attribute specifier bitset.
///
/// A bitset rather than a plain flag so further specifiers can join
/// NOTNULL without a catalog format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrSpecs(u32);

impl AttrSpecs {
    /// No specifiers.
    pub const NONE: AttrSpecs = AttrSpecs(0);
    /// The attribute rejects NULL.
    pub const NOTNULL: AttrSpecs = AttrSpecs(1);

    /// Returns true if every bit of `other` is set in `self`.
    pub const fn contains(self, other: AttrSpecs) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit value, as stored in attrcat.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a bitset from its stored value.
    pub const fn from_bits(bits: u32) -> Self {
        AttrSpecs(bits)
    }
}

/// Per-relation catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEntry {
    /// Relation name.
    pub rel_name: String,
    /// Tuple byte length.
    pub tuple_length: usize,
    /// Number of live records; maintained by the executor after
    /// INSERT and DELETE.
    pub record_count: usize,
    /// Number of attributes.
    pub attr_count: usize,
}

impl RelationEntry {
    pub(crate) fn to_record(&self) -> Vec<u8> {
        let mut buf = vec![0u8; RELCAT_RECORD_SIZE];
        write_str(&mut buf, REL_NAME_OFF, NAME_FIELD, self.rel_name.as_bytes());
        write_int(&mut buf, REL_TUPLE_LEN_OFF, self.tuple_length as i32);
        write_int(&mut buf, REL_RECORD_COUNT_OFF, self.record_count as i32);
        write_int(&mut buf, REL_ATTR_COUNT_OFF, self.attr_count as i32);
        buf
    }

    pub(crate) fn from_record(data: &[u8]) -> Result<Self, CatalogError> {
        if data.len() != RELCAT_RECORD_SIZE {
            return Err(CatalogError::InvalidRecord(format!(
                "relcat record of {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            rel_name: read_name(data, REL_NAME_OFF)?,
            tuple_length: read_count(data, REL_TUPLE_LEN_OFF)?,
            record_count: read_count(data, REL_RECORD_COUNT_OFF)?,
            attr_count: read_count(data, REL_ATTR_COUNT_OFF)?,
        })
    }
}

/// Descriptor for one attribute of a relation.
///
/// Immutable once produced by the catalog; descriptors live for the
/// duration of one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrInfo {
    /// Owning relation.
    pub rel_name: String,
    /// Attribute name.
    pub attr_name: String,
    /// Byte offset of the field inside the relation's tuple buffer.
    pub offset: usize,
    /// Primitive type.
    pub attr_type: AttrType,
    /// Field size in bytes (STRING reserves the NUL terminator).
    pub attr_size: usize,
    /// Display width for printing.
    pub display_len: usize,
    /// Specifier bitset.
    pub specs: AttrSpecs,
    /// Index into the tuple's null array; `None` for NOTNULL attributes.
    pub nullable_index: Option<u16>,
}

impl AttrInfo {
    /// Returns true if the attribute accepts NULL.
    pub fn nullable(&self) -> bool {
        !self.specs.contains(AttrSpecs::NOTNULL)
    }

    pub(crate) fn to_record(&self) -> Vec<u8> {
        let mut buf = vec![0u8; ATTRCAT_RECORD_SIZE];
        write_str(&mut buf, ATTR_REL_NAME_OFF, NAME_FIELD, self.rel_name.as_bytes());
        write_str(&mut buf, ATTR_NAME_OFF, NAME_FIELD, self.attr_name.as_bytes());
        write_int(&mut buf, ATTR_OFFSET_OFF, self.offset as i32);
        write_int(&mut buf, ATTR_TYPE_OFF, self.attr_type.code() as i32);
        write_int(&mut buf, ATTR_SIZE_OFF, self.attr_size as i32);
        write_int(&mut buf, ATTR_DISPLAY_OFF, self.display_len as i32);
        write_int(&mut buf, ATTR_SPECS_OFF, self.specs.bits() as i32);
        let nullable = match self.nullable_index {
            Some(i) => i as i32,
            None => -1,
        };
        write_int(&mut buf, ATTR_NULLABLE_OFF, nullable);
        buf
    }

    pub(crate) fn from_record(data: &[u8]) -> Result<Self, CatalogError> {
        if data.len() != ATTRCAT_RECORD_SIZE {
            return Err(CatalogError::InvalidRecord(format!(
                "attrcat record of {} bytes",
                data.len()
            )));
        }
        let type_code = read_i32(data, ATTR_TYPE_OFF);
        let attr_type = u32::try_from(type_code)
            .ok()
            .and_then(AttrType::from_code)
            .ok_or_else(|| {
                CatalogError::InvalidRecord(format!("unknown attribute type code {}", type_code))
            })?;
        let nullable = read_i32(data, ATTR_NULLABLE_OFF);
        let nullable_index = if nullable < 0 {
            None
        } else {
            Some(nullable as u16)
        };
        Ok(Self {
            rel_name: read_name(data, ATTR_REL_NAME_OFF)?,
            attr_name: read_name(data, ATTR_NAME_OFF)?,
            offset: read_count(data, ATTR_OFFSET_OFF)?,
            attr_type,
            attr_size: read_count(data, ATTR_SIZE_OFF)?,
            display_len: read_count(data, ATTR_DISPLAY_OFF)?,
            specs: AttrSpecs::from_bits(read_i32(data, ATTR_SPECS_OFF) as u32),
            nullable_index,
        })
    }
}

/// One column of a CREATE TABLE definition.
#[derive(Debug, Clone)]
pub struct AttrDef {
    /// Attribute name.
    pub name: String,
    /// Primitive type.
    pub attr_type: AttrType,
    /// Display width; for STRING this is also the content capacity.
    pub display_len: usize,
    /// Whether the attribute rejects NULL.
    pub notnull: bool,
}

impl AttrDef {
    /// An INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: AttrType::Int,
            display_len: NUMERIC_DISPLAY_LEN,
            notnull: false,
        }
    }

    /// A FLOAT column.
    pub fn float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: AttrType::Float,
            display_len: NUMERIC_DISPLAY_LEN,
            notnull: false,
        }
    }

    /// A STRING column holding up to `len` bytes.
    pub fn string(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            attr_type: AttrType::Str,
            display_len: len,
            notnull: false,
        }
    }

    /// Marks the column NOT NULL.
    pub fn notnull(mut self) -> Self {
        self.notnull = true;
        self
    }
}

pub(crate) fn name_filter_offset() -> usize {
    REL_NAME_OFF
}

pub(crate) fn name_field_len() -> usize {
    NAME_FIELD
}

fn read_name(data: &[u8], offset: usize) -> Result<String, CatalogError> {
    match decode_field(data, offset, AttrType::Str, NAME_FIELD) {
        FieldRef::Str(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|e| CatalogError::InvalidRecord(format!("name is not utf-8: {}", e))),
        _ => unreachable!(),
    }
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_count(data: &[u8], offset: usize) -> Result<usize, CatalogError> {
    let v = read_i32(data, offset);
    usize::try_from(v)
        .map_err(|_| CatalogError::InvalidRecord(format!("negative count field {}", v)))
}

/// Hardcoded descriptors for the relcat relation itself.
pub(crate) fn relcat_attributes() -> Vec<AttrInfo> {
    let mk = |name: &str, offset, ty, size, display| AttrInfo {
        rel_name: super::core::RELCAT_NAME.into(),
        attr_name: name.into(),
        offset,
        attr_type: ty,
        attr_size: size,
        display_len: display,
        specs: AttrSpecs::NOTNULL,
        nullable_index: None,
    };
    vec![
        mk("relname", REL_NAME_OFF, AttrType::Str, NAME_FIELD, NAME_FIELD - 1),
        mk("tuplelength", REL_TUPLE_LEN_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("recordcount", REL_RECORD_COUNT_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("attrcount", REL_ATTR_COUNT_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
    ]
}

/// Hardcoded descriptors for the attrcat relation itself.
pub(crate) fn attrcat_attributes() -> Vec<AttrInfo> {
    let mk = |name: &str, offset, ty, size, display| AttrInfo {
        rel_name: super::core::ATTRCAT_NAME.into(),
        attr_name: name.into(),
        offset,
        attr_type: ty,
        attr_size: size,
        display_len: display,
        specs: AttrSpecs::NOTNULL,
        nullable_index: None,
    };
    vec![
        mk("relname", ATTR_REL_NAME_OFF, AttrType::Str, NAME_FIELD, NAME_FIELD - 1),
        mk("attrname", ATTR_NAME_OFF, AttrType::Str, NAME_FIELD, NAME_FIELD - 1),
        mk("offset", ATTR_OFFSET_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("attrtype", ATTR_TYPE_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("attrlength", ATTR_SIZE_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("displaylength", ATTR_DISPLAY_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("specs", ATTR_SPECS_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
        mk("nullableindex", ATTR_NULLABLE_OFF, AttrType::Int, 4, NUMERIC_DISPLAY_LEN),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_bits() {
        assert!(AttrSpecs::NOTNULL.contains(AttrSpecs::NOTNULL));
        assert!(!AttrSpecs::NONE.contains(AttrSpecs::NOTNULL));
        assert_eq!(AttrSpecs::from_bits(AttrSpecs::NOTNULL.bits()), AttrSpecs::NOTNULL);
    }

    #[test]
    fn test_relation_entry_roundtrip() {
        let entry = RelationEntry {
            rel_name: "students".into(),
            tuple_length: 13,
            record_count: 42,
            attr_count: 2,
        };
        let rec = entry.to_record();
        assert_eq!(rec.len(), RELCAT_RECORD_SIZE);
        assert_eq!(RelationEntry::from_record(&rec).unwrap(), entry);
    }

    #[test]
    fn test_attr_info_roundtrip() {
        let info = AttrInfo {
            rel_name: "students".into(),
            attr_name: "name".into(),
            offset: 4,
            attr_type: AttrType::Str,
            attr_size: 9,
            display_len: 8,
            specs: AttrSpecs::NONE,
            nullable_index: Some(0),
        };
        let rec = info.to_record();
        assert_eq!(rec.len(), ATTRCAT_RECORD_SIZE);
        assert_eq!(AttrInfo::from_record(&rec).unwrap(), info);

        let notnull = AttrInfo {
            specs: AttrSpecs::NOTNULL,
            nullable_index: None,
            ..info
        };
        let rec = notnull.to_record();
        assert_eq!(AttrInfo::from_record(&rec).unwrap(), notnull);
    }

    #[test]
    fn test_from_record_rejects_wrong_size() {
        assert!(matches!(
            RelationEntry::from_record(&[0u8; 10]),
            Err(CatalogError::InvalidRecord(_))
        ));
        assert!(matches!(
            AttrInfo::from_record(&[0u8; 10]),
            Err(CatalogError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_from_record_rejects_bad_type_code() {
        let info = AttrInfo {
            rel_name: "r".into(),
            attr_name: "a".into(),
            offset: 0,
            attr_type: AttrType::Int,
            attr_size: 4,
            display_len: 12,
            specs: AttrSpecs::NOTNULL,
            nullable_index: None,
        };
        let mut rec = info.to_record();
        write_int(&mut rec, ATTR_TYPE_OFF, 99);
        assert!(matches!(
            AttrInfo::from_record(&rec),
            Err(CatalogError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_catalog_self_schemas_are_consistent() {
        for (attrs, record_size) in [
            (relcat_attributes(), RELCAT_RECORD_SIZE),
            (attrcat_attributes(), ATTRCAT_RECORD_SIZE),
        ] {
            for attr in &attrs {
                assert!(attr.offset + attr.attr_size <= record_size);
                assert!(!attr.nullable());
            }
        }
    }
}
