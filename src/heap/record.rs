//! Owned record images and record identifiers.

/// Identifier for a physical record: data page number plus slot index.
///
/// Page numbers start at 1; page 0 of every heap file is the file
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    /// Page containing the record.
    pub page: u32,
    /// Slot within the page.
    pub slot: u16,
}

impl Rid {
    /// Creates a new record identifier.
    pub fn new(page: u32, slot: u16) -> Self {
        Self { page, slot }
    }
}

/// An owned copy of one record: tuple bytes plus the null array.
///
/// Records are copied out of their page on read, so they stay valid for
/// as long as the caller holds them, independent of scan advancement or
/// concurrent mutations to the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Location of this record in its file.
    pub rid: Rid,
    /// Tuple bytes, laid out by attribute offsets.
    pub data: Vec<u8>,
    /// Null flags, indexed by `nullable_index`.
    pub is_null: Vec<bool>,
}

impl Record {
    /// Creates a record image.
    pub fn new(rid: Rid, data: Vec<u8>, is_null: Vec<bool>) -> Self {
        Self { rid, data, is_null }
    }
}
