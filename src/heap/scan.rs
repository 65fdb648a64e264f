//! Physical-order scans over heap files.

use crate::datum::{AttrType, CompOp, Value};
use crate::tuple::{decode_field, satisfies, FieldRef};

use super::error::HeapError;
use super::file::HeapFile;
use super::record::Record;

/// A raw single-field filter applied by the scan itself.
///
/// The comparison decodes the field at `offset` directly from the
/// record bytes; null flags are not consulted. Query-level filtering
/// with null semantics happens in the executor — statement scans pass
/// `None` here (the NO_OP scan) and evaluate predicates per tuple.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    /// Type of the filtered field.
    pub attr_type: AttrType,
    /// Full field size in bytes.
    pub len: usize,
    /// Field offset within the tuple bytes.
    pub offset: usize,
    /// Comparison operator.
    pub op: CompOp,
    /// Comparison value.
    pub value: Value,
}

impl ScanFilter {
    fn accepts(&self, record: &Record) -> bool {
        let lhs = Some(decode_field(
            &record.data,
            self.offset,
            self.attr_type,
            self.len,
        ));
        satisfies(lhs, FieldRef::from_value(&self.value), self.op)
    }
}

/// Cursor over all records of a heap file in physical order.
///
/// End of scan is the `Ok(None)` return of [`FileScan::next_record`],
/// not an error. The scan buffers one page at a time; records already
/// yielded stay valid because they are owned copies.
pub struct FileScan<'a> {
    file: &'a HeapFile,
    filter: Option<ScanFilter>,
    page: u32,
    slot: usize,
    buf: Option<Vec<u8>>,
}

impl HeapFile {
    /// Opens a scan over this file, optionally filtered.
    pub fn scan(&self, filter: Option<ScanFilter>) -> FileScan<'_> {
        FileScan {
            file: self,
            filter,
            page: 1,
            slot: 0,
            buf: None,
        }
    }
}

impl FileScan<'_> {
    /// Advances to the next record, or `Ok(None)` at end of file.
    pub fn next_record(&mut self) -> Result<Option<Record>, HeapError> {
        loop {
            if self.buf.is_none() {
                match self.file.page_image(self.page)? {
                    Some(buf) => self.buf = Some(buf),
                    None => return Ok(None),
                }
            }
            if let Some(buf) = &self.buf {
                while self.slot < self.file.slots_per_page() {
                    let slot = self.slot;
                    self.slot += 1;
                    if let Some(record) = self.file.decode_slot(buf, self.page, slot) {
                        let accepted = match &self.filter {
                            Some(f) => f.accepts(&record),
                            None => true,
                        };
                        if accepted {
                            return Ok(Some(record));
                        }
                    }
                }
            }
            self.page += 1;
            self.slot = 0;
            self.buf = None;
        }
    }
}
