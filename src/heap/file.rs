//! Heap file implementation: fixed-length records in fixed-size pages.
//!
//! # File Layout
//!
//! ```text
//! +-------------------+-------------------+-------------------+
//! | Header page (4KB) | Data page 1 (4KB) | Data page 2 (4KB) | ...
//! +-------------------+-------------------+-------------------+
//! ```
//!
//! The header page stores the magic number, the record layout (tuple
//! byte length and nullable-attribute count), and a first-free-page
//! hint. Each data page is:
//!
//! ```text
//! +--------------+------------------+------------------------+
//! | used: u16 +2 | occupancy bitmap | slot 0 | slot 1 | ...  |
//! +--------------+------------------+------------------------+
//! ```
//!
//! A slot holds the record's null bitmap (one bit per nullable
//! attribute, bit set = NULL) followed by its tuple bytes. All records
//! of a file share one layout, so slot positions are pure arithmetic.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::error::HeapError;
use super::record::{Record, Rid};

/// Size of every page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Magic number identifying a heap file.
const FILE_MAGIC: u32 = 0x4D48_4631;

/// Size of the per-data-page header (`used` count plus padding).
const PAGE_HDR: usize = 4;

/// Largest record (null bitmap + tuple bytes) that fits in one page.
const MAX_SLOT_SIZE: usize = PAGE_SIZE - PAGE_HDR - 1;

/// Mutable file state, serialized behind a mutex so scans and
/// record mutations can share one open handle.
struct FileInner {
    file: File,
    /// Total pages in the file, header page included.
    pages: u32,
    /// Lowest data page that may have a free slot.
    free_hint: u32,
}

/// One open heap file.
///
/// All methods take `&self`; access to the OS handle is serialized
/// through an internal mutex. The handle closes when the value drops,
/// on success and error paths alike.
pub struct HeapFile {
    name: String,
    inner: Mutex<FileInner>,
    data_len: usize,
    null_count: usize,
    null_bytes: usize,
    slot_size: usize,
    slots_per_page: usize,
}

impl HeapFile {
    /// Creates a new heap file for records of `data_len` tuple bytes and
    /// `null_count` nullable attributes.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::FileExists` if the path is already taken and
    /// `HeapError::RecordTooLarge` if one record cannot fit in a page.
    pub fn create(path: &Path, data_len: usize, null_count: usize) -> Result<Self, HeapError> {
        let name = file_name(path);
        let null_bytes = null_count.div_ceil(8);
        let slot_size = null_bytes + data_len;
        if data_len == 0 || slot_size > MAX_SLOT_SIZE {
            return Err(HeapError::RecordTooLarge {
                size: slot_size,
                max: MAX_SLOT_SIZE,
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    HeapError::FileExists { name: name.clone() }
                } else {
                    HeapError::Io(e)
                }
            })?;

        let heap = Self {
            name,
            inner: Mutex::new(FileInner {
                file,
                pages: 1,
                free_hint: 1,
            }),
            data_len,
            null_count,
            null_bytes,
            slot_size,
            slots_per_page: slots_per_page(slot_size),
        };
        heap.write_header(&mut heap.inner.lock())?;
        Ok(heap)
    }

    /// Opens an existing heap file.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::FileNotFound` for a missing path and
    /// `HeapError::Corrupted` when the header or file size is invalid.
    pub fn open(path: &Path) -> Result<Self, HeapError> {
        let name = file_name(path);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    HeapError::FileNotFound { name: name.clone() }
                } else {
                    HeapError::Io(e)
                }
            })?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 || file_size == 0 {
            return Err(HeapError::Corrupted(format!(
                "file size {} is not a positive multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        let header = read_page(&mut file, 0)?;
        let magic = read_u32(&header, 0);
        if magic != FILE_MAGIC {
            return Err(HeapError::Corrupted(format!(
                "bad magic {:#010x}",
                magic
            )));
        }
        let data_len = read_u32(&header, 4) as usize;
        let null_count = read_u32(&header, 8) as usize;
        let free_hint = read_u32(&header, 12);
        let null_bytes = null_count.div_ceil(8);
        let slot_size = null_bytes + data_len;
        if data_len == 0 || slot_size > MAX_SLOT_SIZE {
            return Err(HeapError::Corrupted(format!(
                "header declares impossible record size {}",
                slot_size
            )));
        }

        Ok(Self {
            name,
            inner: Mutex::new(FileInner {
                file,
                pages: (file_size / PAGE_SIZE as u64) as u32,
                free_hint: free_hint.max(1),
            }),
            data_len,
            null_count,
            null_bytes,
            slot_size,
            slots_per_page: slots_per_page(slot_size),
        })
    }

    /// Returns the relation name this file was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tuple byte length of records in this file.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Returns the number of nullable attributes per record.
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub(crate) fn slots_per_page(&self) -> usize {
        self.slots_per_page
    }

    /// Inserts a record, returning its new identifier.
    pub fn insert(&self, data: &[u8], is_null: &[bool]) -> Result<Rid, HeapError> {
        self.check_lengths(data, is_null)?;
        let mut inner = self.inner.lock();

        // Look for a free slot from the hint onward.
        for page in inner.free_hint.max(1)..inner.pages {
            let mut buf = read_page(&mut inner.file, page)?;
            let used = read_u16(&buf, 0) as usize;
            if used >= self.slots_per_page {
                continue;
            }
            let slot = (0..self.slots_per_page)
                .find(|&s| !bit_get(&buf[PAGE_HDR..], s))
                .ok_or_else(|| {
                    HeapError::Corrupted(format!("page {} used count disagrees with bitmap", page))
                })?;
            self.store_slot(&mut buf, slot, data, is_null);
            bit_set(&mut buf[PAGE_HDR..], slot);
            write_u16(&mut buf, 0, (used + 1) as u16);
            write_page(&mut inner.file, page, &buf)?;
            if inner.free_hint != page {
                inner.free_hint = page;
                self.write_header(&mut inner)?;
            }
            return Ok(Rid::new(page, slot as u16));
        }

        // No space anywhere; append a fresh page.
        let page = inner.pages;
        let mut buf = vec![0u8; PAGE_SIZE];
        self.store_slot(&mut buf, 0, data, is_null);
        bit_set(&mut buf[PAGE_HDR..], 0);
        write_u16(&mut buf, 0, 1);
        write_page(&mut inner.file, page, &buf)?;
        inner.pages += 1;
        inner.free_hint = page;
        self.write_header(&mut inner)?;
        Ok(Rid::new(page, 0))
    }

    /// Reads the record at `rid`.
    pub fn record(&self, rid: Rid) -> Result<Record, HeapError> {
        let mut inner = self.inner.lock();
        self.check_rid(&inner, rid)?;
        let buf = read_page(&mut inner.file, rid.page)?;
        self.decode_slot(&buf, rid.page, rid.slot as usize)
            .ok_or(HeapError::InvalidRid(rid))
    }

    /// Deletes the record at `rid`.
    pub fn delete(&self, rid: Rid) -> Result<(), HeapError> {
        let mut inner = self.inner.lock();
        self.check_rid(&inner, rid)?;
        let mut buf = read_page(&mut inner.file, rid.page)?;
        if !bit_get(&buf[PAGE_HDR..], rid.slot as usize) {
            return Err(HeapError::InvalidRid(rid));
        }
        bit_clear(&mut buf[PAGE_HDR..], rid.slot as usize);
        let used = read_u16(&buf, 0);
        write_u16(&mut buf, 0, used.saturating_sub(1));
        write_page(&mut inner.file, rid.page, &buf)?;
        if rid.page < inner.free_hint {
            inner.free_hint = rid.page;
            self.write_header(&mut inner)?;
        }
        Ok(())
    }

    /// Overwrites the record at `record.rid` in place.
    pub fn update(&self, record: &Record) -> Result<(), HeapError> {
        self.check_lengths(&record.data, &record.is_null)?;
        let mut inner = self.inner.lock();
        self.check_rid(&inner, record.rid)?;
        let mut buf = read_page(&mut inner.file, record.rid.page)?;
        if !bit_get(&buf[PAGE_HDR..], record.rid.slot as usize) {
            return Err(HeapError::InvalidRid(record.rid));
        }
        self.store_slot(&mut buf, record.rid.slot as usize, &record.data, &record.is_null);
        write_page(&mut inner.file, record.rid.page, &buf)?;
        Ok(())
    }

    /// Reads a whole data page, or `None` past the end of the file.
    pub(crate) fn page_image(&self, page: u32) -> Result<Option<Vec<u8>>, HeapError> {
        let mut inner = self.inner.lock();
        if page == 0 || page >= inner.pages {
            return Ok(None);
        }
        Ok(Some(read_page(&mut inner.file, page)?))
    }

    /// Decodes one occupied slot out of a page image.
    pub(crate) fn decode_slot(&self, buf: &[u8], page: u32, slot: usize) -> Option<Record> {
        if slot >= self.slots_per_page || !bit_get(&buf[PAGE_HDR..], slot) {
            return None;
        }
        let start = self.slots_offset() + slot * self.slot_size;
        let raw = &buf[start..start + self.slot_size];
        let is_null = (0..self.null_count).map(|i| bit_get(raw, i)).collect();
        let data = raw[self.null_bytes..].to_vec();
        Some(Record::new(Rid::new(page, slot as u16), data, is_null))
    }

    fn slots_offset(&self) -> usize {
        PAGE_HDR + self.slots_per_page.div_ceil(8)
    }

    fn store_slot(&self, buf: &mut [u8], slot: usize, data: &[u8], is_null: &[bool]) {
        let start = self.slots_offset() + slot * self.slot_size;
        let raw = &mut buf[start..start + self.slot_size];
        raw[..self.null_bytes].fill(0);
        for (i, &null) in is_null.iter().enumerate() {
            if null {
                bit_set(raw, i);
            }
        }
        raw[self.null_bytes..].copy_from_slice(data);
    }

    fn check_lengths(&self, data: &[u8], is_null: &[bool]) -> Result<(), HeapError> {
        if data.len() != self.data_len {
            return Err(HeapError::LengthMismatch {
                expected: self.data_len,
                found: data.len(),
            });
        }
        if is_null.len() != self.null_count {
            return Err(HeapError::LengthMismatch {
                expected: self.null_count,
                found: is_null.len(),
            });
        }
        Ok(())
    }

    fn check_rid(&self, inner: &FileInner, rid: Rid) -> Result<(), HeapError> {
        if rid.page == 0 || rid.page >= inner.pages || rid.slot as usize >= self.slots_per_page {
            return Err(HeapError::InvalidRid(rid));
        }
        Ok(())
    }

    fn write_header(&self, inner: &mut FileInner) -> Result<(), HeapError> {
        let mut buf = vec![0u8; PAGE_SIZE];
        write_u32(&mut buf, 0, FILE_MAGIC);
        write_u32(&mut buf, 4, self.data_len as u32);
        write_u32(&mut buf, 8, self.null_count as u32);
        write_u32(&mut buf, 12, inner.free_hint);
        write_page(&mut inner.file, 0, &buf)
    }
}

/// Number of record slots that fit in one data page.
fn slots_per_page(slot_size: usize) -> usize {
    let avail = PAGE_SIZE - PAGE_HDR;
    let mut n = (avail * 8) / (slot_size * 8 + 1);
    while n > 0 && n.div_ceil(8) + n * slot_size > avail {
        n -= 1;
    }
    n
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

fn read_page(file: &mut File, page: u32) -> Result<Vec<u8>, HeapError> {
    let mut buf = vec![0u8; PAGE_SIZE];
    file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_page(file: &mut File, page: u32, buf: &[u8]) -> Result<(), HeapError> {
    debug_assert_eq!(buf.len(), PAGE_SIZE);
    file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
    file.write_all(buf)?;
    Ok(())
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn write_u16(buf: &mut [u8], offset: usize, v: u16) {
    buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn write_u32(buf: &mut [u8], offset: usize, v: u32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

fn bit_get(bits: &[u8], idx: usize) -> bool {
    bits[idx / 8] & (1 << (idx % 8)) != 0
}

fn bit_set(bits: &mut [u8], idx: usize) {
    bits[idx / 8] |= 1 << (idx % 8);
}

fn bit_clear(bits: &mut [u8], idx: usize) {
    bits[idx / 8] &= !(1 << (idx % 8));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_file(data_len: usize, null_count: usize) -> (tempfile::TempDir, HeapFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rel");
        let file = HeapFile::create(&path, data_len, null_count).unwrap();
        (dir, file)
    }

    #[test]
    fn test_slots_per_page_fits() {
        for slot_size in [1, 5, 13, 100, 4000] {
            let n = slots_per_page(slot_size);
            assert!(n >= 1, "slot size {} must fit at least once", slot_size);
            assert!(PAGE_HDR + n.div_ceil(8) + n * slot_size <= PAGE_SIZE);
            // One more slot must not fit.
            assert!(PAGE_HDR + (n + 1).div_ceil(8) + (n + 1) * slot_size > PAGE_SIZE);
        }
    }

    #[test]
    fn test_create_rejects_oversized_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big");
        let result = HeapFile::create(&path, PAGE_SIZE, 0);
        assert!(matches!(result, Err(HeapError::RecordTooLarge { .. })));
    }

    #[test]
    fn test_create_rejects_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rel");
        HeapFile::create(&path, 8, 0).unwrap();
        assert!(matches!(
            HeapFile::create(&path, 8, 0),
            Err(HeapError::FileExists { .. })
        ));
    }

    #[test]
    fn test_open_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            HeapFile::open(&dir.path().join("absent")),
            Err(HeapError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk");
        std::fs::write(&path, vec![0u8; PAGE_SIZE]).unwrap();
        assert!(matches!(
            HeapFile::open(&path),
            Err(HeapError::Corrupted(_))
        ));
    }

    #[test]
    fn test_open_rejects_bad_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(matches!(
            HeapFile::open(&path),
            Err(HeapError::Corrupted(_))
        ));
    }

    #[test]
    fn test_insert_and_read_back() {
        let (_dir, file) = test_file(8, 2);
        let rid = file.insert(&[1, 2, 3, 4, 5, 6, 7, 8], &[true, false]).unwrap();
        let rec = file.record(rid).unwrap();
        assert_eq!(rec.rid, rid);
        assert_eq!(rec.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(rec.is_null, vec![true, false]);
    }

    #[test]
    fn test_insert_length_mismatch() {
        let (_dir, file) = test_file(8, 0);
        assert!(matches!(
            file.insert(&[0; 4], &[]),
            Err(HeapError::LengthMismatch { expected: 8, found: 4 })
        ));
        assert!(matches!(
            file.insert(&[0; 8], &[false]),
            Err(HeapError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_delete_frees_slot() {
        let (_dir, file) = test_file(4, 0);
        let rid = file.insert(&[9, 9, 9, 9], &[]).unwrap();
        file.delete(rid).unwrap();
        assert!(matches!(file.record(rid), Err(HeapError::InvalidRid(_))));
        assert!(matches!(file.delete(rid), Err(HeapError::InvalidRid(_))));

        // The slot is reused by the next insert.
        let rid2 = file.insert(&[1, 1, 1, 1], &[]).unwrap();
        assert_eq!(rid2, rid);
    }

    #[test]
    fn test_update_in_place() {
        let (_dir, file) = test_file(4, 1);
        let rid = file.insert(&[0, 0, 0, 0], &[true]).unwrap();
        let mut rec = file.record(rid).unwrap();
        rec.data = vec![7, 7, 7, 7];
        rec.is_null = vec![false];
        file.update(&rec).unwrap();

        let back = file.record(rid).unwrap();
        assert_eq!(back.data, vec![7, 7, 7, 7]);
        assert_eq!(back.is_null, vec![false]);
    }

    #[test]
    fn test_spills_to_new_pages() {
        let (_dir, file) = test_file(1000, 0);
        let per_page = file.slots_per_page();
        let mut rids = Vec::new();
        for i in 0..(per_page * 2 + 1) {
            rids.push(file.insert(&vec![i as u8; 1000], &[]).unwrap());
        }
        assert!(rids.iter().any(|r| r.page >= 3));
        for (i, rid) in rids.iter().enumerate() {
            assert_eq!(file.record(*rid).unwrap().data, vec![i as u8; 1000]);
        }
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rel");
        let rid = {
            let file = HeapFile::create(&path, 4, 1).unwrap();
            file.insert(&[4, 3, 2, 1], &[true]).unwrap()
        };
        let file = HeapFile::open(&path).unwrap();
        assert_eq!(file.data_len(), 4);
        assert_eq!(file.null_count(), 1);
        let rec = file.record(rid).unwrap();
        assert_eq!(rec.data, vec![4, 3, 2, 1]);
        assert_eq!(rec.is_null, vec![true]);
    }
}
