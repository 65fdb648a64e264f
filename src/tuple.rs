//! Typed views over raw tuple buffers.
//!
//! A tuple is a contiguous byte buffer laid out by attribute offsets,
//! accompanied by a null array indexed by each nullable attribute's
//! `nullable_index`. This module decodes and encodes fields without
//! exposing raw offset arithmetic to callers:
//!
//! - [`TupleView`]: read-only typed access to one tuple
//! - [`TupleWriter`]: builds a fresh tuple buffer for inserts
//! - [`FieldRef`]: a decoded field, `None`-wrapped when the null bit is set
//!
//! Invariant: when a field's null bit is set, its bytes are indeterminate
//! and are never decoded.

use std::cmp::Ordering;

use crate::catalog::AttrInfo;
use crate::datum::{AttrType, CompOp, Value};

/// Rounds `n` up to the next multiple of four.
pub const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// A decoded field within a tuple buffer.
///
/// STRING fields borrow the content bytes up to (excluding) the NUL
/// terminator; comparison is bytewise lexicographic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    /// 4-byte signed integer field.
    Int(i32),
    /// 4-byte floating point field.
    Float(f32),
    /// String field content, NUL terminator excluded.
    Str(&'a [u8]),
}

impl<'a> FieldRef<'a> {
    /// Borrows a literal [`Value`] as a field, or `None` for NULL.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(n) => Some(FieldRef::Int(*n)),
            Value::Float(x) => Some(FieldRef::Float(*x)),
            Value::Str(s) => Some(FieldRef::Str(s.as_bytes())),
        }
    }

    /// Compares two fields of compatible types.
    ///
    /// INT widens to FLOAT when the sides mix the two numeric types
    /// (an INT literal compared against a FLOAT attribute). Returns
    /// `None` for incompatible types or unordered floats.
    pub fn compare(self, other: FieldRef<'_>) -> Option<Ordering> {
        match (self, other) {
            (FieldRef::Int(a), FieldRef::Int(b)) => Some(a.cmp(&b)),
            (FieldRef::Float(a), FieldRef::Float(b)) => a.partial_cmp(&b),
            (FieldRef::Float(a), FieldRef::Int(b)) => a.partial_cmp(&(b as f32)),
            (FieldRef::Int(a), FieldRef::Float(b)) => (a as f32).partial_cmp(&b),
            (FieldRef::Str(a), FieldRef::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Evaluates one predicate over decoded operands.
///
/// `None` operands are SQL NULL. The rules, in order: `NoOp` is
/// vacuously true; `IsNull`/`NotNull` test the left-hand null flag; any
/// other operator with a NULL operand is false (rows with nulls are
/// rejected, not unknown); otherwise the operands are compared.
pub fn satisfies(lhs: Option<FieldRef<'_>>, rhs: Option<FieldRef<'_>>, op: CompOp) -> bool {
    match op {
        CompOp::NoOp => true,
        CompOp::IsNull => lhs.is_none(),
        CompOp::NotNull => lhs.is_some(),
        _ => match (lhs, rhs) {
            (Some(l), Some(r)) => match l.compare(r) {
                Some(ord) => op.matches(ord),
                None => false,
            },
            _ => false,
        },
    }
}

/// Decodes the field at `offset` as type `ty`.
///
/// `size` is the full field size in bytes; STRING content ends at the
/// first NUL within the field (or at the field boundary).
pub fn decode_field(data: &[u8], offset: usize, ty: AttrType, size: usize) -> FieldRef<'_> {
    match ty {
        AttrType::Int => FieldRef::Int(i32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])),
        AttrType::Float => FieldRef::Float(f32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])),
        AttrType::Str => {
            let raw = &data[offset..offset + size];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            FieldRef::Str(&raw[..end])
        }
    }
}

/// Writes a 4-byte little-endian integer field.
pub fn write_int(data: &mut [u8], offset: usize, v: i32) {
    data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

/// Writes a 4-byte little-endian float field.
pub fn write_float(data: &mut [u8], offset: usize, v: f32) {
    data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

/// Writes a NUL-terminated string field, zero-filling the remainder.
///
/// Callers validate `content.len() < size` beforehand; the field always
/// keeps at least one terminator byte.
pub fn write_str(data: &mut [u8], offset: usize, size: usize, content: &[u8]) {
    let field = &mut data[offset..offset + size];
    field.fill(0);
    field[..content.len()].copy_from_slice(content);
}

/// Read-only view over one tuple's bytes and null array.
#[derive(Debug, Clone, Copy)]
pub struct TupleView<'a> {
    data: &'a [u8],
    is_null: &'a [bool],
}

impl<'a> TupleView<'a> {
    /// Creates a view over a tuple buffer and its null array.
    pub fn new(data: &'a [u8], is_null: &'a [bool]) -> Self {
        Self { data, is_null }
    }

    /// Returns whether `attr`'s field is null in this tuple.
    ///
    /// NOTNULL attributes (no `nullable_index`) are never null.
    pub fn is_field_null(&self, attr: &AttrInfo) -> bool {
        match attr.nullable_index {
            Some(i) => self.is_null[i as usize],
            None => false,
        }
    }

    /// Decodes `attr`'s field, or `None` when its null bit is set.
    pub fn field(&self, attr: &AttrInfo) -> Option<FieldRef<'a>> {
        if self.is_field_null(attr) {
            return None;
        }
        Some(decode_field(
            self.data,
            attr.offset,
            attr.attr_type,
            attr.attr_size,
        ))
    }

    /// Returns the raw bytes of `attr`'s field, null or not.
    pub fn raw_field(&self, attr: &AttrInfo) -> &'a [u8] {
        &self.data[attr.offset..attr.offset + attr.attr_size]
    }
}

/// Builds a tuple buffer and its null array for insertion.
pub struct TupleWriter {
    data: Vec<u8>,
    is_null: Vec<bool>,
}

impl TupleWriter {
    /// Creates a zeroed buffer of `tuple_len` bytes with `null_count`
    /// null slots, all initially not-null.
    pub fn new(tuple_len: usize, null_count: usize) -> Self {
        Self {
            data: vec![0; tuple_len],
            is_null: vec![false; null_count],
        }
    }

    /// Sets `attr`'s null bit; the field bytes stay zeroed and unread.
    pub fn set_null(&mut self, attr: &AttrInfo) {
        debug_assert!(attr.nullable_index.is_some());
        if let Some(i) = attr.nullable_index {
            self.is_null[i as usize] = true;
        }
    }

    /// Writes an integer into `attr`'s field.
    pub fn put_int(&mut self, attr: &AttrInfo, v: i32) {
        write_int(&mut self.data, attr.offset, v);
    }

    /// Writes a float into `attr`'s field.
    pub fn put_float(&mut self, attr: &AttrInfo, v: f32) {
        write_float(&mut self.data, attr.offset, v);
    }

    /// Writes string content into `attr`'s field, NUL-terminated.
    pub fn put_str(&mut self, attr: &AttrInfo, content: &[u8]) {
        write_str(&mut self.data, attr.offset, attr.attr_size, content);
    }

    /// Consumes the writer, returning the buffer and null array.
    pub fn into_parts(self) -> (Vec<u8>, Vec<bool>) {
        (self.data, self.is_null)
    }
}
