//! Tabular result printing.
//!
//! Renders projected tuples as aligned text: a header line, a dash
//! rule, one line per tuple with `NULL` placeholders, and a footer
//! with the tuple count. Column widths follow the attribute display
//! lengths for strings and a 12-character minimum for numerics, with
//! the header text absorbing the padding when it is wider than the
//! column.

use std::io::Write;

use crate::catalog::AttrInfo;
use crate::datum::AttrType;
use crate::tuple::{FieldRef, TupleView};

/// Widest printable string cell; longer display widths are truncated
/// with a trailing ellipsis.
pub const MAX_PRINT: usize = 34;

struct Column {
    attr: AttrInfo,
    /// Header text; gains a trailing space when it absorbs the padding.
    header: String,
    /// Spaces after the header text.
    pad: usize,
}

/// Prints projected tuples with aligned columns.
///
/// The printer counts the rows it emits; the footer reports that count.
pub struct Printer {
    columns: Vec<Column>,
    count: usize,
}

impl Printer {
    /// Lays out columns for the given projected attributes.
    ///
    /// A header is the bare attribute name unless that name repeats
    /// among the projected attributes, in which case it is qualified as
    /// `relation.attribute`.
    pub fn new(attrs: Vec<AttrInfo>) -> Self {
        let columns = attrs
            .iter()
            .map(|attr| {
                let duplicated = attrs
                    .iter()
                    .any(|other| !std::ptr::eq(other, attr) && other.attr_name == attr.attr_name);
                let mut header = if duplicated {
                    format!("{}.{}", attr.rel_name, attr.attr_name)
                } else {
                    attr.attr_name.clone()
                };
                let width = match attr.attr_type {
                    AttrType::Str => attr.display_len.min(MAX_PRINT),
                    AttrType::Int | AttrType::Float => header.len().max(12),
                };
                let pad = if width > header.len() {
                    width - header.len()
                } else {
                    // The header is the widest thing in this column; it
                    // absorbs the padding and keeps one separator space.
                    header.push(' ');
                    0
                };
                Column {
                    attr: attr.clone(),
                    header,
                    pad,
                }
            })
            .collect();
        Self { columns, count: 0 }
    }

    /// Writes the header line and the dash rule under it.
    pub fn print_header<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let mut dashes = 0;
        for col in &self.columns {
            out.write_all(col.header.as_bytes())?;
            spaces(out, col.header.len() + col.pad, col.header.len())?;
            dashes += col.header.len() + col.pad;
        }
        out.write_all(b"\n")?;
        for _ in 0..dashes {
            out.write_all(b"-")?;
        }
        out.write_all(b"\n")
    }

    /// Writes one tuple line.
    pub fn print<W: Write>(
        &mut self,
        out: &mut W,
        data: &[u8],
        is_null: &[bool],
    ) -> std::io::Result<()> {
        self.count += 1;
        let view = TupleView::new(data, is_null);

        for col in &self.columns {
            let attr = &col.attr;
            let field = view.field(attr);
            match field {
                Some(FieldRef::Int(v)) => {
                    let text = v.to_string();
                    out.write_all(text.as_bytes())?;
                    spaces(out, col.header.len().max(12), text.len())?;
                }
                Some(FieldRef::Float(v)) => {
                    let text = format!("{:.6}", v);
                    out.write_all(text.as_bytes())?;
                    spaces(out, col.header.len().max(12), text.len())?;
                }
                Some(FieldRef::Str(_)) | None => {
                    let content: &[u8] = match field {
                        Some(FieldRef::Str(bytes)) => bytes,
                        _ => b"NULL",
                    };
                    if attr.display_len > MAX_PRINT {
                        let cut = content.len().min(MAX_PRINT - 1);
                        let mut text = content[..cut].to_vec();
                        if text.len() == MAX_PRINT - 1 {
                            text[MAX_PRINT - 4..].copy_from_slice(b"...");
                        }
                        out.write_all(&text)?;
                        spaces(out, MAX_PRINT, text.len())?;
                    } else {
                        out.write_all(content)?;
                        spaces(
                            out,
                            attr.display_len.max(col.header.len()),
                            content.len(),
                        )?;
                    }
                }
            }
        }
        out.write_all(b"\n")
    }

    /// Writes the footer: a blank line and the tuple count.
    pub fn print_footer<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "\n{} tuple(s).\n", self.count)
    }

    /// Number of tuples printed so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

fn spaces<W: Write>(out: &mut W, max_len: usize, printed: usize) -> std::io::Result<()> {
    for _ in printed..max_len {
        out.write_all(b" ")?;
    }
    Ok(())
}
