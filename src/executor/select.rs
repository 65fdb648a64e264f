//! SELECT execution: projection layout and the nested-loop join driver.
//!
//! The driver enumerates the Cartesian product of the FROM relations in
//! scan order, keeping one open scan per relation. `ptr` tracks the
//! innermost active relation: scans `[0..=ptr]` are open, scans past
//! `ptr` are not. EOF at `ptr` closes that scan and backs out one
//! level; `ptr < 0` ends the join. Every candidate tuple is checked
//! against the full condition conjunction, and accepted tuples are
//! materialized into a reusable output buffer for printing.

use std::collections::HashMap;
use std::io::Write;

use tracing::debug;

use crate::ast::{Condition, RelAttr};
use crate::catalog::{AttrInfo, Catalog};
use crate::datum::{CompOp, Value};
use crate::heap::{FileScan, HeapManager, Record};
use crate::tuple::{align4, satisfies, FieldRef, TupleView};

use super::cond::{CompiledCondition, CompiledRhs};
use super::error::ExecutorError;
use super::printer::Printer;
use super::resolve::AttrResolver;

/// A compiled condition bound to the relation indices of its operands,
/// for indexing into the per-relation current-tuple array.
struct BoundCondition {
    lhs: AttrInfo,
    lhs_rel: usize,
    op: CompOp,
    rhs: BoundRhs,
}

enum BoundRhs {
    Attr(AttrInfo, usize),
    Value(Value),
}

impl BoundCondition {
    fn satisfied(&self, views: &[TupleView<'_>]) -> bool {
        let lhs = views[self.lhs_rel].field(&self.lhs);
        let rhs = match &self.rhs {
            BoundRhs::Attr(attr, rel) => views[*rel].field(attr),
            BoundRhs::Value(value) => FieldRef::from_value(value),
        };
        satisfies(lhs, rhs, self.op)
    }
}

/// Executes a SELECT statement, writing rows and progress to `out`.
pub(crate) fn select<W: Write>(
    heap: &HeapManager,
    catalog: &Catalog,
    sel_attrs: &[RelAttr],
    relations: &[&str],
    conditions: &[Condition],
    out: &mut W,
) -> Result<(), ExecutorError> {
    debug_assert!(!relations.is_empty());
    if relations.is_empty() {
        return Ok(());
    }

    let files = relations
        .iter()
        .map(|rel| heap.open_file(rel))
        .collect::<Result<Vec<_>, _>>()?;
    let entries = relations
        .iter()
        .map(|rel| catalog.rel_entry(rel))
        .collect::<Result<Vec<_>, _>>()?;
    let rel_attrs = relations
        .iter()
        .map(|rel| catalog.attributes(rel))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(relations = relations.len(), "relation files opened");

    let resolver = AttrResolver::new(&rel_attrs);
    let rel_num: HashMap<&str, usize> = relations
        .iter()
        .enumerate()
        .map(|(i, rel)| (*rel, i))
        .collect();

    // A lone "*" selects every attribute of every relation, in relation
    // order then offset order.
    let star = sel_attrs.len() == 1 && sel_attrs[0].attr == "*";
    let projections: Vec<AttrInfo> = if star {
        rel_attrs.iter().flatten().cloned().collect()
    } else {
        sel_attrs
            .iter()
            .map(|sel| resolver.resolve(sel).cloned())
            .collect::<Result<_, _>>()?
    };

    let mut conds = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let compiled = CompiledCondition::compile(condition, &resolver)?;
        let lhs_rel = rel_num[compiled.lhs.rel_name.as_str()];
        let rhs = match compiled.rhs {
            CompiledRhs::Attr(attr) => {
                let rel = rel_num[attr.rel_name.as_str()];
                BoundRhs::Attr(attr, rel)
            }
            CompiledRhs::Value(value) => BoundRhs::Value(value),
        };
        debug!(condition = %condition, "condition compiled");
        conds.push(BoundCondition {
            lhs: compiled.lhs,
            lhs_rel,
            op: compiled.op,
            rhs,
        });
    }

    // Output layout: one 4-byte-aligned slot per projected attribute,
    // nullable projections taking fresh null-array indices in select
    // order.
    let mut headers = Vec::with_capacity(projections.len());
    let mut sel_rel = Vec::with_capacity(projections.len());
    let mut record_size = 0usize;
    let mut nullable_index = 0u16;
    for proj in &projections {
        let mut header = proj.clone();
        header.offset = record_size;
        record_size += align4(proj.attr_size);
        header.nullable_index = if proj.nullable() {
            let i = nullable_index;
            nullable_index += 1;
            Some(i)
        } else {
            None
        };
        sel_rel.push(rel_num[proj.rel_name.as_str()]);
        headers.push(header);
    }
    debug!(
        columns = projections.len(),
        record_size, "projection laid out"
    );

    let mut printer = Printer::new(headers.clone());
    printer.print_header(out)?;

    let sum_records: usize = entries.iter().map(|e| e.record_count).product();
    if sum_records == 0 {
        // Some relation is empty; the product is empty without opening
        // a single scan.
        write!(out, "[100%] 0/0\r")?;
        printer.print_footer(out)?;
        return Ok(());
    }
    let step = sum_records.div_ceil(100);

    let mut out_buf = vec![0u8; record_size];
    let mut out_null = vec![false; nullable_index as usize];

    let mut scans: Vec<Option<FileScan<'_>>> = relations.iter().map(|_| None).collect();
    let mut current: Vec<Option<Record>> = relations.iter().map(|_| None).collect();
    scans[0] = Some(files[0].scan(None));
    let mut ptr: isize = 0;
    let mut cnt = 0usize;

    'join: loop {
        // Advance: pull the next record at the innermost open scan,
        // backing out of finished scans.
        loop {
            if ptr < 0 {
                break 'join;
            }
            let p = ptr as usize;
            let next = match scans[p].as_mut() {
                Some(scan) => scan.next_record()?,
                None => None,
            };
            match next {
                Some(record) => {
                    current[p] = Some(record);
                    break;
                }
                None => {
                    scans[p] = None;
                    ptr -= 1;
                }
            }
        }

        // Descend: open the remaining inner scans on their first
        // records.
        let mut p = ptr as usize;
        while p + 1 < relations.len() {
            p += 1;
            let mut scan = files[p].scan(None);
            match scan.next_record()? {
                Some(record) => {
                    current[p] = Some(record);
                    scans[p] = Some(scan);
                }
                None => {
                    ptr = p as isize - 1;
                    continue 'join;
                }
            }
        }
        ptr = relations.len() as isize - 1;

        cnt += 1;
        if cnt % step == 0 {
            write!(out, "[{}%] {}/{}\r", 100 * cnt / sum_records, cnt, sum_records)?;
            out.flush()?;
        }

        let views: Vec<TupleView<'_>> = current
            .iter()
            .filter_map(|rec| rec.as_ref())
            .map(|rec| TupleView::new(&rec.data, &rec.is_null))
            .collect();
        debug_assert_eq!(views.len(), relations.len());

        if conds.iter().all(|cond| cond.satisfied(&views)) {
            for (i, proj) in projections.iter().enumerate() {
                let view = &views[sel_rel[i]];
                let dst = headers[i].offset;
                out_buf[dst..dst + proj.attr_size].copy_from_slice(view.raw_field(proj));
                if let Some(ni) = headers[i].nullable_index {
                    out_null[ni as usize] = view.is_field_null(proj);
                }
            }
            printer.print(out, &out_buf, &out_null)?;
            write!(out, "[{}%] {}/{}\r", 100 * cnt / sum_records, cnt, sum_records)?;
            out.flush()?;
        }
    }

    write!(out, "[100%] {}/{}\r", sum_records, sum_records)?;
    debug_assert_eq!(cnt, sum_records);
    printer.print_footer(out)?;
    debug!(candidates = cnt, rows = printer.count(), "select finished");
    Ok(())
}
