//! DML statement executors (INSERT, DELETE, UPDATE).
//!
//! Each executor validates the whole statement against the catalog
//! before touching a single record, then drives the record manager:
//! INSERT builds one tuple buffer and stores it, DELETE and UPDATE
//! scan the relation and mutate matching records by RID. INSERT and
//! DELETE maintain the relation's record count in the catalog.

use std::io::Write;

use tracing::{debug, trace};

use crate::ast::{CondRhs, Condition, RelAttr};
use crate::catalog::{is_reserved, AttrInfo, Catalog};
use crate::datum::{can_assign_to, AttrType, Value};
use crate::heap::{HeapManager, Rid};
use crate::tuple::{write_float, write_int, write_str, FieldRef, TupleView, TupleWriter};

use super::cond::CompiledCondition;
use super::error::ExecutorError;
use super::resolve::AttrResolver;

/// Executes an INSERT of one tuple, returning its new RID.
pub(crate) fn insert(
    heap: &HeapManager,
    catalog: &Catalog,
    rel: &str,
    values: &[Value],
) -> Result<Rid, ExecutorError> {
    if is_reserved(rel) {
        return Err(ExecutorError::Forbidden { rel: rel.into() });
    }
    let mut entry = catalog.rel_entry(rel)?;
    let attrs = catalog.attributes(rel)?;

    if values.len() != attrs.len() {
        return Err(ExecutorError::AttrCountMismatch {
            expected: attrs.len(),
            found: values.len(),
        });
    }
    for (attr, value) in attrs.iter().zip(values) {
        if !can_assign_to(attr.attr_type, value, attr.nullable()) {
            return Err(ExecutorError::ValueTypesMismatch {
                attr: attr.attr_name.clone(),
                attr_type: attr.attr_type,
            });
        }
    }

    let null_count = attrs.iter().filter(|a| a.nullable()).count();
    let mut writer = TupleWriter::new(entry.tuple_length, null_count);
    for (attr, value) in attrs.iter().zip(values) {
        match value {
            Value::Null => writer.set_null(attr),
            Value::Int(v) => match attr.attr_type {
                // INT literals widen into FLOAT attributes.
                AttrType::Float => writer.put_float(attr, *v as f32),
                _ => writer.put_int(attr, *v),
            },
            Value::Float(v) => writer.put_float(attr, *v),
            Value::Str(s) => {
                if s.len() > attr.display_len {
                    return Err(ExecutorError::StringValTooLong {
                        attr: attr.attr_name.clone(),
                        max: attr.display_len,
                        len: s.len(),
                    });
                }
                writer.put_str(attr, s.as_bytes());
            }
        }
    }

    let (data, is_null) = writer.into_parts();
    let file = heap.open_file(rel)?;
    let rid = file.insert(&data, &is_null)?;

    entry.record_count += 1;
    catalog.update_rel_entry(&entry)?;
    debug!(rel, page = rid.page, slot = rid.slot, "tuple inserted");
    Ok(rid)
}

/// Executes a DELETE, writing the summary line to `out`.
///
/// Returns the number of deleted tuples.
pub(crate) fn delete<W: Write>(
    heap: &HeapManager,
    catalog: &Catalog,
    rel: &str,
    conditions: &[Condition],
    out: &mut W,
) -> Result<usize, ExecutorError> {
    if is_reserved(rel) {
        return Err(ExecutorError::Forbidden { rel: rel.into() });
    }
    let mut entry = catalog.rel_entry(rel)?;
    let attrs = catalog.attributes(rel)?;
    let conds = compile_single_rel(conditions, &[attrs])?;

    let file = heap.open_file(rel)?;
    let mut scan = file.scan(None);
    let mut deleted = 0usize;
    while let Some(record) = scan.next_record()? {
        let view = TupleView::new(&record.data, &record.is_null);
        if conds.iter().all(|cond| cond.satisfied_by(view)) {
            file.delete(record.rid)?;
            deleted += 1;
            trace!(rel, page = record.rid.page, slot = record.rid.slot, "tuple deleted");
        }
    }

    entry.record_count = entry.record_count.saturating_sub(deleted);
    catalog.update_rel_entry(&entry)?;
    writeln!(out, "{} tuple(s) deleted.", deleted)?;
    Ok(deleted)
}

/// Executes an UPDATE, writing the summary line to `out`.
///
/// Returns the number of updated tuples.
pub(crate) fn update<W: Write>(
    heap: &HeapManager,
    catalog: &Catalog,
    rel: &str,
    target: &RelAttr,
    rhs: &CondRhs,
    conditions: &[Condition],
    out: &mut W,
) -> Result<usize, ExecutorError> {
    if is_reserved(rel) {
        return Err(ExecutorError::Forbidden { rel: rel.into() });
    }
    catalog.rel_entry(rel)?;
    let attrs = catalog.attributes(rel)?;
    let resolver = AttrResolver::new(std::slice::from_ref(&attrs));

    let target_attr = resolver.resolve(target)?.clone();
    let rhs_attr = match rhs {
        CondRhs::Attr(reference) => {
            let info = resolver.resolve(reference)?.clone();
            if info.attr_type != target_attr.attr_type {
                return Err(ExecutorError::AttrTypesMismatch {
                    lhs: target_attr.attr_type,
                    rhs: info.attr_type,
                });
            }
            Some(info)
        }
        CondRhs::Value(value) => {
            if value.is_null() && !target_attr.nullable() {
                return Err(ExecutorError::AttrIsNotnull {
                    attr: target_attr.attr_name.clone(),
                });
            }
            if !can_assign_to(target_attr.attr_type, value, target_attr.nullable()) {
                return Err(ExecutorError::ValueTypesMismatch {
                    attr: target_attr.attr_name.clone(),
                    attr_type: target_attr.attr_type,
                });
            }
            if let Value::Str(s) = value {
                if s.len() > target_attr.display_len {
                    return Err(ExecutorError::StringValTooLong {
                        attr: target_attr.attr_name.clone(),
                        max: target_attr.display_len,
                        len: s.len(),
                    });
                }
            }
            None
        }
    };

    let conds = conditions
        .iter()
        .map(|cond| CompiledCondition::compile(cond, &resolver))
        .collect::<Result<Vec<_>, _>>()?;

    let file = heap.open_file(rel)?;
    let mut scan = file.scan(None);
    let mut updated = 0usize;
    while let Some(mut record) = scan.next_record()? {
        let matched = {
            let view = TupleView::new(&record.data, &record.is_null);
            conds.iter().all(|cond| cond.satisfied_by(view))
        };
        if !matched {
            continue;
        }

        // Materialize the new field value before mutating the buffer.
        let new_field = match (&rhs_attr, rhs) {
            (Some(src), _) => {
                let view = TupleView::new(&record.data, &record.is_null);
                match view.field(src) {
                    None => NewField::Null,
                    Some(FieldRef::Int(v)) => NewField::Int(v),
                    Some(FieldRef::Float(v)) => NewField::Float(v),
                    Some(FieldRef::Str(bytes)) => {
                        if bytes.len() > target_attr.display_len {
                            return Err(ExecutorError::StringValTooLong {
                                attr: target_attr.attr_name.clone(),
                                max: target_attr.display_len,
                                len: bytes.len(),
                            });
                        }
                        NewField::Bytes(bytes.to_vec())
                    }
                }
            }
            (None, CondRhs::Value(value)) => match value {
                Value::Null => NewField::Null,
                Value::Int(v) => match target_attr.attr_type {
                    AttrType::Float => NewField::Float(*v as f32),
                    _ => NewField::Int(*v),
                },
                Value::Float(v) => NewField::Float(*v),
                Value::Str(s) => NewField::Bytes(s.clone().into_bytes()),
            },
            (None, CondRhs::Attr(_)) => unreachable!(),
        };

        match new_field {
            NewField::Null => match target_attr.nullable_index {
                Some(i) => record.is_null[i as usize] = true,
                None => {
                    // Only reachable through an attribute rhs whose
                    // field is NULL in this tuple.
                    return Err(ExecutorError::AttrIsNotnull {
                        attr: target_attr.attr_name.clone(),
                    });
                }
            },
            NewField::Int(v) => {
                clear_null(&mut record.is_null, &target_attr);
                write_int(&mut record.data, target_attr.offset, v);
            }
            NewField::Float(v) => {
                clear_null(&mut record.is_null, &target_attr);
                write_float(&mut record.data, target_attr.offset, v);
            }
            NewField::Bytes(bytes) => {
                clear_null(&mut record.is_null, &target_attr);
                write_str(
                    &mut record.data,
                    target_attr.offset,
                    target_attr.attr_size,
                    &bytes,
                );
            }
        }

        file.update(&record)?;
        updated += 1;
        trace!(rel, page = record.rid.page, slot = record.rid.slot, "tuple updated");
    }

    writeln!(out, "{} tuple(s) updated.", updated)?;
    Ok(updated)
}

enum NewField {
    Null,
    Int(i32),
    Float(f32),
    Bytes(Vec<u8>),
}

fn clear_null(is_null: &mut [bool], attr: &AttrInfo) {
    if let Some(i) = attr.nullable_index {
        is_null[i as usize] = false;
    }
}

/// Compiles the condition list of a single-relation statement.
///
/// Qualified references to any other relation miss the resolver maps
/// and fail with `AttrNotExist`, which doubles as the belongs-to check.
fn compile_single_rel(
    conditions: &[Condition],
    rel_attrs: &[Vec<AttrInfo>],
) -> Result<Vec<CompiledCondition>, ExecutorError> {
    let resolver = AttrResolver::new(rel_attrs);
    conditions
        .iter()
        .map(|cond| CompiledCondition::compile(cond, &resolver))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AttrDef;
    use crate::datum::CompOp;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, HeapManager, Catalog) {
        let dir = tempdir().unwrap();
        let heap = HeapManager::new(dir.path());
        let catalog = Catalog::open(heap.clone()).unwrap();
        catalog
            .create_table(
                "s",
                &[AttrDef::int("id").notnull(), AttrDef::string("name", 8)],
            )
            .unwrap();
        (dir, heap, catalog)
    }

    #[test]
    fn test_insert_roundtrip() {
        let (_dir, heap, catalog) = setup();
        let rid = insert(
            &heap,
            &catalog,
            "s",
            &[Value::Int(1), Value::Str("alice".into())],
        )
        .unwrap();

        let file = heap.open_file("s").unwrap();
        let record = file.record(rid).unwrap();
        assert_eq!(&record.data[0..4], &1i32.to_le_bytes());
        assert_eq!(&record.data[4..10], b"alice\0");
        assert_eq!(record.is_null, vec![false]);
        assert_eq!(catalog.rel_entry("s").unwrap().record_count, 1);
    }

    #[test]
    fn test_insert_null_sets_bit() {
        let (_dir, heap, catalog) = setup();
        let rid = insert(&heap, &catalog, "s", &[Value::Int(2), Value::Null]).unwrap();
        let record = heap.open_file("s").unwrap().record(rid).unwrap();
        assert_eq!(record.is_null, vec![true]);
    }

    #[test]
    fn test_insert_validation_errors() {
        let (_dir, heap, catalog) = setup();
        assert!(matches!(
            insert(&heap, &catalog, "relcat", &[Value::Int(0)]),
            Err(ExecutorError::Forbidden { .. })
        ));
        assert!(matches!(
            insert(&heap, &catalog, "s", &[Value::Int(1)]),
            Err(ExecutorError::AttrCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        // NULL into NOT NULL is an assignability failure on INSERT.
        assert!(matches!(
            insert(&heap, &catalog, "s", &[Value::Null, Value::Null]),
            Err(ExecutorError::ValueTypesMismatch { .. })
        ));
        assert!(matches!(
            insert(
                &heap,
                &catalog,
                "s",
                &[Value::Int(1), Value::Str("nine char".into())]
            ),
            Err(ExecutorError::StringValTooLong { max: 8, len: 9, .. })
        ));
        // Nothing was inserted by the failed statements.
        assert_eq!(catalog.rel_entry("s").unwrap().record_count, 0);
    }

    #[test]
    fn test_insert_widens_int_to_float() {
        let (_dir, heap, catalog) = setup();
        catalog
            .create_table("t", &[AttrDef::float("score")])
            .unwrap();
        let rid = insert(&heap, &catalog, "t", &[Value::Int(90)]).unwrap();
        let record = heap.open_file("t").unwrap().record(rid).unwrap();
        assert_eq!(&record.data[0..4], &90.0f32.to_le_bytes());
    }

    #[test]
    fn test_delete_with_condition() {
        let (_dir, heap, catalog) = setup();
        for (id, name) in [(1, Some("alice")), (2, None), (3, Some("carol"))] {
            let name = match name {
                Some(s) => Value::Str(s.into()),
                None => Value::Null,
            };
            insert(&heap, &catalog, "s", &[Value::Int(id), name]).unwrap();
        }

        let mut out = Vec::new();
        let n = delete(
            &heap,
            &catalog,
            "s",
            &[Condition::attr_value(
                RelAttr::bare("id"),
                CompOp::Le,
                Value::Int(2),
            )],
            &mut out,
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "2 tuple(s) deleted.\n");
        assert_eq!(catalog.rel_entry("s").unwrap().record_count, 1);
    }

    #[test]
    fn test_delete_rejects_foreign_attr() {
        let (_dir, heap, catalog) = setup();
        let mut out = Vec::new();
        let result = delete(
            &heap,
            &catalog,
            "s",
            &[Condition::attr_value(
                RelAttr::qualified("t", "id"),
                CompOp::Eq,
                Value::Int(1),
            )],
            &mut out,
        );
        assert!(matches!(result, Err(ExecutorError::AttrNotExist { .. })));
    }

    #[test]
    fn test_update_value_and_null_bit() {
        let (_dir, heap, catalog) = setup();
        let rid = insert(&heap, &catalog, "s", &[Value::Int(2), Value::Null]).unwrap();

        let mut out = Vec::new();
        let n = update(
            &heap,
            &catalog,
            "s",
            &RelAttr::bare("name"),
            &CondRhs::Value(Value::Str("bob".into())),
            &[Condition::attr_value(
                RelAttr::bare("id"),
                CompOp::Eq,
                Value::Int(2),
            )],
            &mut out,
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "1 tuple(s) updated.\n");

        let record = heap.open_file("s").unwrap().record(rid).unwrap();
        assert_eq!(record.is_null, vec![false]);
        assert_eq!(&record.data[4..8], b"bob\0");

        // Set it back to NULL.
        let mut out = Vec::new();
        update(
            &heap,
            &catalog,
            "s",
            &RelAttr::bare("name"),
            &CondRhs::Value(Value::Null),
            &[],
            &mut out,
        )
        .unwrap();
        let record = heap.open_file("s").unwrap().record(rid).unwrap();
        assert_eq!(record.is_null, vec![true]);
    }

    #[test]
    fn test_update_notnull_to_null_rejected() {
        let (_dir, heap, catalog) = setup();
        insert(&heap, &catalog, "s", &[Value::Int(1), Value::Null]).unwrap();

        let mut out = Vec::new();
        let result = update(
            &heap,
            &catalog,
            "s",
            &RelAttr::bare("id"),
            &CondRhs::Value(Value::Null),
            &[],
            &mut out,
        );
        assert!(matches!(result, Err(ExecutorError::AttrIsNotnull { .. })));
    }

    #[test]
    fn test_update_string_too_long_rejected() {
        let (_dir, heap, catalog) = setup();
        insert(&heap, &catalog, "s", &[Value::Int(1), Value::Null]).unwrap();

        let mut out = Vec::new();
        let result = update(
            &heap,
            &catalog,
            "s",
            &RelAttr::bare("name"),
            &CondRhs::Value(Value::Str("nine char".into())),
            &[],
            &mut out,
        );
        assert!(matches!(
            result,
            Err(ExecutorError::StringValTooLong { max: 8, len: 9, .. })
        ));
    }

    #[test]
    fn test_update_from_attribute() {
        let (_dir, heap, catalog) = setup();
        catalog
            .create_table(
                "p",
                &[AttrDef::int("a").notnull(), AttrDef::int("b").notnull()],
            )
            .unwrap();
        let rid = insert(&heap, &catalog, "p", &[Value::Int(1), Value::Int(9)]).unwrap();

        let mut out = Vec::new();
        update(
            &heap,
            &catalog,
            "p",
            &RelAttr::bare("a"),
            &CondRhs::Attr(RelAttr::bare("b")),
            &[],
            &mut out,
        )
        .unwrap();
        let record = heap.open_file("p").unwrap().record(rid).unwrap();
        assert_eq!(&record.data[0..4], &9i32.to_le_bytes());

        // Mixed-type assignment between attributes is rejected.
        catalog
            .create_table(
                "q",
                &[AttrDef::int("a").notnull(), AttrDef::float("b").notnull()],
            )
            .unwrap();
        let mut out = Vec::new();
        let result = update(
            &heap,
            &catalog,
            "q",
            &RelAttr::bare("a"),
            &CondRhs::Attr(RelAttr::bare("b")),
            &[],
            &mut out,
        );
        assert!(matches!(
            result,
            Err(ExecutorError::AttrTypesMismatch { .. })
        ));
    }

    #[test]
    fn test_update_self_assignment_is_identity() {
        let (_dir, heap, catalog) = setup();
        let rid = insert(
            &heap,
            &catalog,
            "s",
            &[Value::Int(1), Value::Str("alice".into())],
        )
        .unwrap();
        let before = heap.open_file("s").unwrap().record(rid).unwrap();

        let mut out = Vec::new();
        update(
            &heap,
            &catalog,
            "s",
            &RelAttr::bare("name"),
            &CondRhs::Attr(RelAttr::bare("name")),
            &[],
            &mut out,
        )
        .unwrap();
        let after = heap.open_file("s").unwrap().record(rid).unwrap();
        assert_eq!(before, after);
    }
}
