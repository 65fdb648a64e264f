//! Database facade.
//!
//! [`Database`] ties the record manager, catalog, and executor
//! together behind one handle: open a directory, define relations, run
//! statements. Statement output defaults to stdout; the `*_to`
//! variants take an explicit sink, which is what tests use.

use std::io::Write;
use std::path::PathBuf;

use crate::ast::{CondRhs, Condition, RelAttr};
use crate::catalog::{AttrDef, Catalog, CatalogError};
use crate::datum::Value;
use crate::executor::{Executor, ExecutorError};
use crate::heap::{HeapManager, Rid};

/// A database rooted at a directory.
pub struct Database {
    heap: HeapManager,
    catalog: Catalog,
}

impl Database {
    /// Opens the database in `dir`, creating the directory and
    /// bootstrapping the catalog on first use.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CatalogError::Heap(crate::heap::HeapError::Io(e)))?;
        let heap = HeapManager::new(dir);
        let catalog = Catalog::open(heap.clone())?;
        Ok(Self { heap, catalog })
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Defines a new relation.
    pub fn create_table(&self, name: &str, defs: &[AttrDef]) -> Result<(), CatalogError> {
        self.catalog.create_table(name, defs)
    }

    /// Removes a relation and its records.
    pub fn drop_table(&self, name: &str) -> Result<(), CatalogError> {
        self.catalog.drop_table(name)
    }

    /// Runs a SELECT against stdout.
    pub fn select(
        &self,
        sel_attrs: &[RelAttr],
        relations: &[&str],
        conditions: &[Condition],
    ) -> Result<(), ExecutorError> {
        self.select_to(sel_attrs, relations, conditions, &mut std::io::stdout())
    }

    /// Runs a SELECT against an explicit output sink.
    pub fn select_to<W: Write>(
        &self,
        sel_attrs: &[RelAttr],
        relations: &[&str],
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<(), ExecutorError> {
        self.executor().select(sel_attrs, relations, conditions, out)
    }

    /// Inserts one tuple, returning its RID.
    pub fn insert(&self, rel: &str, values: &[Value]) -> Result<Rid, ExecutorError> {
        self.executor().insert(rel, values)
    }

    /// Runs a DELETE against stdout, returning the deleted count.
    pub fn delete(&self, rel: &str, conditions: &[Condition]) -> Result<usize, ExecutorError> {
        self.delete_to(rel, conditions, &mut std::io::stdout())
    }

    /// Runs a DELETE against an explicit output sink.
    pub fn delete_to<W: Write>(
        &self,
        rel: &str,
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        self.executor().delete(rel, conditions, out)
    }

    /// Runs an UPDATE against stdout, returning the updated count.
    pub fn update(
        &self,
        rel: &str,
        target: &RelAttr,
        rhs: &CondRhs,
        conditions: &[Condition],
    ) -> Result<usize, ExecutorError> {
        self.update_to(rel, target, rhs, conditions, &mut std::io::stdout())
    }

    /// Runs an UPDATE against an explicit output sink.
    pub fn update_to<W: Write>(
        &self,
        rel: &str,
        target: &RelAttr,
        rhs: &CondRhs,
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        self.executor().update(rel, target, rhs, conditions, out)
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.heap, &self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::CompOp;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("db");
        let db = Database::open(&path).unwrap();
        assert!(path.is_dir());
        db.create_table("t", &[AttrDef::int("x").notnull()]).unwrap();
    }

    #[test]
    fn test_statement_roundtrip() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        db.create_table(
            "s",
            &[AttrDef::int("id").notnull(), AttrDef::string("name", 8)],
        )
        .unwrap();

        db.insert("s", &[Value::Int(1), Value::Str("alice".into())])
            .unwrap();
        db.insert("s", &[Value::Int(2), Value::Null]).unwrap();

        let mut out = Vec::new();
        db.select_to(&[RelAttr::bare("*")], &["s"], &[], &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("alice"));
        assert!(text.contains("NULL"));
        assert!(text.contains("2 tuple(s)."));

        let mut out = Vec::new();
        let deleted = db
            .delete_to(
                "s",
                &[Condition::attr_value(
                    RelAttr::bare("id"),
                    CompOp::Eq,
                    Value::Int(1),
                )],
                &mut out,
            )
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.catalog().rel_entry("s").unwrap().record_count, 1);
    }
}
