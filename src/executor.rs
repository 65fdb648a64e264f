//! Query execution for parsed statements.
//!
//! This is the statement layer of the engine: given catalog metadata
//! and a tokenized statement, it validates attribute references and
//! condition types, then drives the record manager.
//!
//! - **Attribute resolution** ([`AttrResolver`]): maps possibly
//!   qualified references to catalog descriptors, with ambiguity
//!   detection
//! - **Conditions** ([`CompiledCondition`]): validated predicates with
//!   degenerate three-valued evaluation (rows with NULL operands are
//!   rejected)
//! - **SELECT**: a naive nested-loop join over the FROM relations; all
//!   filtering happens in the evaluator, scans carry no filter
//! - **INSERT / DELETE / UPDATE**: single-relation mutations through
//!   the record manager
//! - **Printing** ([`Printer`]): aligned tabular output with `NULL`
//!   placeholders and a tuple-count footer

pub(crate) mod cond;
pub(crate) mod dml;
mod error;
mod printer;
mod resolve;
mod select;

use std::io::Write;

use crate::ast::{CondRhs, Condition, RelAttr};
use crate::catalog::Catalog;
use crate::datum::Value;
use crate::heap::{HeapManager, Rid};

pub use cond::{CompiledCondition, CompiledRhs};
pub use error::ExecutorError;
pub use printer::{Printer, MAX_PRINT};
pub use resolve::AttrResolver;

/// Statement executor over a record manager and catalog.
///
/// Each entry point validates the full statement before any mutation
/// and releases every file and scan it opens on success and error
/// paths alike.
pub struct Executor<'a> {
    heap: &'a HeapManager,
    catalog: &'a Catalog,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the given record manager and catalog.
    pub fn new(heap: &'a HeapManager, catalog: &'a Catalog) -> Self {
        Self { heap, catalog }
    }

    /// Executes a SELECT, writing rows, progress, and the footer to
    /// `out`.
    ///
    /// A select list consisting of the single attribute `*` projects
    /// every attribute of every FROM relation.
    pub fn select<W: Write>(
        &self,
        sel_attrs: &[RelAttr],
        relations: &[&str],
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<(), ExecutorError> {
        select::select(self.heap, self.catalog, sel_attrs, relations, conditions, out)
    }

    /// Inserts one tuple into `rel`, returning its RID.
    pub fn insert(&self, rel: &str, values: &[Value]) -> Result<Rid, ExecutorError> {
        dml::insert(self.heap, self.catalog, rel, values)
    }

    /// Deletes the tuples of `rel` matching all `conditions`; writes
    /// the summary line to `out` and returns the count.
    pub fn delete<W: Write>(
        &self,
        rel: &str,
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        dml::delete(self.heap, self.catalog, rel, conditions, out)
    }

    /// Rewrites `target` in the tuples of `rel` matching all
    /// `conditions`; writes the summary line to `out` and returns the
    /// count.
    pub fn update<W: Write>(
        &self,
        rel: &str,
        target: &RelAttr,
        rhs: &CondRhs,
        conditions: &[Condition],
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        dml::update(self.heap, self.catalog, rel, target, rhs, conditions, out)
    }
}
