//! Condition compilation and evaluation.
//!
//! A parsed [`Condition`] is validated once per statement and bound to
//! concrete attribute descriptors; the compiled form is then evaluated
//! against tuple buffers with the degenerate three-valued logic of the
//! engine: a comparison with a NULL operand is false, so rows with
//! nulls are rejected rather than left unknown.

use crate::ast::{CondRhs, Condition};
use crate::catalog::AttrInfo;
use crate::datum::{can_assign_to, CompOp, Value};
use crate::tuple::{satisfies, FieldRef, TupleView};

use super::error::ExecutorError;
use super::resolve::AttrResolver;

/// A validated condition bound to attribute descriptors.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    /// Left-hand attribute.
    pub lhs: AttrInfo,
    /// Condition operator.
    pub op: CompOp,
    /// Bound right-hand side.
    pub rhs: CompiledRhs,
}

/// Right-hand side of a compiled condition.
#[derive(Debug, Clone)]
pub enum CompiledRhs {
    /// Another attribute of the statement's relations.
    Attr(AttrInfo),
    /// A literal value.
    Value(Value),
}

impl CompiledCondition {
    /// Validates `cond` against the resolver and binds its operands.
    ///
    /// Attribute-to-attribute conditions require exactly equal types
    /// (INT and FLOAT never compare, though INT values assign to FLOAT
    /// attributes); attribute-to-value conditions require the value to
    /// be assignable to the attribute.
    pub fn compile(cond: &Condition, resolver: &AttrResolver) -> Result<Self, ExecutorError> {
        let lhs = resolver.resolve(&cond.lhs)?.clone();
        let rhs = match &cond.rhs {
            CondRhs::Attr(reference) => {
                let rhs = resolver.resolve(reference)?.clone();
                if lhs.attr_type != rhs.attr_type {
                    return Err(ExecutorError::AttrTypesMismatch {
                        lhs: lhs.attr_type,
                        rhs: rhs.attr_type,
                    });
                }
                CompiledRhs::Attr(rhs)
            }
            CondRhs::Value(value) => {
                if !can_assign_to(lhs.attr_type, value, lhs.nullable()) {
                    return Err(ExecutorError::ValueTypesMismatch {
                        attr: lhs.attr_name.clone(),
                        attr_type: lhs.attr_type,
                    });
                }
                CompiledRhs::Value(value.clone())
            }
        };
        Ok(Self {
            lhs,
            op: cond.op,
            rhs,
        })
    }

    /// Evaluates this condition against a single tuple.
    ///
    /// Both operands are fields of the same tuple (or a literal); this
    /// is the form DELETE and UPDATE use, where only one relation is in
    /// scope.
    pub fn satisfied_by(&self, tuple: TupleView<'_>) -> bool {
        let lhs = tuple.field(&self.lhs);
        let rhs = match &self.rhs {
            CompiledRhs::Attr(attr) => tuple.field(attr),
            CompiledRhs::Value(value) => FieldRef::from_value(value),
        };
        satisfies(lhs, rhs, self.op)
    }
}
