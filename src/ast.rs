//! Parsed-statement inputs.
//!
//! The parser and CLI shell live outside this crate; statements arrive
//! already tokenized as attribute references, conditions, and literal
//! [`Value`]s. These types are the contract between the parser layer and
//! the executor.

use std::fmt;

use crate::datum::{CompOp, Value};

/// A possibly-qualified attribute reference (`attr` or `rel.attr`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelAttr {
    /// Qualifying relation name, if the reference was written `rel.attr`.
    pub rel: Option<String>,
    /// Attribute name.
    pub attr: String,
}

impl RelAttr {
    /// An unqualified reference (`attr`).
    pub fn bare(attr: impl Into<String>) -> Self {
        Self {
            rel: None,
            attr: attr.into(),
        }
    }

    /// A qualified reference (`rel.attr`).
    pub fn qualified(rel: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            rel: Some(rel.into()),
            attr: attr.into(),
        }
    }
}

impl fmt::Display for RelAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rel {
            Some(rel) => write!(f, "{}.{}", rel, self.attr),
            None => f.write_str(&self.attr),
        }
    }
}

/// Right-hand side of a condition or UPDATE assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum CondRhs {
    /// Another attribute reference.
    Attr(RelAttr),
    /// A literal value.
    Value(Value),
}

/// A single WHERE-clause predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Left-hand attribute reference.
    pub lhs: RelAttr,
    /// Condition operator.
    pub op: CompOp,
    /// Right-hand side; ignored for `IsNull`/`NotNull`.
    pub rhs: CondRhs,
}

impl Condition {
    /// An attribute-to-attribute comparison.
    pub fn attr_attr(lhs: RelAttr, op: CompOp, rhs: RelAttr) -> Self {
        Self {
            lhs,
            op,
            rhs: CondRhs::Attr(rhs),
        }
    }

    /// An attribute-to-value comparison.
    pub fn attr_value(lhs: RelAttr, op: CompOp, value: Value) -> Self {
        Self {
            lhs,
            op,
            rhs: CondRhs::Value(value),
        }
    }

    /// An `attr IS NULL` test.
    pub fn is_null(lhs: RelAttr) -> Self {
        Self::attr_value(lhs, CompOp::IsNull, Value::Null)
    }

    /// An `attr IS NOT NULL` test.
    pub fn not_null(lhs: RelAttr) -> Self {
        Self::attr_value(lhs, CompOp::NotNull, Value::Null)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            CompOp::NoOp => f.write_str("*"),
            CompOp::IsNull | CompOp::NotNull => write!(f, "{} {}", self.lhs, self.op),
            _ => match &self.rhs {
                CondRhs::Attr(rhs) => write!(f, "{} {} {}", self.lhs, self.op, rhs),
                CondRhs::Value(v) => write!(f, "{} {} {}", self.lhs, self.op, v),
            },
        }
    }
}
