//! Attribute reference resolution.
//!
//! Statements refer to attributes by name, optionally qualified with a
//! relation. The resolver maps each reference onto exactly one catalog
//! descriptor, rejecting names that exist nowhere and unqualified names
//! that exist in several FROM relations.

use std::collections::HashMap;

use crate::ast::RelAttr;
use crate::catalog::AttrInfo;

use super::error::ExecutorError;

/// Resolves attribute references against a statement's relations.
pub struct AttrResolver {
    qualified: HashMap<(String, String), AttrInfo>,
    unqualified: HashMap<String, AttrInfo>,
    counts: HashMap<String, usize>,
}

impl AttrResolver {
    /// Builds the lookup maps from the per-relation descriptor lists.
    ///
    /// An attribute name lands in the unqualified map only when it
    /// occurs in exactly one relation.
    pub fn new(rel_attrs: &[Vec<AttrInfo>]) -> Self {
        let mut qualified = HashMap::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for attrs in rel_attrs {
            for attr in attrs {
                qualified.insert(
                    (attr.rel_name.clone(), attr.attr_name.clone()),
                    attr.clone(),
                );
                *counts.entry(attr.attr_name.clone()).or_insert(0) += 1;
            }
        }

        let mut unqualified = HashMap::new();
        for attrs in rel_attrs {
            for attr in attrs {
                if counts.get(&attr.attr_name) == Some(&1) {
                    unqualified.insert(attr.attr_name.clone(), attr.clone());
                }
            }
        }

        Self {
            qualified,
            unqualified,
            counts,
        }
    }

    /// Resolves one reference to its descriptor.
    ///
    /// # Errors
    ///
    /// `AmbiguousAttrName` when an unqualified name occurs in more than
    /// one relation; `AttrNotExist` when the reference matches nothing.
    pub fn resolve(&self, reference: &RelAttr) -> Result<&AttrInfo, ExecutorError> {
        match &reference.rel {
            Some(rel) => self
                .qualified
                .get(&(rel.clone(), reference.attr.clone()))
                .ok_or_else(|| ExecutorError::AttrNotExist {
                    attr: reference.to_string(),
                }),
            None => match self.counts.get(&reference.attr).copied().unwrap_or(0) {
                0 => Err(ExecutorError::AttrNotExist {
                    attr: reference.to_string(),
                }),
                1 => Ok(&self.unqualified[&reference.attr]),
                _ => Err(ExecutorError::AmbiguousAttrName {
                    attr: reference.to_string(),
                }),
            },
        }
    }
}
