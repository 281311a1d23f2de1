//! Inherited logger bindings

use super::value::Fields;
use std::sync::Arc;

/// Chain of bindings, one entry per logger from the root down
///
/// A child copies its parent's list of `Arc`s and appends its own entry, so
/// ancestors are never mutated and the chain is cheap to share.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    chain: Vec<Arc<Fields>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    /// Chain with a single root entry; empty fields produce an empty chain
    pub fn root(fields: Fields) -> Self {
        let mut bindings = Self::new();
        if !fields.is_empty() {
            bindings.chain.push(Arc::new(fields));
        }
        bindings
    }

    /// Parent chain plus `fields`
    pub fn child(&self, fields: Fields) -> Self {
        let mut chain = self.chain.clone();
        if !fields.is_empty() {
            chain.push(Arc::new(fields));
        }
        Self { chain }
    }

    /// Entries ordered root first
    pub fn levels(&self) -> &[Arc<Fields>] {
        &self.chain
    }

    /// Flattened view; deeper entries shadow their ancestors
    pub fn merged(&self) -> Fields {
        let mut merged = Fields::new();
        for entry in &self.chain {
            merged.merge_from(entry);
        }
        merged
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}
