//! The bindings store: variable-to-value mappings driving expansion.
//!
//! A binding maps a variable qualified name (`var:x` or `vargen:x`) to one
//! of three shapes:
//!
//! - [`BoundValue::Scalar`] - a single value;
//! - [`BoundValue::List`] - an ordered list, one value per expansion index;
//! - [`BoundValue::Grid`] - a two-dimensional list, used for
//!   attribute-position variables that are themselves multi-valued per
//!   expansion index (one row is selected per index, then every cell of
//!   the row is emitted under the same attribute name).
//!
//! The store is immutable input during an expansion except for `vargen:`
//! memoisation: the matcher records minted identifier lists here so every
//! later reference observes the same sequence.

use crate::qname::{QualifiedName, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The value bound to one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundValue {
    /// A single value
    Scalar(Value),
    /// An ordered list of values, one per expansion index
    List(Vec<Value>),
    /// An ordered list of rows, one row per expansion index
    Grid(Vec<Vec<Value>>),
}

impl BoundValue {
    /// The expansion cardinality of the binding: 1 for a scalar, the
    /// outer length for a list or grid.
    pub fn cardinality(&self) -> usize {
        match self {
            BoundValue::Scalar(_) => 1,
            BoundValue::List(values) => values.len(),
            BoundValue::Grid(rows) => rows.len(),
        }
    }

    /// Returns the binding's values as a flat list: a scalar becomes a
    /// one-element list. Grids have no flat form and return `None`.
    pub fn as_list(&self) -> Option<Vec<Value>> {
        match self {
            BoundValue::Scalar(value) => Some(vec![value.clone()]),
            BoundValue::List(values) => Some(values.clone()),
            BoundValue::Grid(_) => None,
        }
    }
}

/// A mapping from variable qualified names to bound values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingsStore {
    entries: HashMap<QualifiedName, BoundValue>,
}

impl BindingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the binding for a variable.
    pub fn get(&self, variable: &QualifiedName) -> Option<&BoundValue> {
        self.entries.get(variable)
    }

    /// Returns true if the variable has a binding.
    pub fn is_bound(&self, variable: &QualifiedName) -> bool {
        self.entries.contains_key(variable)
    }

    /// Inserts or replaces a binding.
    ///
    /// During expansion this is called only by the matcher, to memoise
    /// minted `vargen:` identifier lists.
    pub fn put(&mut self, variable: QualifiedName, value: BoundValue) {
        self.entries.insert(variable, value);
    }

    /// The expansion cardinality of a variable: 0 when absent, otherwise
    /// the binding's own cardinality.
    pub fn cardinality(&self, variable: &QualifiedName) -> usize {
        self.entries
            .get(variable)
            .map(BoundValue::cardinality)
            .unwrap_or(0)
    }

    /// The number of bindings in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the bindings sorted by variable name, for
    /// deterministic serialisation.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&QualifiedName, &BoundValue)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter()
    }
}
