//! Variable resolution against the bindings store.
//!
//! `match_value` is the single resolution primitive the expander uses for
//! identifiers, relation arguments, and attribute values. It leaves
//! concrete values untouched, substitutes bound variables, and mints
//! fresh `ex_uuid:` identifiers for unbound `vargen:` variables.
//!
//! Minted identifier lists are memoised into the store under the
//! `vargen:` name, so a node and a relation referencing the same variable
//! observe the same sequence.

use crate::bindings::{BindingsStore, BoundValue};
use crate::qname::{Namespace, QualifiedName, Value};
use uuid::Uuid;

/// The result of resolving one value against the bindings store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Not a variable; the value passes through verbatim.
    Concrete(Value),
    /// A variable with a binding (pre-existing or freshly minted).
    Bound(BoundValue),
    /// A `var:` variable with no binding. The caller decides whether
    /// absence is fatal: it is in element and bundle identifier position,
    /// tolerated in relation argument and attribute value position.
    Unbound(QualifiedName),
}

/// Mints one fresh identifier in the `ex_uuid:` namespace.
pub fn mint_identifier() -> QualifiedName {
    QualifiedName::new(Namespace::ex_uuid(), Uuid::new_v4().to_string())
}

/// Resolves a value against the bindings store.
///
/// `mint` is the number of fresh identifiers to create for an unbound
/// `vargen:` variable: the group cardinality in element identifier
/// position, the expansion count in relation identifier position, and 1
/// everywhere else. The minted list is memoised so later references to
/// the same variable resolve to the same identifiers.
pub fn match_value(value: &Value, store: &mut BindingsStore, mint: usize) -> MatchOutcome {
    let variable = match value.variable() {
        Some(qn) => qn,
        None => return MatchOutcome::Concrete(value.clone()),
    };

    if let Some(bound) = store.get(variable) {
        return MatchOutcome::Bound(bound.clone());
    }

    if variable.is_vargen() {
        let minted: Vec<Value> = (0..mint)
            .map(|_| Value::Qualified(mint_identifier()))
            .collect();
        let bound = BoundValue::List(minted);
        store.put(variable.clone(), bound.clone());
        return MatchOutcome::Bound(bound);
    }

    MatchOutcome::Unbound(variable.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::EX_UUID_PREFIX;

    #[test]
    fn test_concrete_values_pass_through() {
        let mut store = BindingsStore::new();

        let literal = Value::literal("hello");
        assert_eq!(
            match_value(&literal, &mut store, 1),
            MatchOutcome::Concrete(literal.clone())
        );

        let concrete = Value::Qualified(QualifiedName::prov("Person"));
        assert_eq!(
            match_value(&concrete, &mut store, 1),
            MatchOutcome::Concrete(concrete.clone())
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_bound_var_resolves_to_stored_value() {
        let mut store = BindingsStore::new();
        let var = QualifiedName::var("x");
        let bound = BoundValue::List(vec![Value::literal("a"), Value::literal("b")]);
        store.put(var.clone(), bound.clone());

        assert_eq!(
            match_value(&Value::Qualified(var), &mut store, 1),
            MatchOutcome::Bound(bound)
        );
    }

    #[test]
    fn test_unbound_var_is_reported_not_minted() {
        let mut store = BindingsStore::new();
        let var = QualifiedName::var("x");
        assert_eq!(
            match_value(&Value::Qualified(var.clone()), &mut store, 3),
            MatchOutcome::Unbound(var)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_unbound_vargen_mints_and_memoises() {
        let mut store = BindingsStore::new();
        let var = QualifiedName::vargen("x");

        let first = match_value(&Value::Qualified(var.clone()), &mut store, 3);
        let minted = match &first {
            MatchOutcome::Bound(BoundValue::List(values)) => values.clone(),
            other => panic!("expected minted list, got {:?}", other),
        };
        assert_eq!(minted.len(), 3);
        for value in &minted {
            let qn = value.qualified_name().expect("minted values are QNs");
            assert_eq!(qn.prefix(), EX_UUID_PREFIX);
        }

        // A later reference sees the same list regardless of its own mint
        // count.
        let second = match_value(&Value::Qualified(var), &mut store, 1);
        assert_eq!(second, first);
    }

    #[test]
    fn test_minted_identifiers_are_distinct() {
        let a = mint_identifier();
        let b = mint_identifier();
        assert_ne!(a, b);
    }
}
