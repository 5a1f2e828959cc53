//! The template expander: elements, then relations, then bundles.
//!
//! Expansion is single-shot with first-failure semantics. Phase 1 walks
//! the elements parents-first (so children observe minted parent
//! identifiers), emitting one copy per expansion index with per-index
//! attribute selection. Phase 2 walks the relations in template order:
//! arguments belonging to one linked group travel together (zip) while
//! arguments in distinct groups expand cartesian, iterated nested-loop
//! with the first dimension outermost. Phase 3 repeats both phases inside
//! each bundle, sharing the `vargen:` memo so cross-references between
//! the document and its bundles stay consistent.
//!
//! # Example
//!
//! ```rust
//! use provtmpl::bindings::{BindingsStore, BoundValue};
//! use provtmpl::document::{Attribute, Document};
//! use provtmpl::expander::expand;
//! use provtmpl::qname::{Namespace, NamespaceRegistry, QualifiedName, Value};
//!
//! // Template: entity var:quote with prov:value = var:value.
//! let mut registry = NamespaceRegistry::reserved();
//! registry.register(Namespace::new("ex", "http://example.org/#"));
//! let mut template = Document::new(registry);
//! template.entity(
//!     QualifiedName::var("quote"),
//!     vec![Attribute::new(
//!         QualifiedName::prov("value"),
//!         Value::Qualified(QualifiedName::var("value")),
//!     )],
//! );
//!
//! let mut bindings = BindingsStore::new();
//! let ex = Namespace::new("ex", "http://example.org/#");
//! bindings.put(
//!     QualifiedName::var("quote"),
//!     BoundValue::Scalar(Value::Qualified(QualifiedName::new(ex, "q1"))),
//! );
//! bindings.put(
//!     QualifiedName::var("value"),
//!     BoundValue::Scalar(Value::literal("hello")),
//! );
//!
//! let output = expand(&template, bindings).unwrap();
//! assert_eq!(output.records.len(), 1);
//! ```

use crate::bindings::{BindingsStore, BoundValue};
use crate::document::{Attribute, Bundle, Document, Element, FormalArg, Record, Relation};
use crate::error::{BindingsFormatError, ExpansionError};
use crate::groups::{analyze_groups, is_linked_attribute, GroupAnalysis};
use crate::matcher::{match_value, MatchOutcome};
use crate::qname::{NamespaceRegistry, QualifiedName, Value};
use std::collections::HashMap;

/// Expands a template document against a bindings store.
///
/// The store is consumed: expansion memoises minted `vargen:` identifier
/// lists into it, and the memo is discarded with the store when the call
/// returns. The output registry is the reserved namespaces overlaid with
/// the template's registry (bindings-side namespaces are merged into the
/// template registry by the caller before expansion).
pub fn expand(template: &Document, bindings: BindingsStore) -> Result<Document, ExpansionError> {
    let mut store = bindings;
    let mut namespaces = NamespaceRegistry::reserved();
    namespaces.merge(&template.namespaces);

    let mut output = Document::new(namespaces);
    expand_records(&template.records, &mut output.records, &mut store)?;

    for bundle in &template.bundles {
        let id = resolve_bundle_identifier(&bundle.id, &mut store)?;
        let mut expanded = Bundle::new(id);
        expand_records(&bundle.records, &mut expanded.records, &mut store)?;
        output.bundles.push(expanded);
    }

    log::debug!(
        "expanded {} template records into {} output records ({} bundles)",
        template.records.len(),
        output.records.len(),
        output.bundles.len()
    );
    Ok(output)
}

/// Expands one scope (the document body or a bundle body).
fn expand_records(
    records: &[Record],
    out: &mut Vec<Record>,
    store: &mut BindingsStore,
) -> Result<(), ExpansionError> {
    let analysis = analyze_groups(records, store)?;

    for &idx in &analysis.order {
        let element = records[idx]
            .as_element()
            .expect("analysis order holds element indices");
        expand_element(element, &analysis, store, out)?;
    }

    for record in records {
        if let Record::Relation(relation) = record {
            expand_relation(relation, &analysis, store, out)?;
        }
    }
    Ok(())
}

/// An attribute value resolved once, selected per expansion index.
struct ResolvedAttribute {
    name: QualifiedName,
    variable: Option<QualifiedName>,
    outcome: MatchOutcome,
}

fn expand_element(
    element: &Element,
    analysis: &GroupAnalysis,
    store: &mut BindingsStore,
    out: &mut Vec<Record>,
) -> Result<(), ExpansionError> {
    let n = analysis.node_cardinality(&element.id).unwrap_or(1);
    let ids = resolve_element_identifier(&element.id, store, n)?;
    let copies = ids.len();

    // Resolve attribute values once so vargen minting happens a single
    // time; tmpl:linked directives are not data and are stripped.
    let resolved: Vec<ResolvedAttribute> = element
        .attributes
        .iter()
        .filter(|attr| !is_linked_attribute(&attr.name))
        .map(|attr| ResolvedAttribute {
            name: attr.name.clone(),
            variable: attr.value.variable().cloned(),
            outcome: match_value(&attr.value, store, 1),
        })
        .collect();

    for (index, id) in ids.into_iter().enumerate() {
        let attributes = select_attributes(&resolved, index, copies)?;
        out.push(Record::Element(Element {
            kind: element.kind,
            id,
            attributes,
        }));
    }
    Ok(())
}

fn resolve_element_identifier(
    id: &QualifiedName,
    store: &mut BindingsStore,
    n: usize,
) -> Result<Vec<QualifiedName>, ExpansionError> {
    match match_value(&Value::Qualified(id.clone()), store, n) {
        MatchOutcome::Concrete(value) => Ok(vec![require_identifier(value, id)?]),
        MatchOutcome::Unbound(variable) => {
            Err(ExpansionError::UnboundMandatoryVariable { variable })
        }
        MatchOutcome::Bound(BoundValue::Scalar(value)) => Ok(vec![require_identifier(value, id)?]),
        MatchOutcome::Bound(BoundValue::List(values)) => values
            .into_iter()
            .map(|value| require_identifier(value, id))
            .collect(),
        MatchOutcome::Bound(BoundValue::Grid(_)) => Err(ExpansionError::Bindings(
            BindingsFormatError::NonIdentifierBinding {
                variable: id.clone(),
            },
        )),
    }
}

/// Identifier positions only take qualified names.
fn require_identifier(
    value: Value,
    variable: &QualifiedName,
) -> Result<QualifiedName, ExpansionError> {
    match value {
        Value::Qualified(qn) => Ok(qn),
        _ => Err(ExpansionError::Bindings(
            BindingsFormatError::NonIdentifierBinding {
                variable: variable.clone(),
            },
        )),
    }
}

/// Builds the attribute list of output copy `index` of `copies`.
///
/// A list of the copy count selects its `index`-th entry, a singleton
/// list broadcasts, any other length fans out as repeated attribute
/// names. A grid selects its `index`-th row (a single row broadcasts)
/// and emits one attribute per cell.
fn select_attributes(
    resolved: &[ResolvedAttribute],
    index: usize,
    copies: usize,
) -> Result<Vec<Attribute>, ExpansionError> {
    let mut attributes = Vec::new();
    for entry in resolved {
        match &entry.outcome {
            MatchOutcome::Concrete(value) => {
                attributes.push(Attribute::new(entry.name.clone(), value.clone()));
            }
            MatchOutcome::Unbound(variable) => {
                attributes.push(Attribute::new(
                    entry.name.clone(),
                    Value::Qualified(variable.clone()),
                ));
            }
            MatchOutcome::Bound(BoundValue::Scalar(value)) => {
                attributes.push(Attribute::new(entry.name.clone(), value.clone()));
            }
            MatchOutcome::Bound(BoundValue::List(values)) => {
                if values.len() == copies {
                    attributes.push(Attribute::new(entry.name.clone(), values[index].clone()));
                } else if values.len() == 1 {
                    attributes.push(Attribute::new(entry.name.clone(), values[0].clone()));
                } else {
                    for value in values {
                        attributes.push(Attribute::new(entry.name.clone(), value.clone()));
                    }
                }
            }
            MatchOutcome::Bound(BoundValue::Grid(rows)) => {
                let row = if rows.len() == copies {
                    &rows[index]
                } else if rows.len() == 1 {
                    &rows[0]
                } else {
                    return Err(ExpansionError::IncorrectNumberOfBindingsForGroup {
                        variable: entry
                            .variable
                            .clone()
                            .unwrap_or_else(|| entry.name.clone()),
                        expected: copies,
                        found: rows.len(),
                    });
                };
                for value in row {
                    attributes.push(Attribute::new(entry.name.clone(), value.clone()));
                }
            }
        }
    }
    Ok(attributes)
}

/// One formal argument, resolved, with the dimension it iterates in.
struct ArgSlot {
    values: Vec<Option<QualifiedName>>,
    dimension: usize,
}

fn expand_relation(
    relation: &Relation,
    analysis: &GroupAnalysis,
    store: &mut BindingsStore,
    out: &mut Vec<Record>,
) -> Result<(), ExpansionError> {
    // Assign each argument a dimension: arguments of one linked group
    // share a zip dimension of the group cardinality, everything else
    // gets its own cartesian dimension. Dimensions are created in
    // first-occurrence order over the formal argument list.
    let mut dims: Vec<usize> = Vec::new();
    let mut group_dim: HashMap<usize, usize> = HashMap::new();
    let mut slots: Vec<ArgSlot> = Vec::with_capacity(relation.formal.len());

    for formal in &relation.formal {
        let slot = match &formal.arg {
            None => {
                dims.push(1);
                ArgSlot {
                    values: vec![None],
                    dimension: dims.len() - 1,
                }
            }
            Some(qn) => {
                let values = resolve_argument(qn, store)?;
                let dimension = match analysis.group(qn) {
                    Some(group) => {
                        let size = analysis.group_cardinality(group);
                        if values.len() != size && values.len() != 1 {
                            return Err(ExpansionError::IncorrectNumberOfBindingsForGroup {
                                variable: qn.clone(),
                                expected: size,
                                found: values.len(),
                            });
                        }
                        *group_dim.entry(group).or_insert_with(|| {
                            dims.push(size);
                            dims.len() - 1
                        })
                    }
                    None => {
                        dims.push(values.len());
                        dims.len() - 1
                    }
                };
                ArgSlot { values, dimension }
            }
        };
        slots.push(slot);
    }

    let count: usize = dims.iter().product();
    if count == 0 {
        // A zero-cardinality dimension erases the relation.
        return Ok(());
    }

    let extra = resolve_extra_attributes(&relation.extra, store);
    let identifier = resolve_relation_identifier(&relation.id, count, store)?;

    let mut indices = vec![0usize; dims.len()];
    for copy in 0..count {
        let formal = relation
            .formal
            .iter()
            .zip(&slots)
            .map(|(template_arg, slot)| {
                let arg = if slot.values.len() == 1 {
                    slot.values[0].clone()
                } else {
                    slot.values[indices[slot.dimension]].clone()
                };
                FormalArg {
                    role: template_arg.role.clone(),
                    arg,
                }
            })
            .collect();

        let id = match &identifier {
            RelationId::NonePerCopy => None,
            RelationId::Fixed(qn) => Some(qn.clone()),
            RelationId::PerCopy(ids) => Some(ids[copy].clone()),
        };

        out.push(Record::Relation(Relation {
            kind: relation.kind,
            id,
            formal,
            extra: extra.clone(),
        }));

        // Nested-loop iteration: the last dimension varies fastest, so
        // the first dimension is outermost.
        for d in (0..dims.len()).rev() {
            indices[d] += 1;
            if indices[d] < dims[d] {
                break;
            }
            indices[d] = 0;
        }
    }
    Ok(())
}

fn resolve_argument(
    qn: &QualifiedName,
    store: &mut BindingsStore,
) -> Result<Vec<Option<QualifiedName>>, ExpansionError> {
    match match_value(&Value::Qualified(qn.clone()), store, 1) {
        MatchOutcome::Concrete(value) => Ok(vec![Some(require_identifier(value, qn)?)]),
        // An unbound var: in argument position is tolerated; the edge is
        // emitted with the variable kept verbatim.
        MatchOutcome::Unbound(variable) => Ok(vec![Some(variable)]),
        MatchOutcome::Bound(BoundValue::Scalar(value)) => {
            Ok(vec![Some(require_identifier(value, qn)?)])
        }
        MatchOutcome::Bound(BoundValue::List(values)) => values
            .into_iter()
            .map(|value| require_identifier(value, qn).map(Some))
            .collect(),
        MatchOutcome::Bound(BoundValue::Grid(_)) => Err(ExpansionError::Bindings(
            BindingsFormatError::NonIdentifierBinding {
                variable: qn.clone(),
            },
        )),
    }
}

enum RelationId {
    NonePerCopy,
    Fixed(QualifiedName),
    PerCopy(Vec<QualifiedName>),
}

fn resolve_relation_identifier(
    id: &Option<QualifiedName>,
    count: usize,
    store: &mut BindingsStore,
) -> Result<RelationId, ExpansionError> {
    let Some(qn) = id else {
        return Ok(RelationId::NonePerCopy);
    };
    match match_value(&Value::Qualified(qn.clone()), store, count) {
        MatchOutcome::Concrete(value) => Ok(RelationId::Fixed(require_identifier(value, qn)?)),
        // An unbound var: identifier is dropped rather than kept.
        MatchOutcome::Unbound(_) => Ok(RelationId::NonePerCopy),
        MatchOutcome::Bound(BoundValue::Scalar(value)) => {
            if count != 1 {
                return Err(ExpansionError::IncorrectNumberOfBindingsForStatement {
                    identifier: qn.clone(),
                    expected: count,
                    found: 1,
                });
            }
            Ok(RelationId::PerCopy(vec![require_identifier(value, qn)?]))
        }
        MatchOutcome::Bound(BoundValue::List(values)) => {
            if values.len() != count {
                return Err(ExpansionError::IncorrectNumberOfBindingsForStatement {
                    identifier: qn.clone(),
                    expected: count,
                    found: values.len(),
                });
            }
            values
                .into_iter()
                .map(|value| require_identifier(value, qn))
                .collect::<Result<Vec<_>, _>>()
                .map(RelationId::PerCopy)
        }
        MatchOutcome::Bound(BoundValue::Grid(_)) => Err(ExpansionError::Bindings(
            BindingsFormatError::NonIdentifierBinding {
                variable: qn.clone(),
            },
        )),
    }
}

/// Extra attributes resolve once per relation; list values fan out as
/// repeated attribute names, grid values fan out every cell.
fn resolve_extra_attributes(extra: &[Attribute], store: &mut BindingsStore) -> Vec<Attribute> {
    let mut out = Vec::new();
    for attr in extra {
        match match_value(&attr.value, store, 1) {
            MatchOutcome::Concrete(value) => out.push(Attribute::new(attr.name.clone(), value)),
            MatchOutcome::Unbound(variable) => {
                out.push(Attribute::new(attr.name.clone(), Value::Qualified(variable)))
            }
            MatchOutcome::Bound(BoundValue::Scalar(value)) => {
                out.push(Attribute::new(attr.name.clone(), value))
            }
            MatchOutcome::Bound(BoundValue::List(values)) => {
                for value in values {
                    out.push(Attribute::new(attr.name.clone(), value));
                }
            }
            MatchOutcome::Bound(BoundValue::Grid(rows)) => {
                for row in rows {
                    for value in row {
                        out.push(Attribute::new(attr.name.clone(), value));
                    }
                }
            }
        }
    }
    out
}

fn resolve_bundle_identifier(
    id: &QualifiedName,
    store: &mut BindingsStore,
) -> Result<QualifiedName, ExpansionError> {
    match match_value(&Value::Qualified(id.clone()), store, 1) {
        MatchOutcome::Concrete(value) => require_identifier(value, id),
        MatchOutcome::Unbound(variable) => {
            Err(ExpansionError::UnboundMandatoryVariable { variable })
        }
        MatchOutcome::Bound(BoundValue::Scalar(value)) => require_identifier(value, id),
        MatchOutcome::Bound(BoundValue::List(mut values)) => {
            if values.len() != 1 {
                return Err(ExpansionError::IncorrectNumberOfBindingsForStatement {
                    identifier: id.clone(),
                    expected: 1,
                    found: values.len(),
                });
            }
            require_identifier(values.remove(0), id)
        }
        MatchOutcome::Bound(BoundValue::Grid(_)) => Err(ExpansionError::Bindings(
            BindingsFormatError::NonIdentifierBinding {
                variable: id.clone(),
            },
        )),
    }
}
