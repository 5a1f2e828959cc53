//! Readers and writer for the two on-wire bindings formats.
//!
//! **Format A** is a PROV-bindings document: a document whose records are
//! elements identified in `var:` / `vargen:`, carrying their values as
//! `tmpl:value_i` (one value per expansion index) or `tmpl:2dvalue_i_j`
//! (grid row `i`, column `j`) attributes. A bare `tmpl:value` from the
//! legacy writer is accepted as a scalar binding. Indices must form
//! contiguous ranges starting at 0; a single-column grid collapses to a
//! list.
//!
//! **Format B** is the JSON v3 shape:
//!
//! ```text
//! { "context": { "prefix": "iri", ... },
//!   "var":    { "name": [ entry, ... ], ... },
//!   "vargen": { "name": [ entry, ... ], ... } }
//! entry ::= { "@id": "prefix:local" }
//!         | { "@value": <string>, "@type"?: <datatype> }
//! ```
//!
//! Namespaces declared in either format merge into the template's
//! registry before expansion; a later duplicate prefix silently
//! overwrites.
//!
//! [`write_bindings_provdoc`] is the companion writer: a store written by
//! it reads back unchanged through [`read_bindings_provdoc`] (except that
//! a single-column grid normalises to a list, which the reader collapses
//! by definition).

use crate::bindings::{BindingsStore, BoundValue};
use crate::document::{Attribute, Document, Element, Record};
use crate::error::BindingsFormatError;
use crate::qname::{Namespace, NamespaceRegistry, QualifiedName, Value, TMPL_PREFIX};
use std::collections::BTreeMap;

/// Reads a Format A bindings document into a store.
///
/// Every record must be an element identified in `var:` or `vargen:`;
/// every attribute must be a `tmpl:value` property. The whole file is
/// rejected on the first malformed record.
pub fn read_bindings_provdoc(doc: &Document) -> Result<BindingsStore, BindingsFormatError> {
    let mut store = BindingsStore::new();
    for rec in &doc.records {
        let el = match rec {
            Record::Element(el) => el,
            Record::Relation(rel) => {
                let identifier = rel
                    .id
                    .as_ref()
                    .map(|qn| qn.to_string())
                    .unwrap_or_else(|| rel.kind.record_name().to_string());
                return Err(BindingsFormatError::IdentifierOutsideVariableNamespace {
                    identifier,
                });
            }
        };
        if !el.id.is_variable() {
            return Err(BindingsFormatError::IdentifierOutsideVariableNamespace {
                identifier: el.id.to_string(),
            });
        }
        let bound = read_binding_record(el)?;
        store.put(el.id.clone(), bound);
    }
    Ok(store)
}

/// The value properties of one bindings record, separated by shape.
#[derive(Default)]
struct RecordShapes {
    bare: Option<Value>,
    onedim: BTreeMap<usize, Value>,
    twodim: BTreeMap<usize, BTreeMap<usize, Value>>,
}

fn read_binding_record(el: &Element) -> Result<BoundValue, BindingsFormatError> {
    let mut shapes = RecordShapes::default();

    for attr in &el.attributes {
        if attr.name.prefix() != TMPL_PREFIX {
            return Err(BindingsFormatError::UnknownProperty {
                variable: el.id.clone(),
                property: attr.name.to_string(),
            });
        }
        let local = attr.name.localpart.as_str();
        if local == "value" {
            if shapes.bare.replace(attr.value.clone()).is_some() {
                return Err(BindingsFormatError::NonContiguousIndices {
                    variable: el.id.clone(),
                });
            }
        } else if let Some(suffix) = local.strip_prefix("value_") {
            let index = parse_index(suffix).ok_or_else(|| BindingsFormatError::UnknownProperty {
                variable: el.id.clone(),
                property: attr.name.to_string(),
            })?;
            if shapes.onedim.insert(index, attr.value.clone()).is_some() {
                return Err(BindingsFormatError::NonContiguousIndices {
                    variable: el.id.clone(),
                });
            }
        } else if let Some(suffix) = local.strip_prefix("2dvalue_") {
            let (row, col) =
                parse_index_pair(suffix).ok_or_else(|| BindingsFormatError::UnknownProperty {
                    variable: el.id.clone(),
                    property: attr.name.to_string(),
                })?;
            let cells = shapes.twodim.entry(row).or_default();
            if cells.insert(col, attr.value.clone()).is_some() {
                return Err(BindingsFormatError::NonContiguousIndices {
                    variable: el.id.clone(),
                });
            }
        } else {
            return Err(BindingsFormatError::UnknownProperty {
                variable: el.id.clone(),
                property: attr.name.to_string(),
            });
        }
    }

    let shape_count = usize::from(shapes.bare.is_some())
        + usize::from(!shapes.onedim.is_empty())
        + usize::from(!shapes.twodim.is_empty());
    if shape_count > 1 {
        return Err(BindingsFormatError::MixedBindingShapes {
            variable: el.id.clone(),
        });
    }

    if let Some(value) = shapes.bare {
        return Ok(BoundValue::Scalar(value));
    }

    if !shapes.twodim.is_empty() {
        check_contiguous(shapes.twodim.keys().copied(), &el.id)?;
        let mut rows = Vec::with_capacity(shapes.twodim.len());
        for cells in shapes.twodim.into_values() {
            check_contiguous(cells.keys().copied(), &el.id)?;
            rows.push(cells.into_values().collect::<Vec<Value>>());
        }
        // Single-column grids collapse to a list.
        if rows.iter().all(|row| row.len() == 1) {
            return Ok(BoundValue::List(
                rows.into_iter().map(|mut row| row.remove(0)).collect(),
            ));
        }
        return Ok(BoundValue::Grid(rows));
    }

    check_contiguous(shapes.onedim.keys().copied(), &el.id)?;
    Ok(BoundValue::List(shapes.onedim.into_values().collect()))
}

/// Accepts a plain decimal index with no sign and no leading junk.
fn parse_index(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_index_pair(text: &str) -> Option<(usize, usize)> {
    let (row, col) = text.split_once('_')?;
    Some((parse_index(row)?, parse_index(col)?))
}

fn check_contiguous(
    indices: impl Iterator<Item = usize>,
    variable: &QualifiedName,
) -> Result<(), BindingsFormatError> {
    for (expected, found) in indices.enumerate() {
        if expected != found {
            return Err(BindingsFormatError::NonContiguousIndices {
                variable: variable.clone(),
            });
        }
    }
    Ok(())
}

/// Writes a store as a Format A bindings document.
///
/// Scalars become a bare `tmpl:value`, lists become `tmpl:value_i`, grids
/// become `tmpl:2dvalue_i_j`. Bindings are written in sorted variable
/// order for deterministic output.
pub fn write_bindings_provdoc(store: &BindingsStore) -> Document {
    let mut doc = Document::new(NamespaceRegistry::reserved());
    for (variable, bound) in store.iter_sorted() {
        let attributes = match bound {
            BoundValue::Scalar(value) => {
                vec![Attribute::new(QualifiedName::tmpl("value"), value.clone())]
            }
            BoundValue::List(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    Attribute::new(QualifiedName::tmpl(format!("value_{}", i)), value.clone())
                })
                .collect(),
            BoundValue::Grid(rows) => rows
                .iter()
                .enumerate()
                .flat_map(|(i, row)| {
                    row.iter().enumerate().map(move |(j, value)| {
                        Attribute::new(
                            QualifiedName::tmpl(format!("2dvalue_{}_{}", i, j)),
                            value.clone(),
                        )
                    })
                })
                .collect(),
        };
        doc.entity(variable.clone(), attributes);
    }
    doc
}

/// Reads Format B (JSON v3) bindings.
///
/// Returns the store together with the registry obtained by merging the
/// input's `context` over the template's registry; `@id` entries resolve
/// against the merged registry. A malformed `@id` (more than one colon,
/// unknown prefix) is logged and kept as a plain value rather than
/// failing the file.
pub fn read_bindings_json_v3(
    json: &serde_json::Value,
    template_ns: &NamespaceRegistry,
) -> Result<(BindingsStore, NamespaceRegistry), BindingsFormatError> {
    let root = json
        .as_object()
        .ok_or_else(|| malformed("top level is not an object"))?;

    let mut merged = template_ns.clone();
    if let Some(context) = root.get("context") {
        let context = context
            .as_object()
            .ok_or_else(|| malformed("'context' is not an object"))?;
        for (prefix, iri) in context {
            let iri = iri
                .as_str()
                .ok_or_else(|| malformed(&format!("IRI for prefix '{}' is not a string", prefix)))?;
            merged.register(Namespace::new(prefix.clone(), iri));
        }
    }

    let mut store = BindingsStore::new();
    for (section, namespace) in [("var", Namespace::var()), ("vargen", Namespace::vargen())] {
        let Some(block) = root.get(section) else {
            continue;
        };
        let block = block
            .as_object()
            .ok_or_else(|| malformed(&format!("'{}' is not an object", section)))?;
        for (name, entries) in block {
            let entries = entries.as_array().ok_or_else(|| {
                malformed(&format!("entries for '{}:{}' are not an array", section, name))
            })?;
            let values = entries
                .iter()
                .map(|entry| parse_entry(section, name, entry, &merged))
                .collect::<Result<Vec<Value>, BindingsFormatError>>()?;
            store.put(
                QualifiedName::new(namespace.clone(), name.clone()),
                BoundValue::List(values),
            );
        }
    }

    Ok((store, merged))
}

fn parse_entry(
    section: &str,
    name: &str,
    entry: &serde_json::Value,
    registry: &NamespaceRegistry,
) -> Result<Value, BindingsFormatError> {
    match entry {
        serde_json::Value::Object(map) => {
            if let Some(id) = map.get("@id") {
                let id = id.as_str().ok_or_else(|| {
                    malformed(&format!("@id for '{}:{}' is not a string", section, name))
                })?;
                match registry.parse_qualified_name(id) {
                    Ok(qn) => Ok(Value::Qualified(qn)),
                    Err(err) => {
                        log::warn!(
                            "invalid @id '{}' in binding '{}:{}': {}; keeping raw value",
                            id,
                            section,
                            name,
                            err
                        );
                        Ok(Value::Plain(id.to_string()))
                    }
                }
            } else if let Some(value) = map.get("@value") {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let datatype = match map.get("@type") {
                    Some(dt) => {
                        let dt = dt.as_str().ok_or_else(|| {
                            malformed(&format!("@type for '{}:{}' is not a string", section, name))
                        })?;
                        match registry.parse_qualified_name(dt) {
                            Ok(qn) => Some(qn),
                            Err(err) => {
                                log::warn!(
                                    "unresolvable @type '{}' in binding '{}:{}': {}; dropping datatype",
                                    dt,
                                    section,
                                    name,
                                    err
                                );
                                None
                            }
                        }
                    }
                    None => None,
                };
                Ok(Value::Literal { text, datatype })
            } else {
                log::warn!(
                    "entry for '{}:{}' has neither @id nor @value; keeping raw object",
                    section,
                    name
                );
                Ok(Value::Plain(entry.to_string()))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Plain(s.clone())),
        serde_json::Value::Number(n) => Ok(Value::Plain(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Value::Plain(b.to_string())),
        other => Err(malformed(&format!(
            "unsupported entry {} for '{}:{}'",
            other, section, name
        ))),
    }
}

fn malformed(reason: &str) -> BindingsFormatError {
    BindingsFormatError::MalformedJson {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding_doc(attributes: Vec<Attribute>) -> Document {
        let mut doc = Document::new(NamespaceRegistry::reserved());
        doc.entity(QualifiedName::var("x"), attributes);
        doc
    }

    #[test]
    fn test_read_bare_value_as_scalar() {
        let doc = binding_doc(vec![Attribute::new(
            QualifiedName::tmpl("value"),
            Value::literal("hello"),
        )]);
        let store = read_bindings_provdoc(&doc).unwrap();
        assert_eq!(
            store.get(&QualifiedName::var("x")),
            Some(&BoundValue::Scalar(Value::literal("hello")))
        );
    }

    #[test]
    fn test_read_indexed_values_as_list() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("value_1"), Value::literal("b")),
            Attribute::new(QualifiedName::tmpl("value_0"), Value::literal("a")),
        ]);
        let store = read_bindings_provdoc(&doc).unwrap();
        assert_eq!(
            store.get(&QualifiedName::var("x")),
            Some(&BoundValue::List(vec![
                Value::literal("a"),
                Value::literal("b")
            ]))
        );
    }

    #[test]
    fn test_read_grid() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("2dvalue_0_0"), Value::literal("a1")),
            Attribute::new(QualifiedName::tmpl("2dvalue_0_1"), Value::literal("a2")),
            Attribute::new(QualifiedName::tmpl("2dvalue_1_0"), Value::literal("b1")),
            Attribute::new(QualifiedName::tmpl("2dvalue_1_1"), Value::literal("b2")),
        ]);
        let store = read_bindings_provdoc(&doc).unwrap();
        assert_eq!(
            store.get(&QualifiedName::var("x")),
            Some(&BoundValue::Grid(vec![
                vec![Value::literal("a1"), Value::literal("a2")],
                vec![Value::literal("b1"), Value::literal("b2")],
            ]))
        );
    }

    #[test]
    fn test_single_column_grid_collapses_to_list() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("2dvalue_0_0"), Value::literal("a")),
            Attribute::new(QualifiedName::tmpl("2dvalue_1_0"), Value::literal("b")),
        ]);
        let store = read_bindings_provdoc(&doc).unwrap();
        assert_eq!(
            store.get(&QualifiedName::var("x")),
            Some(&BoundValue::List(vec![
                Value::literal("a"),
                Value::literal("b")
            ]))
        );
    }

    #[test]
    fn test_non_contiguous_indices_rejected() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("value_0"), Value::literal("a")),
            Attribute::new(QualifiedName::tmpl("value_2"), Value::literal("c")),
        ]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::NonContiguousIndices { .. })
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("value_0"), Value::literal("a")),
            Attribute::new(QualifiedName::tmpl("value_0"), Value::literal("b")),
        ]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::NonContiguousIndices { .. })
        ));
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let doc = binding_doc(vec![
            Attribute::new(QualifiedName::tmpl("value_0"), Value::literal("a")),
            Attribute::new(QualifiedName::tmpl("2dvalue_0_0"), Value::literal("b")),
        ]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::MixedBindingShapes { .. })
        ));
    }

    #[test]
    fn test_unknown_property_rejected() {
        let doc = binding_doc(vec![Attribute::new(
            QualifiedName::tmpl("values_0"),
            Value::literal("a"),
        )]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::UnknownProperty { .. })
        ));

        let doc = binding_doc(vec![Attribute::new(
            QualifiedName::prov("value"),
            Value::literal("a"),
        )]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_non_variable_identifier_rejected() {
        let mut doc = Document::new(NamespaceRegistry::reserved());
        doc.entity(QualifiedName::prov("thing"), vec![]);
        assert!(matches!(
            read_bindings_provdoc(&doc),
            Err(BindingsFormatError::IdentifierOutsideVariableNamespace { .. })
        ));
    }

    #[test]
    fn test_writer_round_trip() {
        let mut store = BindingsStore::new();
        store.put(
            QualifiedName::var("scalar"),
            BoundValue::Scalar(Value::literal("s")),
        );
        store.put(
            QualifiedName::var("list"),
            BoundValue::List(vec![Value::literal("a"), Value::literal("b")]),
        );
        store.put(
            QualifiedName::vargen("grid"),
            BoundValue::Grid(vec![
                vec![Value::literal("a1"), Value::literal("a2")],
                vec![Value::literal("b1"), Value::literal("b2")],
            ]),
        );

        let doc = write_bindings_provdoc(&store);
        let back = read_bindings_provdoc(&doc).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_json_v3_entries() {
        let input = json!({
            "context": { "ex": "http://example.org/#" },
            "var": {
                "quote": [ { "@id": "ex:q1" }, { "@id": "ex:q2" } ],
                "value": [ { "@value": "hello", "@type": "prov:InternationalizedString" } ],
                "note": [ "plain text" ]
            },
            "vargen": {
                "stamp": [ { "@value": "2018-07-26" } ]
            }
        });

        let (store, merged) =
            read_bindings_json_v3(&input, &NamespaceRegistry::reserved()).unwrap();

        assert_eq!(merged.lookup("ex").unwrap().uri, "http://example.org/#");
        assert_eq!(store.cardinality(&QualifiedName::var("quote")), 2);

        let quote = store.get(&QualifiedName::var("quote")).unwrap();
        match quote {
            BoundValue::List(values) => {
                assert_eq!(
                    values[0].qualified_name().unwrap().to_string(),
                    "ex:q1".to_string()
                );
            }
            other => panic!("expected list, got {:?}", other),
        }

        assert_eq!(
            store.get(&QualifiedName::var("value")),
            Some(&BoundValue::List(vec![Value::typed_literal(
                "hello",
                QualifiedName::prov("InternationalizedString")
            )]))
        );
        assert_eq!(
            store.get(&QualifiedName::var("note")),
            Some(&BoundValue::List(vec![Value::Plain(
                "plain text".to_string()
            )]))
        );
        assert_eq!(
            store.get(&QualifiedName::vargen("stamp")),
            Some(&BoundValue::List(vec![Value::literal("2018-07-26")]))
        );
    }

    #[test]
    fn test_json_v3_invalid_id_kept_as_plain() {
        let input = json!({
            "var": { "x": [ { "@id": "unknown:a" }, { "@id": "a:b:c" } ] }
        });
        let (store, _) = read_bindings_json_v3(&input, &NamespaceRegistry::reserved()).unwrap();
        assert_eq!(
            store.get(&QualifiedName::var("x")),
            Some(&BoundValue::List(vec![
                Value::Plain("unknown:a".to_string()),
                Value::Plain("a:b:c".to_string()),
            ]))
        );
    }

    #[test]
    fn test_json_v3_shape_errors() {
        assert!(matches!(
            read_bindings_json_v3(&json!([]), &NamespaceRegistry::reserved()),
            Err(BindingsFormatError::MalformedJson { .. })
        ));
        assert!(matches!(
            read_bindings_json_v3(&json!({ "var": [] }), &NamespaceRegistry::reserved()),
            Err(BindingsFormatError::MalformedJson { .. })
        ));
        assert!(matches!(
            read_bindings_json_v3(
                &json!({ "var": { "x": { "@id": "ex:a" } } }),
                &NamespaceRegistry::reserved()
            ),
            Err(BindingsFormatError::MalformedJson { .. })
        ));
        assert!(matches!(
            read_bindings_json_v3(
                &json!({ "var": { "x": [null] } }),
                &NamespaceRegistry::reserved()
            ),
            Err(BindingsFormatError::MalformedJson { .. })
        ));
    }
}
