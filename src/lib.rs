//! # provtmpl
//!
//! A PROV template expansion engine: takes a W3C PROV *template* document
//! whose identifiers and attribute values may contain variables in the
//! reserved `var:` (mandatory) and `vargen:` (auto-generated) namespaces,
//! plus a *bindings* set mapping those variables to concrete values, and
//! produces a fully instantiated PROV document.
//!
//! Multi-valued bindings are materialised as repeated records: template
//! nodes joined by `tmpl:linked` expand in parallel (zip), while distinct
//! groups expand cartesian across relation arguments. Unbound `vargen:`
//! variables become freshly minted `ex_uuid:` identifiers, shared across
//! every reference to the same variable.
//!
//! # Example
//!
//! ```rust
//! use provtmpl::{expand, Attribute, BindingsStore, BoundValue, Document};
//! use provtmpl::{Namespace, NamespaceRegistry, QualifiedName, Value};
//!
//! let mut registry = NamespaceRegistry::reserved();
//! registry.register(Namespace::new("ex", "http://example.org/#"));
//!
//! let mut template = Document::new(registry);
//! template.entity(
//!     QualifiedName::var("quote"),
//!     vec![Attribute::new(
//!         QualifiedName::prov("value"),
//!         Value::Qualified(QualifiedName::var("value")),
//!     )],
//! );
//!
//! let ex = Namespace::new("ex", "http://example.org/#");
//! let mut bindings = BindingsStore::new();
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
//!
//! # Modules
//!
//! - [`qname`]: namespaces, qualified names, values
//! - [`document`]: records, relations, bundles, documents
//! - [`bindings`]: the variable-to-value store
//! - [`reader`]: the two on-wire bindings formats and the companion writer
//! - [`groups`]: `tmpl:linked` analysis and group cardinalities
//! - [`matcher`]: variable resolution and `vargen:` minting
//! - [`expander`]: the three-phase expansion algorithm
//! - [`error`]: the failure taxonomy

pub mod bindings;
pub mod document;
pub mod error;
pub mod expander;
pub mod groups;
pub mod matcher;
pub mod qname;
pub mod reader;

pub use bindings::{BindingsStore, BoundValue};
pub use document::{
    Attribute, Bundle, Document, Element, ElementKind, FormalArg, Record, Relation, RelationKind,
};
pub use error::{BindingsFormatError, ExpansionError, QNameError};
pub use expander::expand;
pub use groups::{analyze_groups, GroupAnalysis};
pub use matcher::{match_value, MatchOutcome};
pub use qname::{Namespace, NamespaceRegistry, QualifiedName, Value};
pub use reader::{read_bindings_json_v3, read_bindings_provdoc, write_bindings_provdoc};
