//! Error types for the PROV template expansion engine.
//!
//! This module defines all error types used throughout the crate.
//! Expansion is single-shot with first-failure semantics: the first error
//! encountered aborts the whole expansion and no partial output is produced.
//!
//! # Error Categories
//!
//! - [`QNameError`]: Errors while parsing a `prefix:local` string
//! - [`BindingsFormatError`]: Malformed bindings input (either wire format)
//! - [`ExpansionError`]: Errors raised while expanding a template
//!
//! # Example
//!
//! ```rust
//! use provtmpl::error::ExpansionError;
//! use provtmpl::qname::QualifiedName;
//!
//! let error = ExpansionError::UnboundMandatoryVariable {
//!     variable: QualifiedName::var("missing"),
//! };
//!
//! assert!(error.to_string().contains("var:missing"));
//! ```

use crate::qname::QualifiedName;
use thiserror::Error;

/// Errors that can occur while parsing a `prefix:local` string into a
/// [`QualifiedName`](crate::qname::QualifiedName).
///
/// Produced by [`NamespaceRegistry::parse_qualified_name`](crate::qname::NamespaceRegistry::parse_qualified_name).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QNameError {
    /// The string contains no `:` separator.
    #[error("missing ':' separator in qualified name '{input}'")]
    MissingSeparator {
        /// The offending input string
        input: String,
    },

    /// The string contains more than one `:` separator.
    #[error("more than one ':' in qualified name '{input}'")]
    TooManyColons {
        /// The offending input string
        input: String,
    },

    /// The prefix is not registered in the namespace registry.
    #[error("unknown namespace prefix '{prefix}' in '{input}'")]
    UnknownPrefix {
        /// The unresolved prefix
        prefix: String,
        /// The offending input string
        input: String,
    },
}

/// Errors that can occur while reading a bindings input.
///
/// Both wire formats (the PROV-bindings document and JSON v3) report
/// malformed input through this taxonomy. A bindings-format failure is
/// always fatal for the file as a whole; the one tolerated case, a
/// malformed `@id` entry in JSON v3, is logged and kept as a plain value
/// instead of surfacing here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingsFormatError {
    /// A bindings record's identifier is not in `var:` or `vargen:`.
    #[error("binding record '{identifier}' is outside the var:/vargen: namespaces")]
    IdentifierOutsideVariableNamespace {
        /// Display form of the offending record identifier
        identifier: String,
    },

    /// A bindings record carries a property that is not `tmpl:value_i`
    /// or `tmpl:2dvalue_i_j`.
    #[error("unknown binding property '{property}' on '{variable}'")]
    UnknownProperty {
        /// The variable whose record carries the property
        variable: QualifiedName,
        /// Display form of the offending property name
        property: String,
    },

    /// Binding value indices do not form a contiguous range starting at 0.
    ///
    /// Also raised when the same index appears twice on one record.
    #[error("binding indices for '{variable}' are not contiguous from 0")]
    NonContiguousIndices {
        /// The variable whose indices are broken
        variable: QualifiedName,
    },

    /// One record mixes `tmpl:value_i` and `tmpl:2dvalue_i_j` properties.
    #[error("binding record '{variable}' mixes tmpl:value and tmpl:2dvalue properties")]
    MixedBindingShapes {
        /// The variable whose record mixes shapes
        variable: QualifiedName,
    },

    /// A binding was used in identifier position but does not resolve to
    /// qualified names (a literal, a plain string, or a grid).
    #[error("binding for '{variable}' cannot be used in identifier position")]
    NonIdentifierBinding {
        /// The variable whose binding is unusable as an identifier
        variable: QualifiedName,
    },

    /// The JSON v3 input does not have the expected shape.
    #[error("malformed JSON v3 bindings: {reason}")]
    MalformedJson {
        /// What was wrong with the input
        reason: String,
    },
}

/// Errors raised while expanding a template.
///
/// Each variant is a distinct failure kind; none are recovered internally.
/// The engine returns the first error encountered together with the
/// offending identifier or record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    /// A `var:` variable appears in element or bundle identifier position
    /// with no binding.
    #[error("unbound mandatory variable '{variable}'")]
    UnboundMandatoryVariable {
        /// The unbound variable
        variable: QualifiedName,
    },

    /// Members of one linked group disagree on expansion cardinality.
    ///
    /// Every bound member of a group must have cardinality 0, 1, or the
    /// group cardinality; an empty binding next to a non-empty sibling is
    /// the same failure.
    #[error("incorrect number of bindings for '{variable}' in linked group: expected {expected}, found {found}")]
    IncorrectNumberOfBindingsForGroup {
        /// The group member whose cardinality disagrees
        variable: QualifiedName,
        /// The group cardinality
        expected: usize,
        /// The member's cardinality
        found: usize,
    },

    /// An explicit relation or bundle identifier binding has the wrong
    /// number of values for the statement's expansion count.
    #[error("incorrect number of identifier bindings for statement '{identifier}': expected {expected}, found {found}")]
    IncorrectNumberOfBindingsForStatement {
        /// The statement's identifier variable
        identifier: QualifiedName,
        /// The statement's expansion count
        expected: usize,
        /// The number of identifier values bound
        found: usize,
    },

    /// A relation name does not denote a supported relation kind.
    #[error("unknown relation kind '{name}'")]
    UnknownRelation {
        /// The unrecognised relation name
        name: String,
    },

    /// A relation was built with the wrong number of formal arguments.
    #[error("relation '{kind}' takes {expected} formal arguments, got {found}")]
    ArityMismatch {
        /// Record name of the relation kind
        kind: &'static str,
        /// The kind's formal arity
        expected: usize,
        /// The number of arguments supplied
        found: usize,
    },

    /// The `tmpl:linked` graph contains a cycle or a node with two parents.
    #[error("invalid tmpl:linked graph at '{node}': {reason}")]
    LinkedGraphInvalid {
        /// The node at which the violation was detected
        node: QualifiedName,
        /// What was wrong with the graph
        reason: String,
    },

    /// A bindings-format failure surfaced during expansion.
    #[error("bindings format: {0}")]
    Bindings(#[from] BindingsFormatError),
}
