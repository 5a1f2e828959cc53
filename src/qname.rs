//! The PROV value model: namespaces, qualified names, and values.
//!
//! A qualified name is a `(namespace, local-part)` pair whose canonical
//! string form is `prefix:local`. Qualified names in the reserved `var:`
//! and `vargen:` namespaces are template *variables*; everything else is a
//! concrete identifier.
//!
//! Equality and hashing compare the prefix and local part only. Two
//! qualified names with the same prefix and local part are the same name
//! even if their registries disagree on the IRI; the registry merge rule
//! (later duplicate prefix overwrites) makes the IRI a per-document
//! concern, not a per-name one.
//!
//! # Example
//!
//! ```rust
//! use provtmpl::qname::{NamespaceRegistry, QualifiedName, Value};
//!
//! let registry = NamespaceRegistry::reserved();
//! let qn = registry.parse_qualified_name("var:quote").unwrap();
//! assert!(qn.is_var());
//! assert_eq!(qn.to_string(), "var:quote");
//!
//! let value = Value::Qualified(QualifiedName::prov("Person"));
//! assert!(value.variable().is_none());
//! ```

use crate::error::QNameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Prefix of the mandatory-variable namespace.
pub const VAR_PREFIX: &str = "var";
/// Prefix of the auto-generated-identifier namespace.
pub const VARGEN_PREFIX: &str = "vargen";
/// Prefix of the template-directive namespace.
pub const TMPL_PREFIX: &str = "tmpl";
/// Prefix of the W3C PROV namespace.
pub const PROV_PREFIX: &str = "prov";
/// Prefix of the namespace minted identifiers live in.
pub const EX_UUID_PREFIX: &str = "ex_uuid";

/// IRI of the mandatory-variable namespace.
pub const VAR_URI: &str = "http://openprovenance.org/var#";
/// IRI of the auto-generated-identifier namespace.
pub const VARGEN_URI: &str = "http://openprovenance.org/vargen#";
/// IRI of the template-directive namespace.
pub const TMPL_URI: &str = "http://openprovenance.org/tmpl#";
/// IRI of the W3C PROV namespace.
pub const PROV_URI: &str = "http://www.w3.org/ns/prov#";
/// IRI of the namespace minted identifiers live in.
pub const EX_UUID_URI: &str = "http://example.com/uuid#";

/// A namespace: a prefix bound to an IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// The short prefix used in qualified names
    pub prefix: String,
    /// The IRI the prefix abbreviates
    pub uri: String,
}

impl Namespace {
    /// Creates a namespace from a prefix and an IRI.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// The reserved `var:` namespace.
    pub fn var() -> Self {
        Self::new(VAR_PREFIX, VAR_URI)
    }

    /// The reserved `vargen:` namespace.
    pub fn vargen() -> Self {
        Self::new(VARGEN_PREFIX, VARGEN_URI)
    }

    /// The reserved `tmpl:` namespace.
    pub fn tmpl() -> Self {
        Self::new(TMPL_PREFIX, TMPL_URI)
    }

    /// The reserved `prov:` namespace.
    pub fn prov() -> Self {
        Self::new(PROV_PREFIX, PROV_URI)
    }

    /// The reserved namespace for minted identifiers.
    pub fn ex_uuid() -> Self {
        Self::new(EX_UUID_PREFIX, EX_UUID_URI)
    }
}

/// A qualified name: a namespace plus a local part.
///
/// The canonical string form is `prefix:local`. Names whose prefix is
/// `var` or `vargen` are template variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifiedName {
    /// The namespace the name lives in
    pub namespace: Namespace,
    /// The local part after the prefix
    pub localpart: String,
}

impl QualifiedName {
    /// Creates a qualified name in the given namespace.
    pub fn new(namespace: Namespace, localpart: impl Into<String>) -> Self {
        Self {
            namespace,
            localpart: localpart.into(),
        }
    }

    /// Creates a `var:` variable name.
    pub fn var(localpart: impl Into<String>) -> Self {
        Self::new(Namespace::var(), localpart)
    }

    /// Creates a `vargen:` variable name.
    pub fn vargen(localpart: impl Into<String>) -> Self {
        Self::new(Namespace::vargen(), localpart)
    }

    /// Creates a `tmpl:` directive name.
    pub fn tmpl(localpart: impl Into<String>) -> Self {
        Self::new(Namespace::tmpl(), localpart)
    }

    /// Creates a `prov:` name.
    pub fn prov(localpart: impl Into<String>) -> Self {
        Self::new(Namespace::prov(), localpart)
    }

    /// Returns the namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.namespace.prefix
    }

    /// Returns true for names in the `var:` namespace.
    pub fn is_var(&self) -> bool {
        self.prefix() == VAR_PREFIX
    }

    /// Returns true for names in the `vargen:` namespace.
    pub fn is_vargen(&self) -> bool {
        self.prefix() == VARGEN_PREFIX
    }

    /// Returns true for template variables (`var:` or `vargen:`).
    pub fn is_variable(&self) -> bool {
        self.is_var() || self.is_vargen()
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.prefix == other.namespace.prefix && self.localpart == other.localpart
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.prefix.hash(state);
        self.localpart.hash(state);
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.namespace.prefix, &self.localpart).cmp(&(&other.namespace.prefix, &other.localpart))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.prefix, self.localpart)
    }
}

/// A value carried by bindings and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A qualified name (identifier or variable)
    Qualified(QualifiedName),
    /// A typed or untyped literal
    Literal {
        /// The lexical form
        text: String,
        /// Optional datatype name (e.g. `xsd:dateTime`)
        datatype: Option<QualifiedName>,
    },
    /// An untyped plain string
    Plain(String),
}

impl Value {
    /// Creates an untyped literal.
    pub fn literal(text: impl Into<String>) -> Self {
        Value::Literal {
            text: text.into(),
            datatype: None,
        }
    }

    /// Creates a typed literal.
    pub fn typed_literal(text: impl Into<String>, datatype: QualifiedName) -> Self {
        Value::Literal {
            text: text.into(),
            datatype: Some(datatype),
        }
    }

    /// Returns the qualified name if this value is one.
    pub fn qualified_name(&self) -> Option<&QualifiedName> {
        match self {
            Value::Qualified(qn) => Some(qn),
            _ => None,
        }
    }

    /// Returns the qualified name if this value is a template variable.
    pub fn variable(&self) -> Option<&QualifiedName> {
        self.qualified_name().filter(|qn| qn.is_variable())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Qualified(qn) => write!(f, "{}", qn),
            Value::Literal {
                text,
                datatype: Some(dt),
            } => write!(f, "\"{}\" %% {}", text, dt),
            Value::Literal {
                text,
                datatype: None,
            } => write!(f, "\"{}\"", text),
            Value::Plain(text) => write!(f, "\"{}\"", text),
        }
    }
}

impl From<QualifiedName> for Value {
    fn from(qn: QualifiedName) -> Self {
        Value::Qualified(qn)
    }
}

/// A prefix-to-IRI registry attached at document level.
///
/// Registration order of first appearance is preserved; re-registering a
/// prefix overwrites its IRI in place (the merge rule for bindings-side
/// namespaces).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRegistry {
    entries: Vec<Namespace>,
}

impl NamespaceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-loaded with the reserved namespaces
    /// (`prov`, `tmpl`, `var`, `vargen`, `ex_uuid`).
    pub fn reserved() -> Self {
        let mut registry = Self::new();
        registry.register(Namespace::prov());
        registry.register(Namespace::tmpl());
        registry.register(Namespace::var());
        registry.register(Namespace::vargen());
        registry.register(Namespace::ex_uuid());
        registry
    }

    /// Registers a namespace, overwriting any existing IRI for the prefix.
    pub fn register(&mut self, namespace: Namespace) {
        match self
            .entries
            .iter_mut()
            .find(|ns| ns.prefix == namespace.prefix)
        {
            Some(existing) => existing.uri = namespace.uri,
            None => self.entries.push(namespace),
        }
    }

    /// Looks up a namespace by prefix.
    pub fn lookup(&self, prefix: &str) -> Option<&Namespace> {
        self.entries.iter().find(|ns| ns.prefix == prefix)
    }

    /// Merges another registry into this one; the other registry's
    /// entries win on duplicate prefixes.
    pub fn merge(&mut self, other: &NamespaceRegistry) {
        for ns in &other.entries {
            self.register(ns.clone());
        }
    }

    /// Iterates over the registered namespaces in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.entries.iter()
    }

    /// Parses a `prefix:local` string against the registry.
    ///
    /// Fails on a missing separator, more than one separator, or an
    /// unregistered prefix.
    pub fn parse_qualified_name(&self, input: &str) -> Result<QualifiedName, QNameError> {
        let mut parts = input.split(':');
        let prefix = parts.next().unwrap_or_default();
        let localpart = parts.next().ok_or_else(|| QNameError::MissingSeparator {
            input: input.to_string(),
        })?;
        if parts.next().is_some() {
            return Err(QNameError::TooManyColons {
                input: input.to_string(),
            });
        }
        let namespace = self
            .lookup(prefix)
            .cloned()
            .ok_or_else(|| QNameError::UnknownPrefix {
                prefix: prefix.to_string(),
                input: input.to_string(),
            })?;
        Ok(QualifiedName::new(namespace, localpart))
    }
}
