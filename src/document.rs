//! The PROV document model: records, relations, bundles, and documents.
//!
//! A document is an ordered list of records plus zero or more bundles.
//! Records are either *elements* (entities, activities, agents) or
//! *relations* (one of the fourteen PROV relation kinds). Relations carry
//! a positional list of formal arguments (roles such as `prov:entity`,
//! `prov:agent`, `prov:time`) plus any number of free extra attributes.
//!
//! The same model represents both templates (records containing `var:` /
//! `vargen:` variables) and expanded output documents.
//!
//! # Example
//!
//! ```rust
//! use provtmpl::document::{Document, Relation, RelationKind};
//! use provtmpl::qname::{NamespaceRegistry, QualifiedName};
//!
//! let mut doc = Document::new(NamespaceRegistry::reserved());
//! doc.entity(QualifiedName::var("quote"), vec![]);
//! doc.entity(QualifiedName::var("author"), vec![]);
//!
//! let rel = Relation::new(
//!     RelationKind::Attribution,
//!     None,
//!     vec![Some(QualifiedName::var("quote")), Some(QualifiedName::var("author"))],
//!     vec![],
//! )
//! .unwrap();
//! doc.relation(rel);
//!
//! assert_eq!(doc.records.len(), 3);
//! ```

use crate::error::ExpansionError;
use crate::qname::{NamespaceRegistry, QualifiedName, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named attribute on a record.
///
/// Records carry an ordered list of attributes; repeated names are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name
    pub name: QualifiedName,
    /// The attribute value
    pub value: Value,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: QualifiedName, value: impl Into<Value>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// The kind of an element record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// A `prov:Entity`
    Entity,
    /// A `prov:Activity`
    Activity,
    /// A `prov:Agent`
    Agent,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Entity => "entity",
            ElementKind::Activity => "activity",
            ElementKind::Agent => "agent",
        };
        write!(f, "{}", name)
    }
}

/// An element record: entity, activity, or agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// The element kind
    pub kind: ElementKind,
    /// The element identifier (possibly a variable in templates)
    pub id: QualifiedName,
    /// The ordered attribute list
    pub attributes: Vec<Attribute>,
}

/// The fourteen PROV relation kinds, each with a fixed positional
/// argument schema.
///
/// | Kind | Record name | Roles (in order) |
/// |---|---|---|
/// | Generation | `wasGeneratedBy` | entity, activity, time |
/// | Usage | `used` | activity, entity, time |
/// | Communication | `wasInformedBy` | informed, informant |
/// | Start | `wasStartedBy` | activity, trigger, starter, time |
/// | End | `wasEndedBy` | activity, trigger, ender, time |
/// | Invalidation | `wasInvalidatedBy` | entity, activity, time |
/// | Derivation | `wasDerivedFrom` | generatedEntity, usedEntity, activity, generation, usage |
/// | Attribution | `wasAttributedTo` | entity, agent |
/// | Association | `wasAssociatedWith` | activity, agent, plan |
/// | Delegation | `actedOnBehalfOf` | delegate, responsible, activity |
/// | Influence | `wasInfluencedBy` | influencee, influencer |
/// | Alternate | `alternateOf` | alternate1, alternate2 |
/// | Specialization | `specializationOf` | specificEntity, generalEntity |
/// | Membership | `hadMember` | collection, entity |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Generation,
    Usage,
    Communication,
    Start,
    End,
    Invalidation,
    Derivation,
    Attribution,
    Association,
    Delegation,
    Influence,
    Alternate,
    Specialization,
    Membership,
}

impl RelationKind {
    /// All relation kinds, in the order of the schema table.
    pub const ALL: [RelationKind; 14] = [
        RelationKind::Generation,
        RelationKind::Usage,
        RelationKind::Communication,
        RelationKind::Start,
        RelationKind::End,
        RelationKind::Invalidation,
        RelationKind::Derivation,
        RelationKind::Attribution,
        RelationKind::Association,
        RelationKind::Delegation,
        RelationKind::Influence,
        RelationKind::Alternate,
        RelationKind::Specialization,
        RelationKind::Membership,
    ];

    /// The local parts of the `prov:` role names, in positional order.
    pub fn role_names(&self) -> &'static [&'static str] {
        match self {
            RelationKind::Generation => &["entity", "activity", "time"],
            RelationKind::Usage => &["activity", "entity", "time"],
            RelationKind::Communication => &["informed", "informant"],
            RelationKind::Start => &["activity", "trigger", "starter", "time"],
            RelationKind::End => &["activity", "trigger", "ender", "time"],
            RelationKind::Invalidation => &["entity", "activity", "time"],
            RelationKind::Derivation => &[
                "generatedEntity",
                "usedEntity",
                "activity",
                "generation",
                "usage",
            ],
            RelationKind::Attribution => &["entity", "agent"],
            RelationKind::Association => &["activity", "agent", "plan"],
            RelationKind::Delegation => &["delegate", "responsible", "activity"],
            RelationKind::Influence => &["influencee", "influencer"],
            RelationKind::Alternate => &["alternate1", "alternate2"],
            RelationKind::Specialization => &["specificEntity", "generalEntity"],
            RelationKind::Membership => &["collection", "entity"],
        }
    }

    /// The number of formal arguments the kind takes.
    pub fn arity(&self) -> usize {
        self.role_names().len()
    }

    /// The PROV-N record name (`wasGeneratedBy`, `used`, ...).
    pub fn record_name(&self) -> &'static str {
        match self {
            RelationKind::Generation => "wasGeneratedBy",
            RelationKind::Usage => "used",
            RelationKind::Communication => "wasInformedBy",
            RelationKind::Start => "wasStartedBy",
            RelationKind::End => "wasEndedBy",
            RelationKind::Invalidation => "wasInvalidatedBy",
            RelationKind::Derivation => "wasDerivedFrom",
            RelationKind::Attribution => "wasAttributedTo",
            RelationKind::Association => "wasAssociatedWith",
            RelationKind::Delegation => "actedOnBehalfOf",
            RelationKind::Influence => "wasInfluencedBy",
            RelationKind::Alternate => "alternateOf",
            RelationKind::Specialization => "specializationOf",
            RelationKind::Membership => "hadMember",
        }
    }

    /// The concept name (`Generation`, `Usage`, ...).
    pub fn concept_name(&self) -> &'static str {
        match self {
            RelationKind::Generation => "Generation",
            RelationKind::Usage => "Usage",
            RelationKind::Communication => "Communication",
            RelationKind::Start => "Start",
            RelationKind::End => "End",
            RelationKind::Invalidation => "Invalidation",
            RelationKind::Derivation => "Derivation",
            RelationKind::Attribution => "Attribution",
            RelationKind::Association => "Association",
            RelationKind::Delegation => "Delegation",
            RelationKind::Influence => "Influence",
            RelationKind::Alternate => "Alternate",
            RelationKind::Specialization => "Specialization",
            RelationKind::Membership => "Membership",
        }
    }

    /// Resolves a relation name to a kind.
    ///
    /// Accepts the PROV-N record name exactly (`wasGeneratedBy`) and the
    /// concept name case-insensitively (`Generation`, `generation`).
    pub fn from_name(name: &str) -> Result<Self, ExpansionError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| {
                kind.record_name() == name || kind.concept_name().eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| ExpansionError::UnknownRelation {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record_name())
    }
}

/// A positional formal argument of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormalArg {
    /// The `prov:` role name of the position
    pub role: QualifiedName,
    /// The argument, absent where the template leaves the position open
    pub arg: Option<QualifiedName>,
}

/// A relation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// The relation kind
    pub kind: RelationKind,
    /// Optional relation identifier
    pub id: Option<QualifiedName>,
    /// Positional formal arguments, one per role of the kind's schema
    pub formal: Vec<FormalArg>,
    /// Free extra attributes
    pub extra: Vec<Attribute>,
}

impl Relation {
    /// Builds a relation, pairing each argument with the kind's role at
    /// the same position.
    ///
    /// Fails with [`ExpansionError::ArityMismatch`] when the argument
    /// count differs from the kind's formal arity.
    pub fn new(
        kind: RelationKind,
        id: Option<QualifiedName>,
        args: Vec<Option<QualifiedName>>,
        extra: Vec<Attribute>,
    ) -> Result<Self, ExpansionError> {
        if args.len() != kind.arity() {
            return Err(ExpansionError::ArityMismatch {
                kind: kind.record_name(),
                expected: kind.arity(),
                found: args.len(),
            });
        }
        let formal = kind
            .role_names()
            .iter()
            .zip(args)
            .map(|(role, arg)| FormalArg {
                role: QualifiedName::prov(*role),
                arg,
            })
            .collect();
        Ok(Self {
            kind,
            id,
            formal,
            extra,
        })
    }

    /// Returns the positional arguments without their roles.
    pub fn args(&self) -> impl Iterator<Item = Option<&QualifiedName>> {
        self.formal.iter().map(|fa| fa.arg.as_ref())
    }
}

/// A record: an element or a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// An entity, activity, or agent
    Element(Element),
    /// One of the fourteen relation kinds
    Relation(Relation),
}

impl Record {
    /// Returns true for element records.
    pub fn is_element(&self) -> bool {
        matches!(self, Record::Element(_))
    }

    /// Returns true for relation records.
    pub fn is_relation(&self) -> bool {
        matches!(self, Record::Relation(_))
    }

    /// Returns the element if this record is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Record::Element(el) => Some(el),
            Record::Relation(_) => None,
        }
    }

    /// Returns the relation if this record is one.
    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Record::Relation(rel) => Some(rel),
            Record::Element(_) => None,
        }
    }
}

/// A named bundle of records. Bundles inherit the document's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// The bundle identifier
    pub id: QualifiedName,
    /// The bundle's ordered record list
    pub records: Vec<Record>,
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new(id: QualifiedName) -> Self {
        Self {
            id,
            records: Vec::new(),
        }
    }

    /// Appends an element record.
    pub fn element(&mut self, kind: ElementKind, id: QualifiedName, attributes: Vec<Attribute>) {
        self.records.push(Record::Element(Element {
            kind,
            id,
            attributes,
        }));
    }

    /// Appends an entity record.
    pub fn entity(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Entity, id, attributes);
    }

    /// Appends an activity record.
    pub fn activity(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Activity, id, attributes);
    }

    /// Appends an agent record.
    pub fn agent(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Agent, id, attributes);
    }

    /// Appends a relation record.
    pub fn relation(&mut self, relation: Relation) {
        self.records.push(Record::Relation(relation));
    }
}

/// A PROV document: a namespace registry, an ordered record list, and
/// zero or more bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The document-level namespace registry
    pub namespaces: NamespaceRegistry,
    /// The document's ordered record list
    pub records: Vec<Record>,
    /// The document's bundles
    pub bundles: Vec<Bundle>,
}

impl Document {
    /// Creates an empty document with the given registry.
    pub fn new(namespaces: NamespaceRegistry) -> Self {
        Self {
            namespaces,
            records: Vec::new(),
            bundles: Vec::new(),
        }
    }

    /// Appends an element record.
    pub fn element(&mut self, kind: ElementKind, id: QualifiedName, attributes: Vec<Attribute>) {
        self.records.push(Record::Element(Element {
            kind,
            id,
            attributes,
        }));
    }

    /// Appends an entity record.
    pub fn entity(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Entity, id, attributes);
    }

    /// Appends an activity record.
    pub fn activity(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Activity, id, attributes);
    }

    /// Appends an agent record.
    pub fn agent(&mut self, id: QualifiedName, attributes: Vec<Attribute>) {
        self.element(ElementKind::Agent, id, attributes);
    }

    /// Appends a relation record.
    pub fn relation(&mut self, relation: Relation) {
        self.records.push(Record::Relation(relation));
    }

    /// Appends an empty bundle and returns a mutable reference to it.
    pub fn bundle(&mut self, id: QualifiedName) -> &mut Bundle {
        self.bundles.push(Bundle::new(id));
        self.bundles.last_mut().expect("bundle just pushed")
    }

    /// Iterates over the document-level element records.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.records.iter().filter_map(Record::as_element)
    }

    /// Iterates over the document-level relation records.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.records.iter().filter_map(Record::as_relation)
    }
}
