//! Linked-group analysis over a template's element records.
//!
//! Template nodes may carry `tmpl:linked` attributes naming a parent
//! node. The transitive closure of those edges partitions the nodes into
//! groups; members of one group expand in parallel (zip) while distinct
//! groups expand cartesian. This module builds the parent forest, checks
//! it is a forest (acyclic, at most one parent per node), orders the
//! nodes parents-first, and computes each group's expansion cardinality
//! from the bindings.
//!
//! The analysis is pure: it never mutates the store and never emits
//! records.

use crate::bindings::BindingsStore;
use crate::document::{Element, Record};
use crate::error::ExpansionError;
use crate::qname::{QualifiedName, TMPL_PREFIX};
use std::collections::HashMap;

/// Returns true for the `tmpl:linked` attribute name.
pub fn is_linked_attribute(name: &QualifiedName) -> bool {
    name.prefix() == TMPL_PREFIX && name.localpart == "linked"
}

/// The result of analysing one scope's element records.
#[derive(Debug, Clone)]
pub struct GroupAnalysis {
    /// Indices of element records into the scope's record list, ordered
    /// by (depth, template position): roots first, template order
    /// preserved within a depth level.
    pub order: Vec<usize>,
    group_of: HashMap<QualifiedName, usize>,
    cardinality: Vec<usize>,
}

impl GroupAnalysis {
    /// The group a node identifier belongs to, if it names an element of
    /// the analysed scope.
    pub fn group(&self, id: &QualifiedName) -> Option<usize> {
        self.group_of.get(id).copied()
    }

    /// A group's expansion cardinality.
    pub fn group_cardinality(&self, group: usize) -> usize {
        self.cardinality[group]
    }

    /// A node's expansion cardinality, via its group.
    pub fn node_cardinality(&self, id: &QualifiedName) -> Option<usize> {
        self.group(id).map(|g| self.cardinality[g])
    }

    /// The number of groups in the scope.
    pub fn group_count(&self) -> usize {
        self.cardinality.len()
    }
}

/// Where a parent-chain walk terminated.
enum ChainEnd {
    /// Reached a node whose depth and root are already known.
    Known(QualifiedName),
    /// Reached a root (the last chain entry).
    Root,
}

/// Analyses one scope's element records against the bindings.
///
/// Fails with [`ExpansionError::LinkedGraphInvalid`] on a cyclic
/// `tmpl:linked` graph or a node with two distinct parents, and with
/// [`ExpansionError::IncorrectNumberOfBindingsForGroup`] when bound
/// members of one group disagree on cardinality.
pub fn analyze_groups(
    records: &[Record],
    store: &BindingsStore,
) -> Result<GroupAnalysis, ExpansionError> {
    let elements: Vec<(usize, &Element)> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, rec)| rec.as_element().map(|el| (idx, el)))
        .collect();

    // Parent map from tmpl:linked attributes. Links to identifiers that
    // are not elements of this scope are ignored.
    let mut parent: HashMap<QualifiedName, QualifiedName> = HashMap::new();
    for (_, el) in &elements {
        for attr in &el.attributes {
            if !is_linked_attribute(&attr.name) {
                continue;
            }
            let Some(target) = attr.value.qualified_name() else {
                continue;
            };
            if !elements.iter().any(|(_, other)| &other.id == target) {
                continue;
            }
            match parent.get(&el.id) {
                Some(existing) if existing == target => {}
                Some(_) => {
                    return Err(ExpansionError::LinkedGraphInvalid {
                        node: el.id.clone(),
                        reason: "node has two parents".to_string(),
                    });
                }
                None => {
                    parent.insert(el.id.clone(), target.clone());
                }
            }
        }
    }

    // Walk parent chains once per node, assigning depth and root.
    let mut depth: HashMap<QualifiedName, usize> = HashMap::new();
    let mut root_of: HashMap<QualifiedName, QualifiedName> = HashMap::new();
    for (_, el) in &elements {
        if depth.contains_key(&el.id) {
            continue;
        }
        let mut chain: Vec<QualifiedName> = Vec::new();
        let mut cursor = el.id.clone();
        let end = loop {
            if depth.contains_key(&cursor) {
                break ChainEnd::Known(cursor);
            }
            if chain.contains(&cursor) {
                return Err(ExpansionError::LinkedGraphInvalid {
                    node: cursor,
                    reason: "cycle detected".to_string(),
                });
            }
            chain.push(cursor.clone());
            match parent.get(&cursor) {
                Some(p) => cursor = p.clone(),
                None => break ChainEnd::Root,
            }
        };
        let (root, mut next_depth) = match end {
            ChainEnd::Known(known) => (root_of[&known].clone(), depth[&known] + 1),
            ChainEnd::Root => (chain.last().expect("chain is non-empty").clone(), 0),
        };
        for node in chain.iter().rev() {
            depth.insert(node.clone(), next_depth);
            root_of.insert(node.clone(), root.clone());
            next_depth += 1;
        }
    }

    // One group per root, numbered in template order of first appearance.
    let mut group_index: HashMap<QualifiedName, usize> = HashMap::new();
    let mut group_of: HashMap<QualifiedName, usize> = HashMap::new();
    let mut members: Vec<Vec<QualifiedName>> = Vec::new();
    for (_, el) in &elements {
        let root = &root_of[&el.id];
        let group = match group_index.get(root) {
            Some(g) => *g,
            None => {
                let g = members.len();
                group_index.insert(root.clone(), g);
                members.push(Vec::new());
                g
            }
        };
        group_of.insert(el.id.clone(), group);
        members[group].push(el.id.clone());
    }

    // Per-group cardinality: the maximum over bound members, where a
    // concrete identifier counts 1 and an unbound variable does not
    // contribute. A group with no contributing member expands once.
    let mut cardinality = Vec::with_capacity(members.len());
    for group in &members {
        let mut cards: Vec<(&QualifiedName, usize)> = Vec::new();
        for id in group {
            if id.is_variable() {
                if store.is_bound(id) {
                    cards.push((id, store.cardinality(id)));
                }
            } else {
                cards.push((id, 1));
            }
        }
        let n = cards.iter().map(|(_, c)| *c).max().unwrap_or(1);
        // An empty binding next to a non-empty sibling fails here too:
        // card 0 is neither n nor 1 once the max exceeds 0.
        for (id, card) in cards {
            if card != n && card != 1 {
                return Err(ExpansionError::IncorrectNumberOfBindingsForGroup {
                    variable: id.clone(),
                    expected: n,
                    found: card,
                });
            }
        }
        cardinality.push(n);
    }

    // Parents-first ordering, stable in template position per depth level.
    let mut order: Vec<usize> = elements.iter().map(|(idx, _)| *idx).collect();
    order.sort_by_key(|idx| {
        let el = records[*idx].as_element().expect("index of an element");
        (depth[&el.id], *idx)
    });

    log::debug!(
        "linked-group analysis: {} elements, {} groups, cardinalities {:?}",
        elements.len(),
        members.len(),
        cardinality
    );

    Ok(GroupAnalysis {
        order,
        group_of,
        cardinality,
    })
}
