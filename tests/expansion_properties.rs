//! Property-based tests over the expansion invariants.
//!
//! Minted identifiers are random, so properties assert counts and
//! cross-reference equality rather than concrete values.

use proptest::prelude::*;
use provtmpl::{
    analyze_groups, expand, read_bindings_provdoc, write_bindings_provdoc, Attribute,
    BindingsStore, BoundValue, Document, Namespace, NamespaceRegistry, QualifiedName, Relation,
    RelationKind, Value,
};

const EX_URI: &str = "http://example.org/#";

fn ex(local: &str) -> QualifiedName {
    QualifiedName::new(Namespace::new("ex", EX_URI), local)
}

fn qn(q: &QualifiedName) -> Value {
    Value::Qualified(q.clone())
}

fn template() -> Document {
    let mut registry = NamespaceRegistry::reserved();
    registry.register(Namespace::new("ex", EX_URI));
    Document::new(registry)
}

fn id_list(prefix: &str, n: usize) -> BoundValue {
    BoundValue::List(
        (0..n)
            .map(|i| qn(&ex(&format!("{}{}", prefix, i))))
            .collect(),
    )
}

fn local_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}"
}

fn literal_text() -> impl Strategy<Value = String> {
    "[ -~]{0,12}"
}

// ============================================================================
// P1: A template with no variables expands to itself
// ============================================================================

proptest! {
    #[test]
    fn p1_concrete_templates_are_fixed_points(
        names in proptest::collection::vec(local_name(), 1..5),
        texts in proptest::collection::vec(literal_text(), 1..5),
    ) {
        let mut doc = template();
        for (name, text) in names.iter().zip(texts.iter().cycle()) {
            doc.entity(
                ex(name),
                vec![Attribute::new(
                    QualifiedName::prov("value"),
                    Value::literal(text.clone()),
                )],
            );
        }
        if names.len() >= 2 {
            doc.relation(
                Relation::new(
                    RelationKind::Alternate,
                    None,
                    vec![Some(ex(&names[0])), Some(ex(&names[1]))],
                    vec![],
                )
                .unwrap(),
            );
        }

        let output = expand(&doc, BindingsStore::new()).unwrap();
        prop_assert_eq!(output.records, doc.records);
    }
}

// ============================================================================
// P2: All-scalar bindings give one output record per template record
// ============================================================================

proptest! {
    #[test]
    fn p2_scalar_bindings_expand_one_to_one(
        element_count in 1usize..5,
        attr_counts in proptest::collection::vec(0usize..4, 1..5),
    ) {
        let mut doc = template();
        let mut store = BindingsStore::new();

        for i in 0..element_count {
            let var = QualifiedName::var(format!("e{}", i));
            let attr_count = attr_counts[i % attr_counts.len()];
            let attributes: Vec<Attribute> = (0..attr_count)
                .map(|j| {
                    let value_var = QualifiedName::var(format!("v{}_{}", i, j));
                    Attribute::new(
                        QualifiedName::prov(format!("role{}", j)),
                        qn(&value_var),
                    )
                })
                .collect();
            doc.entity(var.clone(), attributes);

            store.put(var, BoundValue::Scalar(qn(&ex(&format!("c{}", i)))));
            for j in 0..attr_count {
                store.put(
                    QualifiedName::var(format!("v{}_{}", i, j)),
                    BoundValue::Scalar(Value::literal(format!("val{}_{}", i, j))),
                );
            }
        }

        let output = expand(&doc, store).unwrap();
        prop_assert_eq!(output.records.len(), doc.records.len());

        for (out, tpl) in output.elements().zip(doc.elements()) {
            let out_names: Vec<&QualifiedName> =
                out.attributes.iter().map(|a| &a.name).collect();
            let tpl_names: Vec<&QualifiedName> =
                tpl.attributes.iter().map(|a| &a.name).collect();
            prop_assert_eq!(out_names, tpl_names);
        }
    }
}

// ============================================================================
// P3: Every variable node of a group of cardinality N yields N records
// ============================================================================

proptest! {
    #[test]
    fn p3_group_members_each_expand_n_times(n in 1usize..6) {
        let a = QualifiedName::var("a");
        let b = QualifiedName::var("b");

        let mut doc = template();
        doc.entity(a.clone(), vec![]);
        doc.entity(
            b.clone(),
            vec![Attribute::new(QualifiedName::tmpl("linked"), qn(&a))],
        );

        let mut store = BindingsStore::new();
        store.put(a, id_list("a", n));
        store.put(b, id_list("b", n));

        let output = expand(&doc, store).unwrap();
        prop_assert_eq!(output.elements().count(), 2 * n);
    }
}

// ============================================================================
// P4: Cross-group relation arguments multiply cardinalities
// ============================================================================

proptest! {
    #[test]
    fn p4_relation_copies_are_the_cartesian_product(
        n1 in 1usize..4,
        n2 in 1usize..4,
        n3 in 1usize..4,
    ) {
        let act = QualifiedName::var("act");
        let agent = QualifiedName::var("agent");
        let plan = QualifiedName::var("plan");

        let mut doc = template();
        doc.activity(act.clone(), vec![]);
        doc.agent(agent.clone(), vec![]);
        doc.entity(plan.clone(), vec![]);
        doc.relation(
            Relation::new(
                RelationKind::Association,
                None,
                vec![Some(act.clone()), Some(agent.clone()), Some(plan.clone())],
                vec![],
            )
            .unwrap(),
        );

        let mut store = BindingsStore::new();
        store.put(act, id_list("act", n1));
        store.put(agent, id_list("ag", n2));
        store.put(plan, id_list("pl", n3));

        let output = expand(&doc, store).unwrap();
        prop_assert_eq!(output.relations().count(), n1 * n2 * n3);
    }
}

// ============================================================================
// P5: Every reference to one vargen variable sees one minted sequence
// ============================================================================

proptest! {
    #[test]
    fn p5_vargen_references_share_the_minted_sequence(acts in 1usize..4) {
        let x = QualifiedName::vargen("x");
        let act = QualifiedName::var("act");

        let mut doc = template();
        doc.entity(x.clone(), vec![]);
        doc.relation(
            Relation::new(
                RelationKind::Usage,
                None,
                vec![Some(act.clone()), Some(x.clone()), None],
                vec![],
            )
            .unwrap(),
        );
        doc.relation(
            Relation::new(
                RelationKind::Generation,
                None,
                vec![Some(x.clone()), Some(act.clone()), None],
                vec![],
            )
            .unwrap(),
        );

        let mut store = BindingsStore::new();
        store.put(act, id_list("a", acts));

        let output = expand(&doc, store).unwrap();
        let minted = output.elements().next().unwrap().id.clone();

        for relation in output.relations() {
            let entity_arg = match relation.kind {
                RelationKind::Usage => relation.formal[1].arg.as_ref(),
                _ => relation.formal[0].arg.as_ref(),
            };
            prop_assert_eq!(entity_arg, Some(&minted));
        }
    }
}

// ============================================================================
// P6: Writer/reader round trip preserves the store
// ============================================================================

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        literal_text().prop_map(Value::literal),
        literal_text().prop_map(Value::Plain),
        local_name().prop_map(|l| qn(&QualifiedName::prov(l))),
    ]
}

fn bound_value_strategy() -> impl Strategy<Value = BoundValue> {
    prop_oneof![
        value_strategy().prop_map(BoundValue::Scalar),
        proptest::collection::vec(value_strategy(), 1..4).prop_map(BoundValue::List),
        // Rows at least two wide, so the single-column collapse rule
        // never rewrites the shape.
        (2usize..4).prop_flat_map(|width| {
            proptest::collection::vec(
                proptest::collection::vec(value_strategy(), width..width + 1),
                1..3,
            )
            .prop_map(BoundValue::Grid)
        }),
    ]
}

proptest! {
    #[test]
    fn p6_bindings_round_trip(
        entries in proptest::collection::btree_map(local_name(), bound_value_strategy(), 1..5),
        vargen_flags in proptest::collection::vec(any::<bool>(), 1..5),
    ) {
        let mut store = BindingsStore::new();
        for ((name, value), is_vargen) in entries.into_iter().zip(vargen_flags.iter().cycle()) {
            let variable = if *is_vargen {
                QualifiedName::vargen(name)
            } else {
                QualifiedName::var(name)
            };
            store.put(variable, value);
        }

        let doc = write_bindings_provdoc(&store);
        let back = read_bindings_provdoc(&doc).unwrap();
        prop_assert_eq!(back, store);
    }
}

// ============================================================================
// P7: Group analysis is stable under permutation of non-linked nodes
// ============================================================================

proptest! {
    #[test]
    fn p7_analysis_is_stable_under_permutation(
        cards in proptest::collection::vec(1usize..4, 2..6),
        order in proptest::collection::vec(0usize..100, 2..6).prop_shuffle(),
    ) {
        let parent = QualifiedName::var("parent");
        let child = QualifiedName::var("child");

        let mut store = BindingsStore::new();
        for (i, card) in cards.iter().enumerate() {
            store.put(QualifiedName::var(format!("free{}", i)), id_list("f", *card));
        }
        store.put(parent.clone(), id_list("p", 2));
        store.put(child.clone(), id_list("c", 2));

        // Baseline: linked pair first, free nodes in index order.
        let mut baseline = template();
        baseline.entity(parent.clone(), vec![]);
        baseline.entity(
            child.clone(),
            vec![Attribute::new(QualifiedName::tmpl("linked"), qn(&parent))],
        );
        for i in 0..cards.len() {
            baseline.entity(QualifiedName::var(format!("free{}", i)), vec![]);
        }

        // Permuted: free nodes shuffled between and around the pair.
        let mut permuted = template();
        let positions: Vec<usize> = order.iter().map(|p| p % cards.len()).collect();
        for i in &positions {
            permuted.entity(QualifiedName::var(format!("free{}", i)), vec![]);
        }
        permuted.entity(
            child.clone(),
            vec![Attribute::new(QualifiedName::tmpl("linked"), qn(&parent))],
        );
        permuted.entity(parent.clone(), vec![]);
        for i in 0..cards.len() {
            // Nodes possibly missing from the shuffled draw still appear
            // once at the end.
            if !positions.contains(&i) {
                permuted.entity(QualifiedName::var(format!("free{}", i)), vec![]);
            }
        }

        let base = analyze_groups(&baseline.records, &store).unwrap();
        let perm = analyze_groups(&permuted.records, &store).unwrap();

        prop_assert_eq!(
            base.node_cardinality(&parent),
            perm.node_cardinality(&parent)
        );
        prop_assert_eq!(base.node_cardinality(&child), perm.node_cardinality(&child));
        prop_assert_eq!(base.group(&parent).is_some(), perm.group(&parent).is_some());
        for i in 0..cards.len() {
            let free = QualifiedName::var(format!("free{}", i));
            prop_assert_eq!(base.node_cardinality(&free), perm.node_cardinality(&free));
        }
    }
}
