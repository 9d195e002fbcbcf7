//! Universal properties of the meta-index lookup.
//!
//! The test harness keeps the actual per-partition values next to the
//! synopses, so soundness can be checked against ground truth: any
//! partition whose events satisfy the expression must appear in the
//! candidate set.

use proptest::prelude::*;
use telemark_ast::{Expression, Extractor};
use telemark_index::{MetaIndex, PartitionSynopsis, Synopsis, SynopsisOptions};
use telemark_types::{evaluate, Data, PartitionId, QualifiedField, RelOp, Type};

/// Ground truth for one partition: each value is one event with
/// `orig_p = v` and `uid = "u-<v>"`.
#[derive(Debug, Clone)]
struct PartitionData {
    values: Vec<u64>,
}

fn uid_of(value: u64) -> String {
    format!("u-{value}")
}

fn build_partition(data: &PartitionData) -> PartitionSynopsis {
    let options = SynopsisOptions::default();
    let mut partition = PartitionSynopsis::new();

    let port_ty = Type::count();
    let mut ports = Synopsis::for_type(&port_ty, &options).unwrap();
    let uid_ty = Type::string();
    let mut uids = Synopsis::for_type(&uid_ty, &options).unwrap();
    for v in &data.values {
        ports.add(&Data::Count(*v));
        uids.add(&Data::String(uid_of(*v)));
    }
    partition.put_field(
        QualifiedField::new("conn", "orig_p", port_ty),
        Some(ports),
    );
    partition.put_field(QualifiedField::new("conn", "uid", uid_ty), Some(uids));
    partition
}

fn build_index(partitions: &[PartitionData]) -> (MetaIndex, Vec<PartitionId>) {
    let mut index = MetaIndex::new();
    let mut ids = Vec::with_capacity(partitions.len());
    for (i, data) in partitions.iter().enumerate() {
        let id = PartitionId::from_u128(i as u128 + 1);
        index.merge(id, build_partition(data));
        ids.push(id);
    }
    (index, ids)
}

/// Whether one event (a single value) satisfies an expression.
fn event_satisfies(value: u64, expr: &Expression) -> bool {
    match expr {
        Expression::Conjunction(children) => {
            children.iter().all(|child| event_satisfies(value, child))
        }
        Expression::Disjunction(children) => {
            children.iter().any(|child| event_satisfies(value, child))
        }
        Expression::Negation(child) => !event_satisfies(value, child),
        Expression::Predicate(pred) => {
            let Extractor::Field(name) = &pred.lhs else {
                return false;
            };
            let lhs = match name.as_str() {
                "orig_p" => Data::Count(value),
                "uid" => Data::String(uid_of(value)),
                _ => return false,
            };
            evaluate(&lhs, pred.op, &pred.rhs)
        }
        Expression::Nil => false,
    }
}

fn partition_satisfies(data: &PartitionData, expr: &Expression) -> bool {
    data.values.iter().any(|v| event_satisfies(*v, expr))
}

// -- generators -------------------------------------------------------------

fn arb_partition() -> impl Strategy<Value = PartitionData> {
    prop::collection::vec(0_u64..50, 1..8).prop_map(|values| PartitionData { values })
}

fn arb_predicate() -> impl Strategy<Value = Expression> {
    let port_op = prop_oneof![
        Just(RelOp::Equal),
        Just(RelOp::NotEqual),
        Just(RelOp::Less),
        Just(RelOp::LessEqual),
        Just(RelOp::Greater),
        Just(RelOp::GreaterEqual),
    ];
    let port = (port_op, 0_u64..60).prop_map(|(op, k)| {
        Expression::predicate(Extractor::field("orig_p"), op, Data::Count(k))
    });
    let uid = (prop_oneof![Just(RelOp::Equal), Just(RelOp::NotEqual)], 0_u64..60).prop_map(
        |(op, k)| {
            Expression::predicate(Extractor::field("uid"), op, Data::String(uid_of(k)))
        },
    );
    prop_oneof![3 => port, 1 => uid]
}

fn arb_expression() -> impl Strategy<Value = Expression> {
    arb_predicate().prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..=3).prop_map(Expression::Conjunction),
            prop::collection::vec(inner.clone(), 1..=3).prop_map(Expression::Disjunction),
            inner.prop_map(Expression::negation),
        ]
    })
}

fn is_sorted_unique(ids: &[PartitionId]) -> bool {
    ids.windows(2).all(|w| w[0] < w[1])
}

// -- universal properties ---------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Soundness: a partition whose events satisfy the expression is never
    /// pruned.
    #[test]
    fn lookup_has_no_false_negatives(
        partitions in prop::collection::vec(arb_partition(), 1..6),
        expr in arb_expression(),
    ) {
        let (index, ids) = build_index(&partitions);
        let candidates = index.lookup(&expr).unwrap();
        for (data, id) in partitions.iter().zip(ids.iter()) {
            if partition_satisfies(data, &expr) {
                prop_assert!(
                    candidates.contains(id),
                    "partition {id} satisfies {expr} but was pruned"
                );
            }
        }
    }

    /// Output is strictly ascending (sorted and duplicate-free).
    #[test]
    fn lookup_output_is_sorted(
        partitions in prop::collection::vec(arb_partition(), 1..6),
        expr in arb_expression(),
    ) {
        let (index, _) = build_index(&partitions);
        let candidates = index.lookup(&expr).unwrap();
        prop_assert!(is_sorted_unique(&candidates));
    }

    /// Merging the same synopsis twice leaves lookups unchanged.
    #[test]
    fn merge_is_idempotent(
        partitions in prop::collection::vec(arb_partition(), 1..5),
        expr in arb_expression(),
    ) {
        let (mut index, ids) = build_index(&partitions);
        let before = index.lookup(&expr).unwrap();
        let last = partitions.len() - 1;
        index.merge(ids[last], build_partition(&partitions[last]));
        let after = index.lookup(&expr).unwrap();
        prop_assert_eq!(before, after);
    }

    /// Erase composes with merge: erasing an id and re-merging it matches a
    /// single merge, and erasing an absent id is a no-op.
    #[test]
    fn erase_then_merge_equals_merge(
        partitions in prop::collection::vec(arb_partition(), 2..5),
        expr in arb_expression(),
    ) {
        let (mut churned, ids) = build_index(&partitions);
        churned.erase(&ids[0]);
        churned.erase(&PartitionId::from_u128(0xdead_beef)); // absent
        churned.merge(ids[0], build_partition(&partitions[0]));

        let (fresh, _) = build_index(&partitions);
        prop_assert_eq!(
            churned.lookup(&expr).unwrap(),
            fresh.lookup(&expr).unwrap()
        );
    }

    /// Negation over-approximates the complement.
    #[test]
    fn negation_widens(
        partitions in prop::collection::vec(arb_partition(), 1..6),
        expr in arb_expression(),
    ) {
        let (index, ids) = build_index(&partitions);
        let positive = index.lookup(&expr).unwrap();
        let negated = index.lookup(&Expression::negation(expr)).unwrap();
        for id in &ids {
            if !positive.contains(id) {
                prop_assert!(negated.contains(id));
            }
        }
    }

    /// A conjunction never returns more than the intersection of its
    /// conjuncts.
    #[test]
    fn conjunction_is_subset_of_intersection(
        partitions in prop::collection::vec(arb_partition(), 1..6),
        e1 in arb_expression(),
        e2 in arb_expression(),
    ) {
        let (index, _) = build_index(&partitions);
        let conj = index
            .lookup(&Expression::conjunction([e1.clone(), e2.clone()]))
            .unwrap();
        let r1 = index.lookup(&e1).unwrap();
        let r2 = index.lookup(&e2).unwrap();
        for id in &conj {
            prop_assert!(r1.contains(id) && r2.contains(id));
        }
    }

    /// A disjunction returns exactly the sorted, deduplicated union of its
    /// disjuncts.
    #[test]
    fn disjunction_is_union(
        partitions in prop::collection::vec(arb_partition(), 1..6),
        e1 in arb_expression(),
        e2 in arb_expression(),
    ) {
        let (index, _) = build_index(&partitions);
        let disj = index
            .lookup(&Expression::disjunction([e1.clone(), e2.clone()]))
            .unwrap();
        let mut expected = index.lookup(&e1).unwrap();
        expected.extend(index.lookup(&e2).unwrap());
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(disj, expected);
    }
}

/// A bloom filter must not rule out inequality: with a single data point
/// `x`, `(!=, x)` is unanswerable and the partition stays a candidate.
#[test]
fn bloom_cannot_rule_out_inequality() {
    let options = SynopsisOptions::default();
    let ty = Type::string();
    let mut synopsis = Synopsis::for_type(&ty, &options).unwrap();
    let x = Data::String("only-value".into());
    synopsis.add(&x);
    assert_eq!(synopsis.lookup(RelOp::NotEqual, &x), None);

    let mut partition = PartitionSynopsis::new();
    partition.put_field(QualifiedField::new("conn", "uid", ty), Some(synopsis));
    let mut index = MetaIndex::new();
    let id = PartitionId::from_u128(1);
    index.merge(id, partition);

    let expr = Expression::predicate(Extractor::field("uid"), RelOp::NotEqual, x);
    assert_eq!(index.lookup(&expr).unwrap(), vec![id]);
}
