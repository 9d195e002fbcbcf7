//! Relational evaluation over [`Data`] values.
//!
//! `evaluate` is total: combinations an operator does not define yield
//! `false` rather than an error, because predicate evaluation feeds the
//! candidate-set computation where "don't know" must never exclude data.

use std::cmp::Ordering;

use crate::operator::RelOp;
use crate::value::Data;

/// Evaluate `lhs op rhs`.
#[must_use]
pub fn evaluate(lhs: &Data, op: RelOp, rhs: &Data) -> bool {
    match op {
        RelOp::Equal => lhs == rhs,
        RelOp::NotEqual => lhs != rhs,
        RelOp::Less => matches!(lhs.partial_cmp(rhs), Some(Ordering::Less)),
        RelOp::LessEqual => matches!(
            lhs.partial_cmp(rhs),
            Some(Ordering::Less | Ordering::Equal)
        ),
        RelOp::Greater => matches!(lhs.partial_cmp(rhs), Some(Ordering::Greater)),
        RelOp::GreaterEqual => matches!(
            lhs.partial_cmp(rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        RelOp::In => contains(lhs, rhs),
        RelOp::NotIn => !contains(lhs, rhs),
        RelOp::Match => matches(lhs, rhs),
        RelOp::NotMatch => !matches(lhs, rhs),
    }
}

/// Membership: element in list, key in map, address in subnet, substring in
/// string, pattern occurring in string.
fn contains(lhs: &Data, rhs: &Data) -> bool {
    match (lhs, rhs) {
        (Data::String(l), Data::String(r)) => r.contains(l.as_str()),
        (Data::Pattern(p), Data::String(s)) => p.search(s),
        (Data::Address(a), Data::Subnet(s)) => s.contains(a),
        (Data::Subnet(a), Data::Subnet(b)) => b.contains_subnet(a),
        (x, Data::List(xs)) => xs.iter().any(|e| e == x),
        (x, Data::Map(pairs)) => pairs.iter().any(|(k, _)| k == x),
        _ => false,
    }
}

/// Pattern matching: the pattern side must cover the whole string side.
fn matches(lhs: &Data, rhs: &Data) -> bool {
    match (lhs, rhs) {
        (Data::String(s), Data::Pattern(p)) | (Data::Pattern(p), Data::String(s)) => {
            p.is_match(s)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Pattern, Subnet};
    use std::net::IpAddr;

    fn addr(s: &str) -> Data {
        Data::Address(s.parse::<IpAddr>().unwrap())
    }

    #[test]
    fn equality_across_numeric_variants() {
        assert!(evaluate(&Data::Integer(3), RelOp::Equal, &Data::Count(3)));
        assert!(evaluate(&Data::Count(3), RelOp::Equal, &Data::Real(3.0)));
        assert!(evaluate(&Data::Integer(3), RelOp::NotEqual, &Data::Count(4)));
    }

    #[test]
    fn ordering_on_ordered_variants() {
        assert!(evaluate(&Data::Count(80), RelOp::Less, &Data::Count(443)));
        assert!(evaluate(
            &Data::String("abc".into()),
            RelOp::LessEqual,
            &Data::String("abd".into())
        ));
        assert!(evaluate(&addr("10.0.0.1"), RelOp::Less, &addr("10.0.0.2")));
    }

    #[test]
    fn undefined_comparisons_are_false() {
        assert!(!evaluate(
            &Data::Bool(true),
            RelOp::Less,
            &Data::Count(1)
        ));
        assert!(!evaluate(
            &Data::Real(f64::NAN),
            RelOp::Less,
            &Data::Real(1.0)
        ));
        // Both the test and its complementary comparison are false.
        assert!(!evaluate(
            &Data::Real(f64::NAN),
            RelOp::GreaterEqual,
            &Data::Real(1.0)
        ));
    }

    #[test]
    fn membership_in_lists_and_maps() {
        let list = Data::List(vec![Data::Count(80), Data::Count(443)]);
        assert!(evaluate(&Data::Count(80), RelOp::In, &list));
        assert!(evaluate(&Data::Count(8080), RelOp::NotIn, &list));

        let map = Data::Map(vec![(Data::String("k".into()), Data::Count(1))]);
        assert!(evaluate(&Data::String("k".into()), RelOp::In, &map));
        assert!(!evaluate(&Data::Count(1), RelOp::In, &map));
    }

    #[test]
    fn membership_in_subnets() {
        let net = Data::Subnet(Subnet::new("10.0.0.0".parse().unwrap(), 8));
        assert!(evaluate(&addr("10.1.2.3"), RelOp::In, &net));
        assert!(evaluate(&addr("192.168.0.1"), RelOp::NotIn, &net));

        let narrow = Data::Subnet(Subnet::new("10.1.0.0".parse().unwrap(), 16));
        assert!(evaluate(&narrow, RelOp::In, &net));
        assert!(!evaluate(&net, RelOp::In, &narrow));
    }

    #[test]
    fn substring_membership() {
        let hay = Data::String("example.com".into());
        assert!(evaluate(&Data::String("ample".into()), RelOp::In, &hay));
        assert!(!evaluate(&Data::String("nope".into()), RelOp::In, &hay));
    }

    #[test]
    fn pattern_matching() {
        let pat = Data::Pattern(Pattern::regex(".*\\.com"));
        let s = Data::String("example.com".into());
        assert!(evaluate(&s, RelOp::Match, &pat));
        assert!(evaluate(
            &Data::String("example.org".into()),
            RelOp::NotMatch,
            &pat
        ));
        // match requires full coverage; in only containment.
        let partial = Data::Pattern(Pattern::regex("exam"));
        assert!(!evaluate(&s, RelOp::Match, &partial));
        assert!(evaluate(&partial, RelOp::In, &s));
    }

    #[test]
    fn layout_name_comparisons_used_by_meta_queries() {
        // #type predicates wrap layout names as strings and reuse evaluate.
        let layout = Data::String("zeek.conn".into());
        assert!(evaluate(
            &layout,
            RelOp::Equal,
            &Data::String("zeek.conn".into())
        ));
        assert!(evaluate(
            &layout,
            RelOp::NotEqual,
            &Data::String("zeek.dns".into())
        ));
        assert!(evaluate(
            &Data::String("conn".into()),
            RelOp::In,
            &layout
        ));
    }
}
