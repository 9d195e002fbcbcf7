//! The polymorphic synopsis and its construction policy.
//!
//! A synopsis owns a bounded-size approximation of all values inserted for
//! one field in one partition. The soundness contract every kind honours:
//! if `lookup` returns `Some(false)`, no inserted value satisfies
//! `value op probe`; `Some(true)` and `None` both mean at least one might.
//! False negatives are forbidden; a violation invalidates the meta-index
//! and is a bug in the synopsis implementation.

use telemark_types::{Data, RelOp, Type, TypeKind};

use crate::bloom::BloomSynopsis;
use crate::minmax::MinMaxSynopsis;
use crate::tally::BoolSynopsis;

/// Tuning knobs for synopsis construction, filled in by the ingestion
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct SynopsisOptions {
    /// Expected distinct values per bloom filter.
    pub bloom_expected_entries: u64,
    /// Target false-positive rate per bloom filter.
    pub bloom_false_positive_rate: f64,
}

impl Default for SynopsisOptions {
    fn default() -> Self {
        Self {
            bloom_expected_entries: 1 << 16,
            bloom_false_positive_rate: 0.01,
        }
    }
}

/// A per-field approximate summary. Sum type rather than trait objects:
/// the set of kinds is closed and dispatch stays transparent.
#[derive(Debug, Clone)]
pub enum Synopsis {
    Bloom(BloomSynopsis),
    MinMax(MinMaxSynopsis),
    Bool(BoolSynopsis),
}

impl Synopsis {
    /// Construct the synopsis kind appropriate for a field type, or `None`
    /// for types no synopsis can summarise (composites and `none`).
    ///
    /// Ranges cover the numerics, times and durations; bloom filters cover
    /// the equality-probed scalar types; bools get an exact tally.
    #[must_use]
    pub fn for_type(ty: &Type, options: &SynopsisOptions) -> Option<Self> {
        match ty.kind() {
            TypeKind::Bool => Some(Self::Bool(BoolSynopsis::new())),
            TypeKind::Integer
            | TypeKind::Count
            | TypeKind::Real
            | TypeKind::Time
            | TypeKind::Duration => Some(Self::MinMax(MinMaxSynopsis::new(ty.clone()))),
            TypeKind::String
            | TypeKind::Pattern
            | TypeKind::Address
            | TypeKind::Subnet
            | TypeKind::Port
            | TypeKind::Enumeration(_) => {
                Some(Self::Bloom(BloomSynopsis::new(ty.clone(), options)))
            }
            TypeKind::None
            | TypeKind::List(_)
            | TypeKind::Map(_, _)
            | TypeKind::Record(_) => None,
        }
    }

    /// Insert one observed value.
    pub fn add(&mut self, value: &Data) {
        match self {
            Self::Bloom(s) => s.add(value),
            Self::MinMax(s) => s.add(value),
            Self::Bool(s) => s.add(value),
        }
    }

    /// Probe the synopsis with `value op probe` semantics; see the module
    /// documentation for the contract.
    #[must_use]
    pub fn lookup(&self, op: RelOp, probe: &Data) -> Option<bool> {
        match self {
            Self::Bloom(s) => s.lookup(op, probe),
            Self::MinMax(s) => s.lookup(op, probe),
            Self::Bool(s) => s.lookup(op, probe),
        }
    }

    /// Best-effort estimate of the retained bytes.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        match self {
            Self::Bloom(s) => s.memory_usage(),
            Self::MinMax(s) => s.memory_usage(),
            Self::Bool(s) => s.memory_usage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_policy_matches_types() {
        let options = SynopsisOptions::default();
        assert!(matches!(
            Synopsis::for_type(&Type::boolean(), &options),
            Some(Synopsis::Bool(_))
        ));
        assert!(matches!(
            Synopsis::for_type(&Type::count(), &options),
            Some(Synopsis::MinMax(_))
        ));
        assert!(matches!(
            Synopsis::for_type(&Type::time(), &options),
            Some(Synopsis::MinMax(_))
        ));
        assert!(matches!(
            Synopsis::for_type(&Type::address(), &options),
            Some(Synopsis::Bloom(_))
        ));
        assert!(matches!(
            Synopsis::for_type(&Type::string(), &options),
            Some(Synopsis::Bloom(_))
        ));
        assert!(Synopsis::for_type(&Type::none(), &options).is_none());
        assert!(Synopsis::for_type(&Type::list(Type::count()), &options).is_none());
    }

    #[test]
    fn dispatch_reaches_the_inner_kind() {
        let mut synopsis =
            Synopsis::for_type(&Type::count(), &SynopsisOptions::default()).unwrap();
        synopsis.add(&Data::Count(80));
        synopsis.add(&Data::Count(443));
        assert_eq!(
            synopsis.lookup(RelOp::Equal, &Data::Count(53)),
            Some(false)
        );
        assert_eq!(synopsis.lookup(RelOp::Equal, &Data::Count(100)), None);
        assert!(synopsis.memory_usage() > 0);
    }

    #[test]
    fn decorated_types_still_get_synopses() {
        let ty = Type::time().with_name("timestamp").with_attribute("timestamp");
        assert!(matches!(
            Synopsis::for_type(&ty, &SynopsisOptions::default()),
            Some(Synopsis::MinMax(_))
        ));
    }
}
