//! Bloom-filter synopsis for equality and membership probes.

use telemark_types::{Data, RelOp, Type, TypeKind};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::synopsis::SynopsisOptions;

// Seeds for the two independent hash functions of the double-hashing scheme.
const SEED_A: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED_B: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// An approximate membership filter over the values of one field.
///
/// Sized from an expected cardinality `n` and a target false-positive rate
/// `p`; `k` bit positions per value are derived with the usual
/// `h1 + i * h2` double-hashing construction over the canonical byte
/// encoding of the value.
#[derive(Debug, Clone)]
pub struct BloomSynopsis {
    ty: Type,
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomSynopsis {
    /// Create a filter for values of the given type.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn new(ty: Type, options: &SynopsisOptions) -> Self {
        let n = options.bloom_expected_entries.max(1) as f64;
        let p = options
            .bloom_false_positive_rate
            .clamp(f64::EPSILON, 1.0 - f64::EPSILON);
        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((-n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / n) * ln2).round().max(1.0) as u32;
        let words = usize::try_from(num_bits.div_ceil(64)).unwrap_or(1);
        Self {
            ty,
            bits: vec![0; words],
            num_bits,
            num_hashes,
        }
    }

    /// The type of the values this filter summarises.
    #[must_use]
    pub const fn value_type(&self) -> &Type {
        &self.ty
    }

    #[must_use]
    pub const fn num_bits(&self) -> u64 {
        self.num_bits
    }

    #[must_use]
    pub const fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn add(&mut self, value: &Data) {
        let bytes = value.canonical_bytes();
        let h1 = xxh3_64_with_seed(&bytes, SEED_A);
        let h2 = xxh3_64_with_seed(&bytes, SEED_B) | 1;
        for i in 0..u64::from(self.num_hashes) {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    fn contains(&self, value: &Data) -> bool {
        let bytes = value.canonical_bytes();
        let h1 = xxh3_64_with_seed(&bytes, SEED_A);
        let h2 = xxh3_64_with_seed(&bytes, SEED_B) | 1;
        (0..u64::from(self.num_hashes)).all(|i| {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    /// Rewrite the probe into the value type of the filter, so that probes
    /// written as a different numeric variant still hash to the stored
    /// encoding. A probe that cannot represent a stored value yields `None`.
    fn coerce_probe(&self, probe: &Data) -> Option<Data> {
        match (self.ty.kind(), probe) {
            (TypeKind::Integer, _) => probe.narrow_to_integer().ok().map(Data::Integer),
            (TypeKind::Count, _) => probe.narrow_to_count().ok().map(Data::Count),
            (TypeKind::Real, _) => probe.narrow_to_real().ok().map(Data::Real),
            (TypeKind::Enumeration(_), Data::String(s)) => {
                Some(Data::Enumeration(s.clone()))
            }
            (TypeKind::Bool, Data::Bool(_))
            | (TypeKind::Time, Data::Time(_))
            | (TypeKind::Duration, Data::Duration(_))
            | (TypeKind::String, Data::String(_))
            | (TypeKind::Pattern, Data::Pattern(_))
            | (TypeKind::Address, Data::Address(_))
            | (TypeKind::Subnet, Data::Subnet(_))
            | (TypeKind::Port, Data::Port(_))
            | (TypeKind::Enumeration(_), Data::Enumeration(_)) => Some(probe.clone()),
            _ => None,
        }
    }

    fn lookup_equal(&self, probe: &Data) -> Option<bool> {
        let probe = self.coerce_probe(probe)?;
        Some(self.contains(&probe))
    }

    /// Probe the filter. `Some(false)` is definitive; `Some(true)` may be a
    /// false positive; `None` means the operator cannot be answered.
    #[must_use]
    pub fn lookup(&self, op: RelOp, probe: &Data) -> Option<bool> {
        match op {
            RelOp::Equal => self.lookup_equal(probe),
            // A bloom filter cannot prove a value absent from the
            // complement, so inequality is never answerable.
            RelOp::NotEqual => None,
            RelOp::In => match probe {
                Data::List(elements) => {
                    let mut verdict = Some(false);
                    for element in elements {
                        match self.lookup_equal(element) {
                            Some(true) => return Some(true),
                            Some(false) => {}
                            None => verdict = None,
                        }
                    }
                    verdict
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Best-effort estimate of the retained bytes.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        (std::mem::size_of::<Self>() + self.bits.len() * 8) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn addr(s: &str) -> Data {
        Data::Address(s.parse::<IpAddr>().unwrap())
    }

    fn address_bloom(values: &[&str]) -> BloomSynopsis {
        let mut bloom = BloomSynopsis::new(Type::address(), &SynopsisOptions::default());
        for v in values {
            bloom.add(&addr(v));
        }
        bloom
    }

    #[test]
    fn parameters_derive_from_options() {
        let options = SynopsisOptions {
            bloom_expected_entries: 1000,
            bloom_false_positive_rate: 0.01,
        };
        let bloom = BloomSynopsis::new(Type::address(), &options);
        // Textbook sizing: m ≈ 9.585 * n, k ≈ 7 for p = 1%.
        assert!(bloom.num_bits() > 9000 && bloom.num_bits() < 10000);
        assert_eq!(bloom.num_hashes(), 7);
    }

    #[test]
    fn added_values_are_found() {
        let bloom = address_bloom(&["10.0.0.1", "10.0.0.2"]);
        assert_eq!(bloom.lookup(RelOp::Equal, &addr("10.0.0.1")), Some(true));
        assert_eq!(bloom.lookup(RelOp::Equal, &addr("10.0.0.2")), Some(true));
    }

    #[test]
    fn absent_values_are_ruled_out() {
        let bloom = address_bloom(&["10.0.0.1"]);
        assert_eq!(bloom.lookup(RelOp::Equal, &addr("10.0.0.3")), Some(false));
    }

    #[test]
    fn inequality_is_never_answered() {
        let bloom = address_bloom(&["10.0.0.1"]);
        assert_eq!(bloom.lookup(RelOp::NotEqual, &addr("10.0.0.1")), None);
        assert_eq!(bloom.lookup(RelOp::NotEqual, &addr("10.0.0.9")), None);
    }

    #[test]
    fn membership_over_list_probes() {
        let bloom = address_bloom(&["10.0.0.1"]);
        let present = Data::List(vec![addr("10.0.0.9"), addr("10.0.0.1")]);
        assert_eq!(bloom.lookup(RelOp::In, &present), Some(true));
        let absent = Data::List(vec![addr("10.0.0.8"), addr("10.0.0.9")]);
        assert_eq!(bloom.lookup(RelOp::In, &absent), Some(false));
        assert_eq!(bloom.lookup(RelOp::In, &Data::List(vec![])), Some(false));
    }

    #[test]
    fn ordering_operators_are_unanswerable() {
        let bloom = address_bloom(&["10.0.0.1"]);
        assert_eq!(bloom.lookup(RelOp::Less, &addr("10.0.0.5")), None);
        assert_eq!(bloom.lookup(RelOp::Match, &addr("10.0.0.5")), None);
    }

    #[test]
    fn numeric_probes_are_narrowed() {
        let mut bloom = BloomSynopsis::new(Type::count(), &SynopsisOptions::default());
        bloom.add(&Data::Count(443));
        // An integer-typed probe for the same value must hit.
        assert_eq!(bloom.lookup(RelOp::Equal, &Data::Integer(443)), Some(true));
        assert_eq!(bloom.lookup(RelOp::Equal, &Data::Real(443.0)), Some(true));
        // A probe no count can equal cannot be answered definitively either
        // way by variant games; the type mismatch widens to None.
        assert_eq!(bloom.lookup(RelOp::Equal, &Data::String("443".into())), None);
    }

    #[test]
    fn mismatched_probe_types_widen_to_none() {
        let bloom = address_bloom(&["10.0.0.1"]);
        assert_eq!(bloom.lookup(RelOp::Equal, &Data::Count(1)), None);
    }

    #[test]
    fn memory_usage_tracks_bit_array() {
        let options = SynopsisOptions {
            bloom_expected_entries: 1 << 12,
            bloom_false_positive_rate: 0.01,
        };
        let bloom = BloomSynopsis::new(Type::address(), &options);
        assert!(bloom.memory_usage() > (bloom.num_bits() / 8));
    }
}
