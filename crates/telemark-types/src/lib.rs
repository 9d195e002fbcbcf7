//! Core value and type model for the Telemark meta-index.
//!
//! This crate defines the vocabulary every other Telemark crate speaks:
//! partition identifiers, the algebraic [`Type`] model with its attribute
//! decorations, [`Schema`] collections, qualified field keys, the [`Data`]
//! value domain, and the relational [`evaluate`] function used by predicate
//! matching.

pub mod eval;
pub mod field;
pub mod operator;
pub mod schema;
pub mod value;

pub use eval::evaluate;
pub use field::QualifiedField;
pub use operator::RelOp;
pub use schema::{RecordField, Schema, Type, TypeKind};
pub use value::{Data, Pattern, PatternKind, Port, PortProtocol, Subnet};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one immutable partition of events.
///
/// A 128-bit opaque value with byte-wise total order; the order is stable
/// across runs, which the meta-index relies on for its sorted-result
/// invariant. The wire form is 16 bytes big-endian; `Display` renders the
/// conventional hyphenated hex form used in logs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct PartitionId(Uuid);

impl PartitionId {
    /// The all-zero identifier.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Create an identifier from its 16-byte big-endian wire form.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create an identifier from a 128-bit integer (big-endian byte order).
    ///
    /// Mostly useful in tests, where `from_u128(1) < from_u128(2)` gives a
    /// predictable ordering.
    #[must_use]
    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The 16-byte big-endian wire form.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<[u8; 16]> for PartitionId {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_id_order_is_bytewise() {
        let a = PartitionId::from_u128(1);
        let b = PartitionId::from_u128(2);
        let c = PartitionId::from_u128(0x0100_0000_0000_0000_0000_0000_0000_0000);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, PartitionId::from_bytes(*a.as_bytes()));
    }

    #[test]
    fn partition_id_display_is_hex() {
        let id = PartitionId::from_u128(0xdead_beef);
        let s = id.to_string();
        assert!(s.ends_with("deadbeef"));
        assert_eq!(s.len(), 36);
    }

    #[test]
    fn partition_id_nil_sorts_first() {
        assert!(PartitionId::nil() < PartitionId::from_u128(1));
    }
}
