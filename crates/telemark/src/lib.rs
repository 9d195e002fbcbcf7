//! Telemark: the partition-pruning core of a security-telemetry engine.
//!
//! Telemetry events are ingested into immutable columnar partitions, each
//! summarised by a partition synopsis with bounded false positives and no
//! false negatives. Queries funnel through the meta-index, which prunes the
//! partition set for an expression before anything is loaded from disk.
//!
//! This crate re-exports the public API of the workspace:
//!
//! ```
//! use telemark::{
//!     Data, Expression, Extractor, MetaIndex, PartitionId, PartitionSynopsis,
//!     QualifiedField, RelOp, Synopsis, SynopsisOptions, Type,
//! };
//!
//! let mut index = MetaIndex::new();
//! let ty = Type::count();
//! let mut partition = PartitionSynopsis::new();
//! let mut ports = Synopsis::for_type(&ty, &SynopsisOptions::default()).unwrap();
//! ports.add(&Data::Count(443));
//! partition.put_field(QualifiedField::new("conn", "orig_p", ty), Some(ports));
//! index.merge(PartitionId::from_u128(1), partition);
//!
//! let expr = Expression::predicate(Extractor::field("orig_p"), RelOp::Equal, 443u64);
//! assert_eq!(index.lookup(&expr).unwrap(), vec![PartitionId::from_u128(1)]);
//! ```

pub use telemark_ast::{Expression, Extractor, MetaKind, Predicate};
pub use telemark_error::{Result, TelemarkError};
pub use telemark_index::{
    BloomSynopsis, BoolSynopsis, IndexMetricsSnapshot, MetaIndex, MetaIndexHandle,
    MinMaxSynopsis, PartitionSynopsis, StatusVerbosity, Synopsis, SynopsisOptions,
};
pub use telemark_types::{
    evaluate, Data, PartitionId, Pattern, PatternKind, Port, PortProtocol, QualifiedField,
    RecordField, RelOp, Schema, Subnet, Type, TypeKind,
};
