//! The Telemark meta-index: partition-level pruning for expression queries.
//!
//! Ingestion summarises each sealed partition into a [`PartitionSynopsis`]
//! and merges it here. A query arrives as an expression; [`MetaIndex::lookup`]
//! walks it and consults the per-field synopses to return the candidate
//! partitions that might contain matching events: possibly too many, never
//! too few.
//!
//! The crate exposes the state machine directly ([`MetaIndex`]) and as a
//! mailbox-backed instance on its own thread ([`MetaIndexHandle`]).

pub mod bloom;
pub mod mailbox;
pub mod meta;
pub mod metrics;
pub mod minmax;
pub mod partition;
mod set_ops;
pub mod synopsis;
pub mod tally;

pub use bloom::BloomSynopsis;
pub use mailbox::MetaIndexHandle;
pub use meta::{MetaIndex, StatusVerbosity};
pub use metrics::{IndexMetrics, IndexMetricsSnapshot};
pub use minmax::MinMaxSynopsis;
pub use partition::PartitionSynopsis;
pub use synopsis::{Synopsis, SynopsisOptions};
pub use tally::BoolSynopsis;
