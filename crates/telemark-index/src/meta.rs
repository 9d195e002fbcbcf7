//! The meta-index: partition synopses keyed by partition id, and the
//! expression-directed candidate lookup.
//!
//! The lookup result is the set of partitions that *might* contain events
//! satisfying the expression. It may contain false positives but never
//! false negatives, provided every synopsis honours its contract. Results
//! are always sorted ascending and duplicate-free; the combinators rely on
//! that invariant, so every leaf that assembles a result directly must
//! re-establish it.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::json;
use telemark_ast::{Expression, Extractor, MetaKind, Predicate};
use telemark_error::{Result, TelemarkError};
use telemark_types::{evaluate, Data, PartitionId, QualifiedField, RelOp, TypeKind};
use tracing::{debug, error, trace, warn};

use crate::metrics::{IndexMetrics, IndexMetricsSnapshot};
use crate::partition::PartitionSynopsis;
use crate::set_ops;

/// How much detail [`MetaIndex::status`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVerbosity {
    /// Aggregate partition count and memory usage.
    Info,
    /// Additionally, one entry per partition.
    Debug,
}

/// The first index every query hits: maps partition ids to their synopses
/// and prunes the partition set for an expression.
#[derive(Debug, Default)]
pub struct MetaIndex {
    synopses: BTreeMap<PartitionId, PartitionSynopsis>,
    metrics: IndexMetrics,
}

impl MetaIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            synopses: BTreeMap::new(),
            metrics: IndexMetrics::new(),
        }
    }

    // -- state transitions --------------------------------------------------

    /// Insert or replace the synopsis for a partition. Ownership transfers
    /// to the meta-index; the synopsis is never mutated afterwards.
    pub fn merge(&mut self, id: PartitionId, synopsis: PartitionSynopsis) {
        self.metrics.record_merge();
        self.synopses.insert(id, synopsis);
    }

    /// Merge a batch of partitions, equivalent to a sequence of [`merge`]
    /// calls in iteration order. Used when rebuilding state at startup.
    ///
    /// [`merge`]: Self::merge
    pub fn merge_bulk(
        &mut self,
        synopses: impl IntoIterator<Item = (PartitionId, PartitionSynopsis)>,
    ) {
        for (id, synopsis) in synopses {
            self.merge(id, synopsis);
        }
    }

    /// Remove a partition. Absent ids are a no-op.
    pub fn erase(&mut self, id: &PartitionId) {
        if self.synopses.remove(id).is_some() {
            self.metrics.record_erase();
        }
    }

    /// The synopsis of a specific partition. Most callers want
    /// [`lookup`](Self::lookup) instead.
    #[must_use]
    pub fn at(&self, id: &PartitionId) -> Option<&PartitionSynopsis> {
        self.synopses.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.synopses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.synopses.is_empty()
    }

    // -- telemetry ----------------------------------------------------------

    /// Best-effort estimate of the memory used by all partition synopses.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.synopses
            .values()
            .map(PartitionSynopsis::memory_usage)
            .sum()
    }

    /// A nested key/value status document.
    #[must_use]
    pub fn status(&self, verbosity: StatusVerbosity) -> serde_json::Value {
        let mut doc = json!({
            "partitions": self.synopses.len(),
            "memory_bytes": self.memory_usage(),
        });
        if verbosity == StatusVerbosity::Debug {
            let detail: serde_json::Map<String, serde_json::Value> = self
                .synopses
                .iter()
                .map(|(id, synopsis)| {
                    (
                        id.to_string(),
                        json!({
                            "memory_bytes": synopsis.memory_usage(),
                            "fields": synopsis.num_fields(),
                        }),
                    )
                })
                .collect();
            doc["partitions_detail"] = serde_json::Value::Object(detail);
        }
        doc
    }

    /// Point-in-time operation counters.
    #[must_use]
    pub fn metrics(&self) -> IndexMetricsSnapshot {
        self.metrics.snapshot()
    }

    // -- lookup -------------------------------------------------------------

    /// Candidate partition ids for an expression: sorted ascending,
    /// duplicate-free, complete (no false negatives).
    ///
    /// The only error is an invalid (nil) expression; diagnostic conditions
    /// such as unsupported predicate shapes are logged and widened to a
    /// sound over-approximation instead.
    pub fn lookup(&self, expr: &Expression) -> Result<Vec<PartitionId>> {
        let start = Instant::now();
        let mut memoized = Vec::new();
        let result = self.lookup_impl(expr, &mut memoized)?;
        debug_assert!(set_ops::is_sorted_unique(&result));
        debug!(
            target: "telemark.index",
            candidates = result.len(),
            partitions = self.synopses.len(),
            elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            "lookup complete"
        );
        self.metrics.record_lookup(result.len());
        Ok(result)
    }

    fn lookup_impl(
        &self,
        expr: &Expression,
        memoized: &mut Vec<PartitionId>,
    ) -> Result<Vec<PartitionId>> {
        match expr {
            Expression::Conjunction(children) => {
                debug_assert!(!children.is_empty(), "conjunction without children");
                let mut iter = children.iter();
                let Some(first) = iter.next() else {
                    return Ok(self.all_partitions(memoized));
                };
                let mut result = self.lookup_impl(first, memoized)?;
                if !result.is_empty() {
                    for child in iter {
                        let xs = self.lookup_impl(child, memoized)?;
                        if xs.is_empty() {
                            return Ok(xs); // short-circuit
                        }
                        set_ops::inplace_intersect(&mut result, &xs);
                        debug_assert!(set_ops::is_sorted_unique(&result));
                    }
                }
                Ok(result)
            }
            Expression::Disjunction(children) => {
                debug_assert!(!children.is_empty(), "disjunction without children");
                let mut result = Vec::new();
                for child in children {
                    let xs = self.lookup_impl(child, memoized)?;
                    debug_assert!(set_ops::is_sorted_unique(&xs));
                    if xs.len() == self.synopses.len() {
                        return Ok(xs); // already the universe
                    }
                    set_ops::inplace_unify(&mut result, &xs);
                    debug_assert!(set_ops::is_sorted_unique(&result));
                }
                Ok(result)
            }
            Expression::Negation(_) => {
                // A synopsis may answer with false positives; negating such
                // an answer would turn them into false negatives. Widen to
                // every partition instead of descending.
                Ok(self.all_partitions(memoized))
            }
            Expression::Predicate(predicate) => Ok(self.lookup_predicate(predicate, memoized)),
            Expression::Nil => {
                error!(target: "telemark.index", "lookup received an empty expression");
                debug_assert!(false, "invalid expression");
                Err(TelemarkError::InvalidExpression)
            }
        }
    }

    /// Every partition id, sorted; memoised across one lookup call because
    /// several leaves may widen to the universe.
    fn all_partitions(&self, memoized: &mut Vec<PartitionId>) -> Vec<PartitionId> {
        if memoized.is_empty() && !self.synopses.is_empty() {
            memoized.extend(self.synopses.keys().copied());
        }
        memoized.clone()
    }

    fn lookup_predicate(
        &self,
        predicate: &Predicate,
        memoized: &mut Vec<PartitionId>,
    ) -> Vec<PartitionId> {
        match &predicate.lhs {
            Extractor::Meta(MetaKind::Type) => {
                // Type queries need no synopsis, just the layout names.
                let mut result = Vec::new();
                for (id, synopsis) in &self.synopses {
                    for (field, _) in synopsis.fields() {
                        let layout = Data::String(field.layout_name().to_owned());
                        if evaluate(&layout, predicate.op, &predicate.rhs) {
                            result.push(*id);
                            break;
                        }
                    }
                }
                result.sort_unstable();
                result
            }
            Extractor::Meta(MetaKind::Field) => {
                let Data::String(suffix) = &predicate.rhs else {
                    warn!(
                        target: "telemark.index",
                        predicate = %predicate,
                        "#field meta queries only support string comparisons"
                    );
                    return Vec::new();
                };
                let mut result = Vec::new();
                for (id, synopsis) in &self.synopses {
                    let matching = synopsis
                        .fields()
                        .any(|(field, _)| field.fqn().ends_with(suffix.as_str()));
                    // Include the partition when the polarity of the
                    // operator agrees with the match.
                    if !predicate.op.is_negated() == matching {
                        result.push(*id);
                    }
                }
                result.sort_unstable();
                result
            }
            Extractor::Field(name) => self.search(predicate, |field| {
                field.fqn().ends_with(name.as_str())
            }),
            Extractor::Type(ty) => {
                let mut result = if ty.name().is_empty() {
                    debug_assert!(!matches!(ty.kind(), TypeKind::None));
                    self.search(predicate, |field| {
                        field.ty().congruent(ty) && field.ty().name().is_empty()
                    })
                } else {
                    self.search(predicate, |field| field.ty().name() == ty.name())
                };
                // Compatibility with databases created before the
                // #timestamp attribute was folded into the type name.
                if ty.name() == "timestamp" {
                    let tagged =
                        self.search(predicate, |field| field.ty().has_attribute("timestamp"));
                    set_ops::inplace_unify(&mut result, &tagged);
                }
                result
            }
            Extractor::Column { .. } => {
                warn!(
                    target: "telemark.index",
                    predicate = %predicate,
                    "cannot process predicate"
                );
                self.all_partitions(memoized)
            }
        }
    }

    /// Consult the synopses of every field accepted by `matches`.
    ///
    /// Per matching field, priority order: the field's own synopsis, else
    /// the per-type fallback for the stripped field type, else the
    /// partition cannot be ruled out. A `Some(false)` probe rejects only
    /// that field; any other answer selects the partition.
    fn search(
        &self,
        predicate: &Predicate,
        matches: impl Fn(&QualifiedField) -> bool,
    ) -> Vec<PartitionId> {
        let mut result = Vec::new();
        for (id, partition) in &self.synopses {
            'fields: for (field, synopsis) in partition.fields() {
                if !matches(field) {
                    continue;
                }
                let effective = match synopsis {
                    Some(synopsis) => Some(synopsis),
                    None => partition.type_synopsis(field.ty()),
                };
                match effective {
                    Some(synopsis) => {
                        match synopsis.lookup(predicate.op, &predicate.rhs) {
                            Some(false) => continue 'fields,
                            _ => {
                                trace!(
                                    target: "telemark.index",
                                    partition = %id,
                                    predicate = %predicate,
                                    "selected candidate"
                                );
                                result.push(*id);
                                break 'fields;
                            }
                        }
                    }
                    None => {
                        // No synopsis can rule this partition out.
                        result.push(*id);
                        break 'fields;
                    }
                }
            }
        }
        debug!(
            target: "telemark.index",
            checked = self.synopses.len(),
            predicate = %predicate,
            results = result.len(),
            "predicate scan finished"
        );
        result.sort_unstable();
        result
    }
}

// Convenience passthrough so callers can probe a single op/value pair the
// way the scenario in the query pipeline does.
impl MetaIndex {
    /// Shorthand for a single-predicate lookup.
    pub fn lookup_predicate_expr(
        &self,
        lhs: Extractor,
        op: RelOp,
        rhs: impl Into<Data>,
    ) -> Result<Vec<PartitionId>> {
        self.lookup(&Expression::predicate(lhs, op, rhs))
    }
}
