//! Boolean tally synopsis.

use telemark_types::{Data, RelOp};

/// Exact counts of observed `true` and `false` values for one bool field.
///
/// Unlike the probabilistic synopses, the tally is exact, so both equality
/// and inequality probes get definitive answers.
#[derive(Debug, Clone, Default)]
pub struct BoolSynopsis {
    trues: u64,
    falses: u64,
}

impl BoolSynopsis {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trues: 0,
            falses: 0,
        }
    }

    pub fn add(&mut self, value: &Data) {
        match value {
            Data::Bool(true) => self.trues += 1,
            Data::Bool(false) => self.falses += 1,
            _ => {}
        }
    }

    #[must_use]
    pub const fn trues(&self) -> u64 {
        self.trues
    }

    #[must_use]
    pub const fn falses(&self) -> u64 {
        self.falses
    }

    #[must_use]
    pub fn lookup(&self, op: RelOp, probe: &Data) -> Option<bool> {
        let Data::Bool(probe) = probe else {
            return None;
        };
        let (same, other) = if *probe {
            (self.trues, self.falses)
        } else {
            (self.falses, self.trues)
        };
        match op {
            RelOp::Equal => Some(same > 0),
            RelOp::NotEqual => Some(other > 0),
            _ => None,
        }
    }

    /// Best-effort estimate of the retained bytes.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_reflects_observed_values() {
        let mut tally = BoolSynopsis::new();
        tally.add(&Data::Bool(true));
        tally.add(&Data::Bool(true));
        assert_eq!(tally.lookup(RelOp::Equal, &Data::Bool(true)), Some(true));
        assert_eq!(tally.lookup(RelOp::Equal, &Data::Bool(false)), Some(false));
    }

    #[test]
    fn inequality_is_exact() {
        let mut tally = BoolSynopsis::new();
        tally.add(&Data::Bool(true));
        // No false was observed, so `!= true` has no witness.
        assert_eq!(tally.lookup(RelOp::NotEqual, &Data::Bool(true)), Some(false));
        assert_eq!(tally.lookup(RelOp::NotEqual, &Data::Bool(false)), Some(true));
    }

    #[test]
    fn empty_tally_rules_out_both() {
        let tally = BoolSynopsis::new();
        assert_eq!(tally.lookup(RelOp::Equal, &Data::Bool(true)), Some(false));
        assert_eq!(tally.lookup(RelOp::Equal, &Data::Bool(false)), Some(false));
    }

    #[test]
    fn non_bool_probes_and_operators_widen() {
        let mut tally = BoolSynopsis::new();
        tally.add(&Data::Bool(true));
        assert_eq!(tally.lookup(RelOp::Equal, &Data::Count(1)), None);
        assert_eq!(tally.lookup(RelOp::Less, &Data::Bool(true)), None);
    }

    #[test]
    fn non_bool_values_are_ignored_on_add() {
        let mut tally = BoolSynopsis::new();
        tally.add(&Data::Count(1));
        assert_eq!(tally.trues(), 0);
        assert_eq!(tally.falses(), 0);
    }
}
