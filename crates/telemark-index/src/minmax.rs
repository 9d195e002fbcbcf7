//! Min/max range synopsis for ordered types.

use std::cmp::Ordering;

use telemark_types::{Data, RelOp, Type};

/// Tracks the observed `[lo, hi]` range of one ordered field.
///
/// Comparisons between the probe and the bounds go through the
/// numeric-transparent partial order of [`Data`], so an integer probe
/// against a count range compares correctly without conversion.
#[derive(Debug, Clone)]
pub struct MinMaxSynopsis {
    ty: Type,
    bounds: Option<(Data, Data)>,
}

impl MinMaxSynopsis {
    #[must_use]
    pub const fn new(ty: Type) -> Self {
        Self { ty, bounds: None }
    }

    /// The type of the values this synopsis summarises.
    #[must_use]
    pub const fn value_type(&self) -> &Type {
        &self.ty
    }

    /// The observed bounds, if any value has been added.
    #[must_use]
    pub const fn bounds(&self) -> Option<&(Data, Data)> {
        self.bounds.as_ref()
    }

    pub fn add(&mut self, value: &Data) {
        match &mut self.bounds {
            None => self.bounds = Some((value.clone(), value.clone())),
            Some((lo, hi)) => {
                if matches!(value.partial_cmp(lo), Some(Ordering::Less)) {
                    *lo = value.clone();
                }
                if matches!(value.partial_cmp(hi), Some(Ordering::Greater)) {
                    *hi = value.clone();
                }
            }
        }
    }

    /// Probe the range. `Some(false)` is definitive, `Some(true)` means all
    /// observed values satisfy the comparison, `None` means the range
    /// overlaps the probe and per-value knowledge is needed.
    #[must_use]
    pub fn lookup(&self, op: RelOp, probe: &Data) -> Option<bool> {
        let Some((lo, hi)) = &self.bounds else {
            // Nothing was observed, so nothing can satisfy the comparison.
            return match op {
                RelOp::Equal
                | RelOp::Less
                | RelOp::LessEqual
                | RelOp::Greater
                | RelOp::GreaterEqual => Some(false),
                _ => None,
            };
        };
        let lo_cmp = lo.partial_cmp(probe)?;
        let hi_cmp = hi.partial_cmp(probe)?;
        match op {
            RelOp::Equal => {
                if lo_cmp == Ordering::Greater || hi_cmp == Ordering::Less {
                    Some(false)
                } else {
                    None
                }
            }
            RelOp::Less => {
                if lo_cmp != Ordering::Less {
                    Some(false)
                } else if hi_cmp == Ordering::Less {
                    Some(true)
                } else {
                    None
                }
            }
            RelOp::LessEqual => {
                if lo_cmp == Ordering::Greater {
                    Some(false)
                } else if hi_cmp != Ordering::Greater {
                    Some(true)
                } else {
                    None
                }
            }
            RelOp::Greater => {
                if hi_cmp != Ordering::Greater {
                    Some(false)
                } else if lo_cmp == Ordering::Greater {
                    Some(true)
                } else {
                    None
                }
            }
            RelOp::GreaterEqual => {
                if hi_cmp == Ordering::Less {
                    Some(false)
                } else if lo_cmp != Ordering::Less {
                    Some(true)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Best-effort estimate of the retained bytes.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}
