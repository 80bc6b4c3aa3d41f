use serde::{Deserialize, Serialize};

use crate::period::Period;

/// Inclusive range of periods.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpan {
    pub start: Period,
    pub end: Period,
}

impl PeriodSpan {
    pub fn new(start: Period, end: Period) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn instant(p: Period) -> Self {
        Self { start: p, end: p }
    }

    pub fn contains(&self, p: Period) -> bool {
        p >= self.start && p <= self.end
    }

    pub fn intersects(&self, other: &PeriodSpan) -> bool {
        !(self.end < other.start || other.end < self.start)
    }
}
