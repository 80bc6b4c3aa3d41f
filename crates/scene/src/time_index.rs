use foundation::{Period, PeriodError, PeriodSpan};

use crate::series::SeriesStore;

/// Ordered, duplicate-free sequence of periods selectable by the scrubber.
///
/// Built once after data load and immutable afterwards. Index `i` is the
/// scrubber position; `periods()[i] < periods()[i + 1]` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeIndex {
    periods: Vec<Period>,
}

impl TimeIndex {
    pub fn from_periods(periods: impl IntoIterator<Item = Period>) -> Self {
        let mut periods: Vec<Period> = periods.into_iter().collect();
        periods.sort_unstable();
        periods.dedup();
        Self { periods }
    }

    pub fn from_store(store: &SeriesStore) -> Self {
        Self::from_periods(store.periods())
    }

    /// Every year in `start..=end`, independent of which years carry data.
    pub fn years(start: i32, end: i32) -> Result<Self, PeriodError> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let periods = (lo..=hi).map(Period::year).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { periods })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn get(&self, index: usize) -> Option<Period> {
        self.periods.get(index).copied()
    }

    pub fn first(&self) -> Option<Period> {
        self.periods.first().copied()
    }

    pub fn last(&self) -> Option<Period> {
        self.periods.last().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.periods.len().checked_sub(1)
    }

    pub fn position(&self, period: Period) -> Option<usize> {
        self.periods.binary_search(&period).ok()
    }

    /// Index of the last period `<= period`.
    pub fn floor_index(&self, period: Period) -> Option<usize> {
        self.periods
            .partition_point(|p| *p <= period)
            .checked_sub(1)
    }

    pub fn span(&self) -> Option<PeriodSpan> {
        Some(PeriodSpan::new(self.first()?, self.last()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = Period> + '_ {
        self.periods.iter().copied()
    }
}
