use std::collections::BTreeMap;

use foundation::{EntityKey, Period};
use serde::{Deserialize, Serialize};

/// One parsed datum: `value` of `key` during `period`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub period: Period,
    pub key: EntityKey,
    pub value: f64,
}

impl Observation {
    pub fn new(period: Period, key: impl Into<EntityKey>, value: f64) -> Self {
        Self {
            period,
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub period: Period,
    pub value: f64,
}

/// How a layer picks an entity's value for a target period.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Most recent record with `period <= target`.
    #[default]
    LatestAsOf,
    /// Only a record at exactly `target`.
    Exact,
}

/// Per-entity time series, sorted by period with one authoritative sample
/// per `(period, entity)`.
///
/// Construction rules:
/// - non-finite values are missing data and never stored;
/// - for duplicate `(period, entity)` pairs the last one in input order wins.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SeriesStore {
    series: BTreeMap<EntityKey, Vec<Sample>>,
    dropped_non_finite: usize,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut grouped: BTreeMap<EntityKey, Vec<Sample>> = BTreeMap::new();
        let mut dropped = 0usize;
        for obs in observations {
            if !obs.value.is_finite() {
                dropped += 1;
                continue;
            }
            grouped.entry(obs.key).or_default().push(Sample {
                period: obs.period,
                value: obs.value,
            });
        }

        let mut series = BTreeMap::new();
        for (key, mut samples) in grouped {
            // Stable: equal periods keep input order, so the last one overwrites.
            samples.sort_by_key(|s| s.period);
            let mut deduped: Vec<Sample> = Vec::with_capacity(samples.len());
            for s in samples {
                match deduped.last_mut() {
                    Some(last) if last.period == s.period => *last = s,
                    _ => deduped.push(s),
                }
            }
            series.insert(key, deduped);
        }

        if dropped > 0 {
            tracing::debug!("series store dropped {dropped} non-finite values");
        }

        Self {
            series,
            dropped_non_finite: dropped,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.series.len()
    }

    pub fn record_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn dropped_non_finite(&self) -> usize {
        self.dropped_non_finite
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.series.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.series.contains_key(key)
    }

    /// The full sorted series of one entity (empty if unknown).
    pub fn series(&self, key: &str) -> &[Sample] {
        self.series.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.series.values().flatten().map(|s| s.period)
    }

    /// Latest known value as of `target`.
    pub fn latest_as_of(&self, key: &str, target: Period) -> Option<Sample> {
        let series = self.series.get(key)?;
        let n = series.partition_point(|s| s.period <= target);
        n.checked_sub(1).map(|i| series[i])
    }

    pub fn value_at(&self, key: &str, period: Period) -> Option<Sample> {
        let series = self.series.get(key)?;
        series
            .binary_search_by_key(&period, |s| s.period)
            .ok()
            .map(|i| series[i])
    }

    pub fn lookup(&self, key: &str, target: Period, mode: QueryMode) -> Option<Sample> {
        match mode {
            QueryMode::LatestAsOf => self.latest_as_of(key, target),
            QueryMode::Exact => self.value_at(key, target),
        }
    }

    /// Value of every entity that has one at `target`, in key order.
    pub fn snapshot(&self, target: Period, mode: QueryMode) -> Vec<(&EntityKey, Sample)> {
        self.series
            .keys()
            .filter_map(|k| self.lookup(k.as_str(), target, mode).map(|s| (k, s)))
            .collect()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.series
            .values()
            .flatten()
            .map(|s| s.value)
            .reduce(f64::max)
    }

    pub fn min_value(&self) -> Option<f64> {
        self.series
            .values()
            .flatten()
            .map(|s| s.value)
            .reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::{Observation, QueryMode, SeriesStore};
    use foundation::Period;

    fn p(s: &str) -> Period {
        Period::parse(s).unwrap()
    }

    fn obs(period: &str, key: &str, value: f64) -> Observation {
        Observation::new(p(period), key, value)
    }

    /// Unindexed scan: the reference the indexed lookup must agree with.
    fn scan(observations: &[Observation], key: &str, target: Period) -> Option<f64> {
        let mut best: Option<&Observation> = None;
        for o in observations {
            if o.key.as_str() != key || o.period > target || !o.value.is_finite() {
                continue;
            }
            if best.is_none_or(|b| o.period >= b.period) {
                best = Some(o);
            }
        }
        best.map(|o| o.value)
    }

    #[test]
    fn latest_as_of_matches_worked_example() {
        let store = SeriesStore::from_observations(vec![
            obs("2007-01", "US", 10.0),
            obs("2007-03", "US", 30.0),
        ]);
        assert_eq!(store.latest_as_of("US", p("2007-02")).map(|s| s.value), Some(10.0));
        assert_eq!(store.latest_as_of("US", p("2007-03")).map(|s| s.value), Some(30.0));
        assert_eq!(store.latest_as_of("US", p("2006-12")), None);
        assert_eq!(store.latest_as_of("FR", p("2007-03")), None);
    }

    #[test]
    fn exact_mode_ignores_earlier_records() {
        let store = SeriesStore::from_observations(vec![obs("2007-01", "US", 10.0)]);
        assert_eq!(store.lookup("US", p("2007-02"), QueryMode::Exact), None);
        assert_eq!(
            store.lookup("US", p("2007-01"), QueryMode::Exact).map(|s| s.value),
            Some(10.0)
        );
    }

    #[test]
    fn duplicate_period_last_in_input_order_wins() {
        let store = SeriesStore::from_observations(vec![
            obs("2008-05", "1|2", 5.0),
            obs("2008-01", "1|2", 1.0),
            obs("2008-05", "1|2", 7.0),
        ]);
        assert_eq!(store.series("1|2").len(), 2);
        assert_eq!(store.value_at("1|2", p("2008-05")).map(|s| s.value), Some(7.0));
    }

    #[test]
    fn non_finite_values_are_missing() {
        let store = SeriesStore::from_observations(vec![
            obs("2001", "Chad", 4.0),
            obs("2002", "Chad", f64::NAN),
        ]);
        assert_eq!(store.dropped_non_finite(), 1);
        assert_eq!(store.lookup("Chad", p("2002"), QueryMode::Exact), None);
        assert_eq!(
            store.latest_as_of("Chad", p("2002")).map(|s| s.value),
            Some(4.0)
        );
    }

    #[test]
    fn indexed_lookup_agrees_with_scan() {
        let observations = vec![
            obs("2007-03", "A", 3.0),
            obs("2007-01", "A", 1.0),
            obs("2007-02", "B", 2.0),
            obs("2007-05", "B", f64::NAN),
            obs("2007-04", "A", 4.0),
            obs("2007-04", "A", 44.0),
            obs("2007-06", "B", 6.0),
        ];
        let store = SeriesStore::from_observations(observations.clone());
        for month in 1..=8 {
            let target = Period::month(2007, month).unwrap();
            for key in ["A", "B", "C"] {
                assert_eq!(
                    store.latest_as_of(key, target).map(|s| s.value),
                    scan(&observations, key, target),
                    "key={key} target={target}"
                );
            }
        }
    }

    #[test]
    fn snapshot_and_extents() {
        let store = SeriesStore::from_observations(vec![
            obs("2000", "A", 2.0),
            obs("2001", "B", 9.0),
        ]);
        let snap = store.snapshot(p("2000"), QueryMode::LatestAsOf);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0.as_str(), "A");
        assert_eq!(store.max_value(), Some(9.0));
        assert_eq!(store.min_value(), Some(2.0));
        assert_eq!(store.record_count(), 2);
    }
}
