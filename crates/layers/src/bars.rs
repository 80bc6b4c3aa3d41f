use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub category: String,
    pub total: f64,
}

/// Sums values per category, largest first. Equal totals are ordered by name.
/// Non-finite values are ignored.
pub fn rollup_sum<K: AsRef<str>>(rows: impl IntoIterator<Item = (K, f64)>) -> Vec<Bar> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (category, value) in rows {
        if !value.is_finite() {
            continue;
        }
        *totals.entry(category.as_ref().to_string()).or_default() += value;
    }

    let mut bars: Vec<Bar> = totals
        .into_iter()
        .map(|(category, total)| Bar { category, total })
        .collect();
    // BTreeMap order is by name, so a stable sort keeps ties alphabetical.
    bars.sort_by(|a, b| b.total.total_cmp(&a.total));
    bars
}
