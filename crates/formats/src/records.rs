use std::collections::BTreeMap;
use std::path::PathBuf;

use foundation::{Granularity, Period};
use scene::Observation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;
use crate::source::LoadStats;
use crate::values::json_number;

fn default_key_field() -> String {
    "state".to_string()
}

fn default_values_field() -> String {
    "values".to_string()
}

/// `[{ "state": "Ohio", "values": { "2008-01": 1.2, ... } }, ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateJsonSpec {
    pub path: PathBuf,
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default = "default_values_field")]
    pub values_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendsJsonSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub granularity: Option<Granularity>,
}

pub fn read_state_json(
    spec: &StateJsonSpec,
    bytes: &[u8],
) -> Result<(Vec<Observation>, LoadStats), LoadError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let entries = root
        .as_array()
        .ok_or_else(|| LoadError::Shape("expected a JSON array of entities".to_string()))?;

    let mut out = Vec::new();
    let mut stats = LoadStats::default();
    for (index, entry) in entries.iter().enumerate() {
        stats.rows += 1;
        let key = entry
            .get(&spec.key_field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty());
        let values = entry.get(&spec.values_field).and_then(Value::as_object);
        let (Some(key), Some(values)) = (key, values) else {
            tracing::warn!("entry {index}: missing {:?} or {:?}", spec.key_field, spec.values_field);
            stats.skipped_rows += 1;
            continue;
        };

        for (date, value) in values {
            let Ok(period) = Period::parse(date) else {
                tracing::warn!("entry {index}: unparseable period {date:?}");
                stats.missing_values += 1;
                continue;
            };
            match json_number(value) {
                Some(v) => out.push(Observation::new(period, key, v)),
                None => stats.missing_values += 1,
            }
        }
    }

    Ok((out, stats))
}

/// Keyword search-interest document.
///
/// `keywords[word][i]` is the interest in `word` at `dates[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendsDocument {
    pub dates: Vec<String>,
    pub keywords: BTreeMap<String, Vec<Option<f64>>>,
    #[serde(default)]
    pub averages: BTreeMap<String, f64>,
    #[serde(default)]
    pub is_crisis_related: BTreeMap<String, u8>,
}

impl TrendsDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let doc: TrendsDocument = serde_json::from_slice(bytes)?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), LoadError> {
        for (word, values) in &self.keywords {
            if values.len() != self.dates.len() {
                return Err(LoadError::Shape(format!(
                    "keyword {word:?} has {} values for {} dates",
                    values.len(),
                    self.dates.len()
                )));
            }
        }
        Ok(())
    }

    /// Stored average, or the mean of the finite values when absent.
    pub fn average(&self, word: &str) -> Option<f64> {
        if let Some(avg) = self.averages.get(word).filter(|a| a.is_finite()) {
            return Some(*avg);
        }
        let values = self.keywords.get(word)?;
        let finite: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }

    pub fn value(&self, word: &str, index: usize) -> Option<f64> {
        self.keywords
            .get(word)?
            .get(index)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn is_flagged(&self, word: &str) -> bool {
        self.is_crisis_related.get(word).is_some_and(|f| *f != 0)
    }

    /// Date labels parsed as periods; unparseable dates are `None`.
    pub fn periods(&self, granularity: Option<Granularity>) -> Vec<Option<Period>> {
        self.dates
            .iter()
            .map(|d| match granularity {
                Some(g) => Period::parse_as(d, g).ok(),
                None => Period::parse(d).ok(),
            })
            .collect()
    }

    pub fn observations(&self, granularity: Option<Granularity>) -> (Vec<Observation>, LoadStats) {
        let periods = self.periods(granularity);
        let mut out = Vec::new();
        let mut stats = LoadStats {
            rows: self.dates.len(),
            skipped_rows: periods.iter().filter(|p| p.is_none()).count(),
            missing_values: 0,
        };
        for (word, values) in &self.keywords {
            for (period, value) in periods.iter().zip(values) {
                let Some(period) = period else {
                    continue;
                };
                match value.filter(|v| v.is_finite()) {
                    Some(v) => out.push(Observation::new(*period, word.as_str(), v)),
                    None => stats.missing_values += 1,
                }
            }
        }
        (out, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::{StateJsonSpec, TrendsDocument, read_state_json};
    use crate::error::LoadError;
    use foundation::{Granularity, Period};

    fn p(s: &str) -> Period {
        Period::parse(s).unwrap()
    }

    #[test]
    fn reads_state_values() {
        let spec = StateJsonSpec {
            path: "delinquency.json".into(),
            key_field: "state".into(),
            values_field: "values".into(),
        };
        let json = r#"[
            {"state": "Ohio", "values": {"2008-01": 1.5, "2008-02": null, "junk": 3}},
            {"state": "Iowa", "values": {"2008-01": "0.75"}},
            {"values": {"2008-01": 9}}
        ]"#;
        let (obs, stats) = read_state_json(&spec, json.as_bytes()).unwrap();
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().any(|o| o.key.as_str() == "Iowa" && o.value == 0.75));
        assert!(obs.iter().all(|o| o.period == p("2008-01")));
        assert_eq!(stats.skipped_rows, 1);
        assert_eq!(stats.missing_values, 2);
    }

    #[test]
    fn state_json_must_be_an_array() {
        let spec = StateJsonSpec {
            path: "x.json".into(),
            key_field: "state".into(),
            values_field: "values".into(),
        };
        assert!(matches!(
            read_state_json(&spec, br#"{"state": "Ohio"}"#),
            Err(LoadError::Shape(_))
        ));
    }

    fn trends() -> TrendsDocument {
        TrendsDocument::from_slice(
            br#"{
                "dates": ["2008-09-07", "2008-09-14", "2008-10-05"],
                "keywords": {"recession": [10, 30, null], "weather": [50, 50, 50]},
                "averages": {"recession": 20.0},
                "is_crisis_related": {"recession": 1, "weather": 0}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn trends_document_accessors() {
        let doc = trends();
        assert_eq!(doc.average("recession"), Some(20.0));
        assert_eq!(doc.average("weather"), Some(50.0));
        assert_eq!(doc.value("recession", 2), None);
        assert_eq!(doc.value("recession", 1), Some(30.0));
        assert!(doc.is_flagged("recession"));
        assert!(!doc.is_flagged("weather"));
    }

    #[test]
    fn trends_observations_at_month_granularity_keep_last_week() {
        let doc = trends();
        let (obs, stats) = doc.observations(Some(Granularity::Month));
        assert_eq!(stats.missing_values, 1);
        let store = scene::SeriesStore::from_observations(obs);
        assert_eq!(store.value_at("recession", p("2008-09")).map(|s| s.value), Some(30.0));
    }

    #[test]
    fn ragged_keyword_series_are_rejected() {
        let err = TrendsDocument::from_slice(br#"{"dates": ["2008-01-01"], "keywords": {"a": [1, 2]}}"#)
            .unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
    }
}
