use std::path::PathBuf;

use foundation::{EntityKey, Granularity, Period};
use scene::Observation;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::source::LoadStats;
use crate::values::parse_number;

fn default_delimiter() -> char {
    ','
}

fn default_granularity() -> Granularity {
    Granularity::Month
}

/// How the entity key of a row is formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyColumns {
    /// Keyed by coordinates: `"{lat}|{lon}"`.
    LatLon { lat: String, lon: String },
    Column { column: String },
}

/// One observation per row (date, key, value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongCsvSpec {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    pub period_column: String,
    pub key: KeyColumns,
    pub value_column: String,
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
}

/// One row per entity, one column per period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideCsvSpec {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    pub key_column: String,
    /// Coerce period headers to this granularity; keep header precision if unset.
    #[serde(default)]
    pub granularity: Option<Granularity>,
}

fn reader(delimiter: char, bytes: &[u8]) -> Result<csv::Reader<&[u8]>, LoadError> {
    if !delimiter.is_ascii() {
        return Err(LoadError::Shape(format!(
            "delimiter must be a single ASCII character, got {delimiter:?}"
        )));
    }
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes))
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h.trim_matches('"') == column)
        .ok_or_else(|| LoadError::MissingColumn {
            column: column.to_string(),
        })
}

enum KeyIndex {
    LatLon(usize, usize),
    Column(usize),
}

pub fn read_long_csv(
    spec: &LongCsvSpec,
    bytes: &[u8],
) -> Result<(Vec<Observation>, LoadStats), LoadError> {
    let mut rdr = reader(spec.delimiter, bytes)?;
    let headers = rdr.headers()?.clone();
    let period_idx = column_index(&headers, &spec.period_column)?;
    let value_idx = column_index(&headers, &spec.value_column)?;
    let key_idx = match &spec.key {
        KeyColumns::LatLon { lat, lon } => {
            KeyIndex::LatLon(column_index(&headers, lat)?, column_index(&headers, lon)?)
        }
        KeyColumns::Column { column } => KeyIndex::Column(column_index(&headers, column)?),
    };

    let mut out = Vec::new();
    let mut stats = LoadStats::default();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        stats.rows += 1;

        let Some(period) = record
            .get(period_idx)
            .and_then(|c| Period::parse_as(c, spec.granularity).ok())
        else {
            tracing::warn!("row {row}: unparseable period, skipped");
            stats.skipped_rows += 1;
            continue;
        };

        let key = match key_idx {
            KeyIndex::Column(i) => record
                .get(i)
                .map(|c| c.trim_matches('"').trim())
                .filter(|c| !c.is_empty())
                .map(EntityKey::from),
            KeyIndex::LatLon(lat, lon) => {
                let lat = record.get(lat).and_then(parse_number);
                let lon = record.get(lon).and_then(parse_number);
                lat.zip(lon).map(|(lat, lon)| EntityKey::from_lat_lon(lat, lon))
            }
        };
        let Some(key) = key else {
            tracing::warn!("row {row}: missing entity key, skipped");
            stats.skipped_rows += 1;
            continue;
        };

        match record.get(value_idx).and_then(parse_number) {
            Some(value) => out.push(Observation {
                period,
                key,
                value,
            }),
            None => stats.missing_values += 1,
        }
    }

    Ok((out, stats))
}

pub fn read_wide_csv(
    spec: &WideCsvSpec,
    bytes: &[u8],
) -> Result<(Vec<Observation>, LoadStats), LoadError> {
    let mut rdr = reader(spec.delimiter, bytes)?;
    let headers = rdr.headers()?.clone();
    let key_idx = column_index(&headers, &spec.key_column)?;

    let period_columns: Vec<(usize, Period)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_idx)
        .filter_map(|(i, h)| {
            let h = h.trim_matches('"');
            let p = match spec.granularity {
                Some(g) => Period::parse_as(h, g),
                None => Period::parse(h),
            };
            p.ok().map(|p| (i, p))
        })
        .collect();
    if period_columns.is_empty() {
        return Err(LoadError::Shape(format!(
            "no period columns next to key column {:?}",
            spec.key_column
        )));
    }

    let mut out = Vec::new();
    let mut stats = LoadStats::default();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        stats.rows += 1;
        let Some(key) = record
            .get(key_idx)
            .map(|c| c.trim_matches('"').trim())
            .filter(|c| !c.is_empty())
        else {
            tracing::warn!("row {row}: missing entity key, skipped");
            stats.skipped_rows += 1;
            continue;
        };

        for (i, period) in &period_columns {
            match record.get(*i).and_then(parse_number) {
                Some(value) => out.push(Observation::new(*period, key, value)),
                None => stats.missing_values += 1,
            }
        }
    }

    Ok((out, stats))
}
