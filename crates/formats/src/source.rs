use std::fs;
use std::path::{Path, PathBuf};

use scene::Observation;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::records::{StateJsonSpec, TrendsDocument, TrendsJsonSpec, read_state_json};
use crate::tabular::{LongCsvSpec, WideCsvSpec, read_long_csv, read_wide_csv};

/// A dataset source as written in a visualization config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    LongCsv(LongCsvSpec),
    WideCsv(WideCsvSpec),
    StateJson(StateJsonSpec),
    TrendsJson(TrendsJsonSpec),
}

impl SourceSpec {
    pub fn path(&self) -> &Path {
        match self {
            SourceSpec::LongCsv(s) => &s.path,
            SourceSpec::WideCsv(s) => &s.path,
            SourceSpec::StateJson(s) => &s.path,
            SourceSpec::TrendsJson(s) => &s.path,
        }
    }

    /// Same spec with its path resolved against `base` (if relative).
    pub fn resolved(&self, base: &Path) -> SourceSpec {
        let mut out = self.clone();
        let path = match &mut out {
            SourceSpec::LongCsv(s) => &mut s.path,
            SourceSpec::WideCsv(s) => &mut s.path,
            SourceSpec::StateJson(s) => &mut s.path,
            SourceSpec::TrendsJson(s) => &mut s.path,
        };
        if path.is_relative() {
            *path = base.join(&*path);
        }
        out
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows: usize,
    /// Rows dropped entirely (bad period, missing key).
    pub skipped_rows: usize,
    /// Cells that were not finite numbers.
    pub missing_values: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub observations: Vec<Observation>,
    pub stats: LoadStats,
    /// blake3 of the raw bytes.
    pub content_hash: String,
    pub trends: Option<TrendsDocument>,
}

/// Parses already-fetched bytes. Any error fails the whole source.
pub fn parse_source(spec: &SourceSpec, bytes: &[u8]) -> Result<LoadedSource, LoadError> {
    let content_hash = blake3::hash(bytes).to_hex().to_string();
    let mut trends = None;

    let (observations, stats) = match spec {
        SourceSpec::LongCsv(s) => read_long_csv(s, bytes)?,
        SourceSpec::WideCsv(s) => read_wide_csv(s, bytes)?,
        SourceSpec::StateJson(s) => read_state_json(s, bytes)?,
        SourceSpec::TrendsJson(s) => {
            let doc = TrendsDocument::from_slice(bytes)?;
            let parsed = doc.observations(s.granularity);
            trends = Some(doc);
            parsed
        }
    };

    if observations.is_empty() {
        return Err(LoadError::Empty {
            source: spec.path().display().to_string(),
        });
    }

    let short_hash = &content_hash[..16];
    tracing::debug!(
        path = %spec.path().display(),
        observations = observations.len(),
        skipped_rows = stats.skipped_rows,
        missing_values = stats.missing_values,
        hash = %short_hash,
        "parsed source"
    );

    Ok(LoadedSource {
        path: spec.path().to_path_buf(),
        observations,
        stats,
        content_hash,
        trends,
    })
}

pub fn load_source_path(spec: &SourceSpec) -> Result<LoadedSource, LoadError> {
    let path = spec.path();
    let bytes = fs::read(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_source(spec, &bytes)
}
