use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use formats::{GeometrySpec, SourceSpec};
use foundation::Period;
use layers::LayerConfig;
use layers::interaction::{TimelineConfig, TooltipFormat};
use layers::wordcloud::WordCloudConfig;
use serde::{Deserialize, Serialize};

pub const INTERVAL_ENV: &str = "TIMEMAP_INTERVAL_MS";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "read {}: {source}", path.display()),
            ConfigError::Parse { path, source } => write!(f, "parse {}: {source}", path.display()),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Where the period axis comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeAxis {
    /// Every distinct period present in the data.
    #[default]
    Data,
    /// Fixed inclusive year range, whether or not every year has data.
    Years { start: i32, end: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamesConfig {
    /// Seed the alias table with the built-in world country aliases.
    #[serde(default)]
    pub world_aliases: bool,
    /// Extra data name -> geometry name aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Extra substring rewrites, applied after the built-in ones.
    #[serde(default)]
    pub suffix_rules: Vec<(String, String)>,
}

fn default_interval_ms() -> u64 {
    800
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Initial frame; the first period when unset.
    #[serde(default)]
    pub start_period: Option<Period>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            start_period: None,
        }
    }
}

/// One animated map, as described by a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(default)]
    pub title: String,
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub geometry: Option<GeometrySpec>,
    #[serde(default)]
    pub time: TimeAxis,
    #[serde(default)]
    pub layer: LayerConfig,
    #[serde(default)]
    pub names: NamesConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub tooltip: TooltipFormat,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub wordcloud: Option<WordCloudConfig>,
    /// Suffix for threshold legend labels, e.g. `%`.
    #[serde(default)]
    pub legend_unit: String,
}

impl VizConfig {
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`, resolves data paths against its directory, applies
    /// environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_slice(path, &bytes)?;
        let base = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base);
        config.apply_env(|k| std::env::var(k).ok())?;
        config.validate()?;
        tracing::debug!(path = %path.display(), sources = config.sources.len(), "loaded config");
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            *source = source.resolved(base);
        }
        if let Some(geometry) = &mut self.geometry {
            if geometry.path.is_relative() {
                geometry.path = base.join(&geometry.path);
            }
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(INTERVAL_ENV) {
            self.playback.interval_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{INTERVAL_ENV} must be milliseconds, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        if self.playback.interval_ms == 0 {
            return Err(ConfigError::Invalid("playback interval must be positive".into()));
        }
        if let TimeAxis::Years { start, end } = self.time {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "year range {start}..{end} is empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, INTERVAL_ENV, TimeAxis, VizConfig};
    use layers::LayerConfig;
    use std::io::Write;
    use std::path::Path;

    const MINIMAL: &str = r#"{
        "sources": [{"kind": "wide_csv", "path": "data/u.csv", "key_column": "Country Name"}],
        "geometry": {"path": "world.topo.json", "object": "countries"}
    }"#;

    #[test]
    fn defaults_fill_everything_but_sources() {
        let cfg = VizConfig::from_slice(Path::new("c.json"), MINIMAL.as_bytes()).unwrap();
        assert_eq!(cfg.playback.interval_ms, 800);
        assert_eq!(cfg.time, TimeAxis::Data);
        assert!(matches!(cfg.layer, LayerConfig::Choropleth(_)));
        assert_eq!(cfg.tooltip.no_data, "No data available");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_interval() {
        let mut cfg = VizConfig::from_slice(Path::new("c.json"), MINIMAL.as_bytes()).unwrap();
        cfg.apply_env(|k| (k == INTERVAL_ENV).then(|| "400".to_string()))
            .unwrap();
        assert_eq!(cfg.playback.interval_ms, 400);

        let err = cfg
            .apply_env(|_| Some("fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = VizConfig::from_slice(Path::new("c.json"), MINIMAL.as_bytes()).unwrap();
        cfg.time = TimeAxis::Years {
            start: 2023,
            end: 2000,
        };
        assert!(cfg.validate().is_err());

        let empty = VizConfig::from_slice(Path::new("c.json"), br#"{"sources": []}"#).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn load_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viz.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(MINIMAL.as_bytes())
            .unwrap();

        let cfg = VizConfig::load(&path).unwrap();
        assert_eq!(cfg.sources[0].path(), dir.path().join("data/u.csv"));
        assert_eq!(
            cfg.geometry.unwrap().path,
            dir.path().join("world.topo.json")
        );
    }

    #[test]
    fn missing_file_and_bad_json() {
        assert!(matches!(
            VizConfig::load(Path::new("/nope/viz.json")),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            VizConfig::from_slice(Path::new("c.json"), b"{"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
