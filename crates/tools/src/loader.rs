use std::path::PathBuf;

use formats::{
    GeometrySpec, LoadError, LoadStats, SourceSpec, TrendsDocument, entity_names, parse_source,
};
use futures_util::future::try_join_all;
use scene::Observation;
use serde::Serialize;

use crate::config::VizConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub observations: usize,
    pub stats: LoadStats,
    pub content_hash: String,
}

/// Everything read from disk for one visualization, before any indexing.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub observations: Vec<Observation>,
    /// Feature names of the geometry, in document order.
    pub geometry: Vec<String>,
    pub trends: Option<TrendsDocument>,
    pub sources: Vec<SourceSummary>,
}

async fn read(path: &std::path::Path) -> Result<Vec<u8>, LoadError> {
    tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_source(spec: &SourceSpec) -> Result<formats::LoadedSource, LoadError> {
    let bytes = read(spec.path()).await?;
    parse_source(spec, &bytes)
}

pub async fn load_geometry(spec: &GeometrySpec) -> Result<Vec<String>, LoadError> {
    let bytes = read(&spec.path).await?;
    entity_names(&bytes, spec.object.as_deref(), &spec.name_property)
}

/// Fetches every source and the geometry concurrently. The first failure
/// fails the whole load; nothing is rendered from a partial dataset.
pub async fn load_dataset(config: &VizConfig) -> Result<Dataset, LoadError> {
    let sources = try_join_all(config.sources.iter().map(load_source));
    let geometry = async {
        match &config.geometry {
            Some(spec) => load_geometry(spec).await,
            None => Ok(Vec::new()),
        }
    };
    let (loaded, geometry) = tokio::try_join!(sources, geometry)?;

    let mut dataset = Dataset {
        geometry,
        ..Dataset::default()
    };
    for source in loaded {
        dataset.sources.push(SourceSummary {
            path: source.path,
            observations: source.observations.len(),
            stats: source.stats,
            content_hash: source.content_hash,
        });
        dataset.observations.extend(source.observations);
        if dataset.trends.is_none() {
            dataset.trends = source.trends;
        }
    }

    tracing::info!(
        sources = dataset.sources.len(),
        observations = dataset.observations.len(),
        shapes = dataset.geometry.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::load_dataset;
    use crate::config::VizConfig;
    use formats::LoadError;
    use std::path::PathBuf;

    fn demo(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/demo").join(name)
    }

    #[tokio::test]
    async fn loads_demo_unemployment() {
        let cfg = VizConfig::load(&demo("unemployment.json")).unwrap();
        let dataset = load_dataset(&cfg).await.unwrap();
        assert_eq!(dataset.sources.len(), 1);
        assert_eq!(dataset.sources[0].content_hash.len(), 64);
        assert!(dataset.geometry.iter().any(|n| n == "Egypt"));
        assert!(dataset.observations.len() > 10);
        assert!(dataset.trends.is_none());
    }

    #[tokio::test]
    async fn one_missing_source_fails_the_load() {
        let mut cfg = VizConfig::load(&demo("unemployment.json")).unwrap();
        cfg.sources.push(
            serde_json::from_str(
                r#"{"kind": "wide_csv", "path": "/definitely/missing/u.csv", "key_column": "x"}"#,
            )
            .unwrap(),
        );
        let err = load_dataset(&cfg).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
