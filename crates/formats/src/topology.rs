use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;

fn default_name_property() -> String {
    "name".to_string()
}

/// Geometry whose feature names form the entity set of a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySpec {
    pub path: PathBuf,
    /// TopoJSON object to read (`countries`, `states`); all objects if unset.
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

/// Feature names of a TopoJSON `Topology` or a GeoJSON `FeatureCollection`,
/// in document order. Features without the name property are skipped.
pub fn entity_names(
    bytes: &[u8],
    object: Option<&str>,
    name_property: &str,
) -> Result<Vec<String>, LoadError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let ty = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::Shape("geometry document has no \"type\"".to_string()))?;

    let features: Vec<&Value> = match ty {
        "Topology" => {
            let objects = root
                .get("objects")
                .and_then(Value::as_object)
                .ok_or_else(|| LoadError::Shape("topology has no objects".to_string()))?;
            let selected: Vec<&Value> = match object {
                Some(name) => vec![objects.get(name).ok_or_else(|| {
                    LoadError::Shape(format!("topology has no object {name:?}"))
                })?],
                None => objects.values().collect(),
            };
            selected
                .into_iter()
                .filter_map(|o| o.get("geometries").and_then(Value::as_array))
                .flatten()
                .collect()
        }
        "FeatureCollection" => root
            .get("features")
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default(),
        other => {
            return Err(LoadError::Shape(format!(
                "expected Topology or FeatureCollection, got {other:?}"
            )));
        }
    };

    let names: Vec<String> = features
        .into_iter()
        .filter_map(|f| f.get("properties")?.get(name_property)?.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        tracing::warn!("geometry has no features with property {name_property:?}");
    }
    Ok(names)
}
