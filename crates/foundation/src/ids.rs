use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of an addressable entity (country, state, keyword, coordinate pair).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        EntityKey(key.into())
    }

    /// Coordinate key used by point datasets: `"{lat}|{lon}"`.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        EntityKey(format!("{lat}|{lon}"))
    }

    /// Inverse of [`EntityKey::from_lat_lon`].
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        let (lat, lon) = self.0.split_once('|')?;
        Some((lat.parse().ok()?, lon.parse().ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        EntityKey(s.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(s: String) -> Self {
        EntityKey(s)
    }
}

impl std::borrow::Borrow<str> for EntityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
