use foundation::Period;
use scene::{EntitySet, SeriesStore};
use serde::{Deserialize, Serialize};

use crate::bubbles::{BubbleConfig, BubbleLayer};
use crate::choropleth::{ChoroplethConfig, ChoroplethLayer};
use crate::render::{RenderState, TransitionConfig};
use crate::symbology::ScaleError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(pub u64);

/// Data a layer reads to draw one frame.
#[derive(Debug, Copy, Clone)]
pub struct RenderContext<'a> {
    pub store: &'a SeriesStore,
    /// Geometry entities. Layers that draw one mark per shape use these;
    /// an empty set means "whatever the data has".
    pub entities: &'a EntitySet,
}

pub trait Layer {
    fn id(&self) -> LayerId;

    fn extract(&self, ctx: &RenderContext<'_>, period: Period) -> RenderState;

    fn transition(&self) -> TransitionConfig {
        TransitionConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    Choropleth(ChoroplethConfig),
    Bubbles(BubbleConfig),
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig::Choropleth(ChoroplethConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapLayer {
    Choropleth(ChoroplethLayer),
    Bubbles(BubbleLayer),
}

impl MapLayer {
    /// Builds the layer described by `config`. Bubble radii are fitted to
    /// the largest value in `store`.
    pub fn build(id: u64, config: &LayerConfig, store: &SeriesStore) -> Result<Self, ScaleError> {
        match config {
            LayerConfig::Choropleth(c) => Ok(MapLayer::Choropleth(ChoroplethLayer::new(id, c.clone())?)),
            LayerConfig::Bubbles(c) => Ok(MapLayer::Bubbles(BubbleLayer::fit(id, c.clone(), store))),
        }
    }
}

impl Layer for MapLayer {
    fn id(&self) -> LayerId {
        match self {
            MapLayer::Choropleth(l) => l.id(),
            MapLayer::Bubbles(l) => l.id(),
        }
    }

    fn extract(&self, ctx: &RenderContext<'_>, period: Period) -> RenderState {
        match self {
            MapLayer::Choropleth(l) => l.extract(ctx, period),
            MapLayer::Bubbles(l) => l.extract(ctx, period),
        }
    }

    fn transition(&self) -> TransitionConfig {
        match self {
            MapLayer::Choropleth(l) => l.transition(),
            MapLayer::Bubbles(l) => l.transition(),
        }
    }
}
