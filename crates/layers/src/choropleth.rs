use foundation::{Period, Rgb};
use scene::QueryMode;
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId, RenderContext};
use crate::render::{Mark, RenderState, TransitionConfig};
use crate::symbology::{ColorScale, ColorScaleConfig, ScaleError};

fn default_no_data() -> Rgb {
    Rgb::new(0xcc, 0xcc, 0xcc)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethConfig {
    #[serde(default)]
    pub scale: ColorScaleConfig,
    #[serde(default = "default_no_data")]
    pub no_data: Rgb,
    #[serde(default)]
    pub query: QueryMode,
    #[serde(default)]
    pub transition: TransitionConfig,
}

impl Default for ChoroplethConfig {
    fn default() -> Self {
        Self {
            scale: ColorScaleConfig::default(),
            no_data: default_no_data(),
            query: QueryMode::default(),
            transition: TransitionConfig::default(),
        }
    }
}

/// One filled shape per entity. Shapes without a value keep their mark and
/// take the `no_data` colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethLayer {
    id: LayerId,
    config: ChoroplethConfig,
    scale: ColorScale,
}

impl ChoroplethLayer {
    pub fn new(id: u64, config: ChoroplethConfig) -> Result<Self, ScaleError> {
        let scale = ColorScale::from_config(&config.scale)?;
        Ok(Self {
            id: LayerId(id),
            config,
            scale,
        })
    }

    pub fn config(&self) -> &ChoroplethConfig {
        &self.config
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }
}

impl Layer for ChoroplethLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn extract(&self, ctx: &RenderContext<'_>, period: Period) -> RenderState {
        let mut out = RenderState::new(period);
        let keys: Vec<_> = if ctx.entities.is_empty() {
            ctx.store.keys().cloned().collect()
        } else {
            ctx.entities.iter().cloned().collect()
        };

        for key in keys {
            let sample = ctx.store.lookup(key.as_str(), period, self.config.query);
            let fill = match sample {
                Some(s) => self.scale.color(s.value),
                None => self.config.no_data,
            };
            out.push(Mark {
                key,
                value: sample.map(|s| s.value),
                as_of: sample.map(|s| s.period),
                fill,
                radius: None,
            });
        }

        tracing::trace!(
            layer = self.id.0,
            %period,
            shapes = out.len(),
            with_data = out.with_data(),
            "choropleth frame"
        );
        out
    }

    fn transition(&self) -> TransitionConfig {
        self.config.transition
    }
}
