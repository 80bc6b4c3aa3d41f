use foundation::{Period, Rgb};
use scene::{QueryMode, SeriesStore};
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId, RenderContext};
use crate::render::{Mark, RenderState, TransitionConfig};
use crate::symbology::SqrtScale;

fn default_max_radius() -> f64 {
    40.0
}

fn default_fill() -> Rgb {
    Rgb::new(0xff, 0x00, 0x00)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleConfig {
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,
    /// Fixed radius domain; fitted to the data maximum when unset.
    #[serde(default)]
    pub domain_max: Option<f64>,
    #[serde(default = "default_fill")]
    pub fill: Rgb,
    #[serde(default)]
    pub query: QueryMode,
    #[serde(default)]
    pub transition: TransitionConfig,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            max_radius: default_max_radius(),
            domain_max: None,
            fill: default_fill(),
            query: QueryMode::default(),
            transition: TransitionConfig::default(),
        }
    }
}

/// Proportional circles. An entity without a value has no circle at all.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleLayer {
    id: LayerId,
    config: BubbleConfig,
    radius: SqrtScale,
}

impl BubbleLayer {
    pub fn fit(id: u64, config: BubbleConfig, store: &SeriesStore) -> Self {
        let radius = SqrtScale::fit(config.domain_max.or_else(|| store.max_value()), config.max_radius);
        Self {
            id: LayerId(id),
            config,
            radius,
        }
    }

    pub fn radius_scale(&self) -> &SqrtScale {
        &self.radius
    }
}

impl Layer for BubbleLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn extract(&self, ctx: &RenderContext<'_>, period: Period) -> RenderState {
        let mut out = RenderState::new(period);
        for (key, sample) in ctx.store.snapshot(period, self.config.query) {
            if !ctx.entities.is_empty() && !ctx.entities.contains(key.as_str()) {
                continue;
            }
            out.push(Mark {
                key: key.clone(),
                value: Some(sample.value),
                as_of: Some(sample.period),
                fill: self.config.fill,
                radius: Some(self.radius.radius(sample.value)),
            });
        }

        tracing::trace!(
            layer = self.id.0,
            %period,
            bubbles = out.len(),
            total = out.total(),
            "bubble frame"
        );
        out
    }

    fn transition(&self) -> TransitionConfig {
        self.config.transition
    }
}

#[cfg(test)]
mod tests {
    use super::{BubbleConfig, BubbleLayer};
    use crate::layer::{Layer, RenderContext};
    use foundation::{EntityKey, Period};
    use scene::{EntitySet, Observation, SeriesStore};

    fn p(s: &str) -> Period {
        Period::parse(s).unwrap()
    }

    fn bank_store() -> SeriesStore {
        let nyc = EntityKey::from_lat_lon(40.71, -74.0);
        let sf = EntityKey::from_lat_lon(37.77, -122.42);
        SeriesStore::from_observations(vec![
            Observation::new(p("2008-03"), nyc.clone(), 100.0),
            Observation::new(p("2008-09"), nyc, 400.0),
            Observation::new(p("2008-09"), sf, 25.0),
        ])
    }

    #[test]
    fn marks_only_entities_with_a_value_so_far() {
        let store = bank_store();
        let layer = BubbleLayer::fit(1, BubbleConfig::default(), &store);
        let entities = EntitySet::new();
        let ctx = RenderContext {
            store: &store,
            entities: &entities,
        };

        let march = layer.extract(&ctx, p("2008-03"));
        assert_eq!(march.len(), 1);
        assert_eq!(march.total(), 100.0);

        let later = layer.extract(&ctx, p("2009-01"));
        assert_eq!(later.len(), 2);
        assert_eq!(later.total(), 425.0);
        let nyc = later.mark("40.71|-74").unwrap();
        assert_eq!(nyc.radius, Some(40.0));
        assert_eq!(nyc.as_of, Some(p("2008-09")));
        assert_eq!(later.mark("37.77|-122.42").unwrap().radius, Some(10.0));

        assert!(layer.extract(&ctx, p("2007-12")).is_empty());
    }

    #[test]
    fn fixed_domain_overrides_fit() {
        let store = bank_store();
        let cfg = BubbleConfig {
            domain_max: Some(1600.0),
            ..BubbleConfig::default()
        };
        let layer = BubbleLayer::fit(1, cfg, &store);
        assert_eq!(layer.radius_scale().radius(400.0), 20.0);
    }
}
