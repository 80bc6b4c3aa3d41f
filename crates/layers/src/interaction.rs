use foundation::{EntityKey, Period, PeriodSpan};
use scene::{SeriesStore, TimeIndex};
use serde::{Deserialize, Serialize};

use crate::render::RenderState;
use crate::symbology::LinearScale;

fn default_template() -> String {
    "{value}".to_string()
}

fn default_precision() -> usize {
    2
}

fn default_no_data_text() -> String {
    "No data available".to_string()
}

fn default_offset() -> [f64; 2] {
    [10.0, -28.0]
}

/// How hover text is built. `{value}` and `{period}` are substituted in
/// `template`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipFormat {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default = "default_no_data_text")]
    pub no_data: String,
    /// Tooltip position relative to the pointer.
    #[serde(default = "default_offset")]
    pub offset: [f64; 2],
}

impl Default for TooltipFormat {
    fn default() -> Self {
        Self {
            template: default_template(),
            precision: default_precision(),
            no_data: default_no_data_text(),
            offset: default_offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub body: String,
    pub has_data: bool,
    pub x: f64,
    pub y: f64,
}

/// Tooltip for `key` read from the frame currently on screen, so it always
/// agrees with what is drawn.
pub fn tooltip(
    state: &RenderState,
    key: &str,
    title: &str,
    pointer: [f64; 2],
    format: &TooltipFormat,
) -> Tooltip {
    let value = state.value(key);
    let body = match value {
        Some(v) => format
            .template
            .replace("{period}", &state.period.long_label())
            .replace("{value}", &format!("{:.prec$}", v, prec = format.precision)),
        None => format.no_data.clone(),
    };
    Tooltip {
        title: title.to_string(),
        body,
        has_data: value.is_some(),
        x: pointer[0] + format.offset[0],
        y: pointer[1] + format.offset[1],
    }
}

fn default_width() -> f64 {
    300.0
}

fn default_height() -> f64 {
    150.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Restrict the chart to this span; whole index otherwise.
    #[serde(default)]
    pub span: Option<PeriodSpan>,
    /// Minimum top of the y axis, so small series are not blown up.
    #[serde(default)]
    pub y_floor: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            span: None,
            y_floor: 0.0,
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub period: Period,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub current: bool,
}

/// Per-entity line chart opened on click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTimeline {
    pub key: EntityKey,
    pub y_domain: [f64; 2],
    pub points: Vec<TimelinePoint>,
}

impl EntityTimeline {
    /// `None` when the entity has no data at all. Periods without a record
    /// are skipped rather than drawn as zero.
    pub fn build(
        store: &SeriesStore,
        index: &TimeIndex,
        key: &str,
        current: Period,
        config: &TimelineConfig,
    ) -> Option<Self> {
        let series = store.series(key);
        if series.is_empty() {
            return None;
        }

        let in_span = |p: Period| config.span.is_none_or(|s| s.contains(p));
        let positions: Vec<(usize, Period)> = index
            .iter()
            .enumerate()
            .filter(|(_, p)| in_span(*p))
            .collect();
        let (first, last) = match (positions.first(), positions.last()) {
            (Some(f), Some(l)) => (f.0, l.0),
            _ => return None,
        };

        let samples: Vec<_> = series.iter().filter(|s| in_span(s.period)).collect();
        let max = samples.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
        let y_top = if max.is_finite() { max.max(config.y_floor) } else { config.y_floor };
        let y_domain = [0.0, y_top];

        let x = LinearScale::new([first as f64, last as f64], [0.0, config.width]);
        let y = LinearScale::new(y_domain, [config.height, 0.0]);

        let points = samples
            .into_iter()
            .filter_map(|s| {
                let i = index.position(s.period)?;
                Some(TimelinePoint {
                    period: s.period,
                    value: s.value,
                    x: x.map(i as f64),
                    y: y.map(s.value),
                    current: s.period == current,
                })
            })
            .collect();

        Some(Self {
            key: EntityKey::from(key),
            y_domain,
            points,
        })
    }
}

/// Which entity's detail chart is open, if any.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    open: Option<EntityKey>,
}

impl DetailPanel {
    pub fn open(&self) -> Option<&EntityKey> {
        self.open.as_ref()
    }

    /// Clicking the open entity again closes the panel. Returns whether the
    /// panel is open afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.open.as_ref().is_some_and(|k| k.as_str() == key) {
            self.open = None;
            false
        } else {
            self.open = Some(EntityKey::from(key));
            true
        }
    }

    pub fn close(&mut self) {
        self.open = None;
    }
}
