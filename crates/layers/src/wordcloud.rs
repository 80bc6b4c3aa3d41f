use foundation::{Period, PeriodSpan, Rgb};
use serde::{Deserialize, Serialize};

fn default_min_size() -> f64 {
    12.0
}

fn default_max_size() -> f64 {
    60.0
}

fn default_boost_cap() -> f64 {
    2.0
}

fn default_highlight_color() -> Rgb {
    Rgb::new(0xe4, 0x1a, 0x1c)
}

fn default_base_color() -> Rgb {
    Rgb::new(0x37, 0x7e, 0xb8)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloudConfig {
    #[serde(default = "default_min_size")]
    pub min_size: f64,
    #[serde(default = "default_max_size")]
    pub max_size: f64,
    /// Highlighted words grow with their current interest inside this span.
    #[serde(default)]
    pub boost_span: Option<PeriodSpan>,
    #[serde(default = "default_boost_cap")]
    pub boost_cap: f64,
    /// Case-insensitive substrings that mark a word as highlighted.
    #[serde(default)]
    pub highlight_terms: Vec<String>,
    #[serde(default = "default_highlight_color")]
    pub highlight_color: Rgb,
    #[serde(default = "default_base_color")]
    pub base_color: Rgb,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_size: default_max_size(),
            boost_span: None,
            boost_cap: default_boost_cap(),
            highlight_terms: Vec::new(),
            highlight_color: default_highlight_color(),
            base_color: default_base_color(),
        }
    }
}

impl WordCloudConfig {
    fn matches_term(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.highlight_terms
            .iter()
            .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
    }
}

/// One keyword's interest over the period axis of the cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSeries {
    pub text: String,
    pub values: Vec<Option<f64>>,
    pub average: f64,
    /// Flagged upstream as belonging to the highlighted theme.
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub size: f64,
    pub highlighted: bool,
    pub color: Rgb,
}

/// Word sizes at `periods[index]`.
///
/// Base size is the keyword's average interest mapped linearly onto
/// `[min_size, max_size]`. Inside `boost_span`, highlighted words are scaled
/// by `min(current / average, boost_cap)`.
pub fn words_at(
    series: &[KeywordSeries],
    periods: &[Option<Period>],
    index: usize,
    config: &WordCloudConfig,
) -> Vec<Word> {
    let (lo, hi) = series
        .iter()
        .map(|k| k.average)
        .filter(|a| a.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| (lo.min(a), hi.max(a)));

    let boosting = match (config.boost_span, periods.get(index).copied().flatten()) {
        (Some(span), Some(p)) => span.contains(p),
        _ => false,
    };

    series
        .iter()
        .map(|k| {
            let highlighted = k.flagged || config.matches_term(&k.text);
            let mut size = if hi > lo && k.average.is_finite() {
                config.min_size + (k.average - lo) / (hi - lo) * (config.max_size - config.min_size)
            } else {
                config.min_size
            };

            if boosting && highlighted && k.average > 0.0 {
                if let Some(current) = k.values.get(index).copied().flatten() {
                    size *= (current / k.average).min(config.boost_cap);
                }
            }

            Word {
                text: k.text.clone(),
                size,
                highlighted,
                color: if highlighted {
                    config.highlight_color
                } else {
                    config.base_color
                },
            }
        })
        .collect()
}
