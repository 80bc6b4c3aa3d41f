use std::fmt;

use foundation::Rgb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleError {
    DegenerateDomain([f64; 2]),
    Thresholds(String),
    EmptyRamp,
}

impl fmt::Display for ScaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleError::DegenerateDomain(d) => write!(f, "degenerate scale domain {d:?}"),
            ScaleError::Thresholds(msg) => write!(f, "invalid threshold scale: {msg}"),
            ScaleError::EmptyRamp => write!(f, "color ramp needs at least one stop"),
        }
    }
}

impl std::error::Error for ScaleError {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
    clamp: bool,
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self {
            domain,
            range,
            clamp: false,
        }
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn map(&self, v: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        // A collapsed domain maps everything to the middle of the range.
        let mut t = if d1 == d0 { 0.5 } else { (v - d0) / (d1 - d0) };
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        r0 + (r1 - r0) * t
    }
}

/// Square-root radius scale: the circle *area* is proportional to the value.
///
/// Domain is `[0, domain_max]`, range `[0, max_radius]`. Values at or below
/// zero get radius zero.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SqrtScale {
    domain_max: f64,
    max_radius: f64,
}

impl SqrtScale {
    pub fn new(domain_max: f64, max_radius: f64) -> Result<Self, ScaleError> {
        if !(domain_max.is_finite() && domain_max > 0.0) {
            return Err(ScaleError::DegenerateDomain([0.0, domain_max]));
        }
        Ok(Self {
            domain_max,
            max_radius: max_radius.max(0.0),
        })
    }

    /// Fits the domain to the largest observed value. An empty or all-zero
    /// dataset falls back to a unit domain so every radius is 0.
    pub fn fit(max_value: Option<f64>, max_radius: f64) -> Self {
        let domain_max = max_value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(1.0);
        Self {
            domain_max,
            max_radius: max_radius.max(0.0),
        }
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    pub fn radius(&self, v: f64) -> f64 {
        if !(v.is_finite() && v > 0.0) {
            return 0.0;
        }
        (v / self.domain_max).sqrt() * self.max_radius
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    YlOrRd,
    Blues,
    Reds,
}

const YL_OR_RD: [Rgb; 9] = [
    Rgb::new(0xff, 0xff, 0xcc),
    Rgb::new(0xff, 0xed, 0xa0),
    Rgb::new(0xfe, 0xd9, 0x76),
    Rgb::new(0xfe, 0xb2, 0x4c),
    Rgb::new(0xfd, 0x8d, 0x3c),
    Rgb::new(0xfc, 0x4e, 0x2a),
    Rgb::new(0xe3, 0x1a, 0x1c),
    Rgb::new(0xbd, 0x00, 0x26),
    Rgb::new(0x80, 0x00, 0x26),
];

const BLUES: [Rgb; 9] = [
    Rgb::new(0xf7, 0xfb, 0xff),
    Rgb::new(0xde, 0xeb, 0xf7),
    Rgb::new(0xc6, 0xdb, 0xef),
    Rgb::new(0x9e, 0xca, 0xe1),
    Rgb::new(0x6b, 0xae, 0xd6),
    Rgb::new(0x42, 0x92, 0xc6),
    Rgb::new(0x21, 0x71, 0xb5),
    Rgb::new(0x08, 0x51, 0x9c),
    Rgb::new(0x08, 0x30, 0x6b),
];

const REDS: [Rgb; 9] = [
    Rgb::new(0xff, 0xf5, 0xf0),
    Rgb::new(0xfe, 0xe0, 0xd2),
    Rgb::new(0xfc, 0xbb, 0xa1),
    Rgb::new(0xfc, 0x92, 0x72),
    Rgb::new(0xfb, 0x6a, 0x4a),
    Rgb::new(0xef, 0x3b, 0x2c),
    Rgb::new(0xcb, 0x18, 0x1d),
    Rgb::new(0xa5, 0x0f, 0x15),
    Rgb::new(0x67, 0x00, 0x0d),
];

/// Piecewise-linear colour ramp over evenly spaced stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<Rgb>,
}

impl ColorRamp {
    pub fn new(stops: Vec<Rgb>) -> Result<Self, ScaleError> {
        if stops.is_empty() {
            return Err(ScaleError::EmptyRamp);
        }
        Ok(Self { stops })
    }

    pub fn scheme(scheme: Scheme) -> Self {
        let stops = match scheme {
            Scheme::YlOrRd => YL_OR_RD,
            Scheme::Blues => BLUES,
            Scheme::Reds => REDS,
        };
        Self {
            stops: stops.to_vec(),
        }
    }

    pub fn at(&self, t: f64) -> Rgb {
        let n = self.stops.len();
        if n == 1 {
            return self.stops[0];
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (n - 1) as f64;
        let i = (pos.floor() as usize).min(n - 2);
        Rgb::lerp(self.stops[i], self.stops[i + 1], pos - i as f64)
    }
}

/// Continuous value -> colour, clamped to the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialScale {
    position: LinearScale,
    ramp: ColorRamp,
}

impl SequentialScale {
    pub fn new(domain: [f64; 2], ramp: ColorRamp) -> Result<Self, ScaleError> {
        if !(domain[0].is_finite() && domain[1].is_finite()) || domain[0] == domain[1] {
            return Err(ScaleError::DegenerateDomain(domain));
        }
        Ok(Self {
            position: LinearScale::new(domain, [0.0, 1.0]).clamped(),
            ramp,
        })
    }

    pub fn color(&self, v: f64) -> Rgb {
        self.ramp.at(self.position.map(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

/// Piecewise-constant colour buckets. A value equal to a threshold falls in
/// the bucket above it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScale {
    thresholds: Vec<f64>,
    colors: Vec<Rgb>,
}

impl ThresholdScale {
    pub fn new(thresholds: Vec<f64>, colors: Vec<Rgb>) -> Result<Self, ScaleError> {
        if colors.len() != thresholds.len() + 1 {
            return Err(ScaleError::Thresholds(format!(
                "{} thresholds need {} colors, got {}",
                thresholds.len(),
                thresholds.len() + 1,
                colors.len()
            )));
        }
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(ScaleError::Thresholds("thresholds must be finite".into()));
        }
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ScaleError::Thresholds(
                "thresholds must be strictly increasing".into(),
            ));
        }
        Ok(Self { thresholds, colors })
    }

    pub fn bucket(&self, v: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= v)
    }

    pub fn color(&self, v: f64) -> Rgb {
        self.colors[self.bucket(v)]
    }

    /// `floor-t0{unit}`, `t0-t1{unit}`, ..., `tn{unit}+`.
    pub fn legend(&self, floor: f64, unit: &str) -> Vec<LegendEntry> {
        let mut out = Vec::with_capacity(self.colors.len());
        let mut lower = floor;
        for (i, color) in self.colors.iter().enumerate() {
            let label = match self.thresholds.get(i) {
                Some(upper) => format!("{lower}-{upper}{unit}"),
                None => format!("{lower}{unit}+"),
            };
            out.push(LegendEntry {
                label,
                color: *color,
            });
            if let Some(upper) = self.thresholds.get(i) {
                lower = *upper;
            }
        }
        out
    }
}

/// Serializable description of a fill scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColorScaleConfig {
    Sequential {
        domain: [f64; 2],
        #[serde(default)]
        scheme: Scheme,
    },
    Threshold {
        thresholds: Vec<f64>,
        colors: Vec<Rgb>,
    },
}

impl Default for ColorScaleConfig {
    fn default() -> Self {
        ColorScaleConfig::Sequential {
            domain: [0.0, 15.0],
            scheme: Scheme::YlOrRd,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorScale {
    Sequential(SequentialScale),
    Threshold(ThresholdScale),
}

impl ColorScale {
    pub fn from_config(config: &ColorScaleConfig) -> Result<Self, ScaleError> {
        match config {
            ColorScaleConfig::Sequential { domain, scheme } => Ok(ColorScale::Sequential(
                SequentialScale::new(*domain, ColorRamp::scheme(*scheme))?,
            )),
            ColorScaleConfig::Threshold { thresholds, colors } => Ok(ColorScale::Threshold(
                ThresholdScale::new(thresholds.clone(), colors.clone())?,
            )),
        }
    }

    pub fn color(&self, v: f64) -> Rgb {
        match self {
            ColorScale::Sequential(s) => s.color(v),
            ColorScale::Threshold(s) => s.color(v),
        }
    }
}
