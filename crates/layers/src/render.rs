use std::collections::BTreeMap;

use foundation::{EntityKey, Period, Rgb};
use serde::{Deserialize, Serialize};

/// Visual description of one entity at one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    pub key: EntityKey,
    /// `None` renders as no data.
    pub value: Option<f64>,
    /// Period of the record the value came from (may precede the frame).
    pub as_of: Option<Period>,
    pub fill: Rgb,
    /// Bubble radius; choropleth marks have none.
    pub radius: Option<f64>,
}

/// Everything drawn for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderState {
    pub period: Period,
    pub marks: BTreeMap<EntityKey, Mark>,
}

impl RenderState {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            marks: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, mark: Mark) {
        self.marks.insert(mark.key.clone(), mark);
    }

    pub fn mark(&self, key: &str) -> Option<&Mark> {
        self.marks.get(key)
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.mark(key).and_then(|m| m.value)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Sum of every value on screen.
    pub fn total(&self) -> f64 {
        self.marks.values().filter_map(|m| m.value).sum()
    }

    pub fn with_data(&self) -> usize {
        self.marks.values().filter(|m| m.value.is_some()).count()
    }

    /// Keyed enter/update/exit against the previously displayed state.
    pub fn reconcile(&self, previous: Option<&RenderState>) -> Reconciliation {
        let mut out = Reconciliation::default();
        let Some(previous) = previous else {
            out.entered = self.marks.keys().cloned().collect();
            return out;
        };
        for (key, mark) in &self.marks {
            match previous.marks.get(key) {
                None => out.entered.push(key.clone()),
                Some(old) if old != mark => out.updated.push(key.clone()),
                Some(_) => out.unchanged += 1,
            }
        }
        out.exited = previous
            .marks
            .keys()
            .filter(|k| !self.marks.contains_key(*k))
            .cloned()
            .collect();
        out
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub entered: Vec<EntityKey>,
    pub updated: Vec<EntityKey>,
    pub exited: Vec<EntityKey>,
    pub unchanged: usize,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.entered.is_empty() && self.updated.is_empty() && self.exited.is_empty()
    }
}

fn default_duration_ms() -> u64 {
    500
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// Hold exits until enters have finished, so marks never flicker out
    /// before their replacements are visible.
    #[serde(default)]
    pub defer_exit: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            defer_exit: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub duration_ms: u64,
    pub exit_delay_ms: u64,
}

impl TransitionPlan {
    pub fn plan(config: &TransitionConfig, changes: &Reconciliation) -> Self {
        let exit_delay_ms = if config.defer_exit && !changes.entered.is_empty() {
            config.duration_ms
        } else {
            0
        };
        Self {
            duration_ms: config.duration_ms,
            exit_delay_ms,
        }
    }
}

/// A render state together with how to get there from the previous one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderUpdate {
    pub state: RenderState,
    pub changes: Reconciliation,
    pub transition: TransitionPlan,
}
