use serde::Serialize;

/// Deterministic tick metadata.
///
/// Playback time is counted in ticks of a fixed interval, never read from a
/// wall clock, so a run can be replayed exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// 0-based tick index.
    pub index: u64,
    pub interval_ms: u64,
    /// Playback time at this tick.
    pub elapsed_ms: u64,
}

impl Frame {
    pub fn new(index: u64, interval_ms: u64) -> Self {
        Self {
            index,
            interval_ms,
            elapsed_ms: index.saturating_mul(interval_ms),
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.interval_ms)
    }
}
