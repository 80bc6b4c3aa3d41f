use serde::Serialize;

use crate::event_bus::PlaybackEvent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

/// Result of one timer tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Moved one step; still playing.
    Advanced(usize),
    /// Moved onto the final index and paused.
    Finished(usize),
    /// Not playing, nothing to do.
    Idle,
}

impl TickOutcome {
    pub fn event(self) -> Option<PlaybackEvent> {
        match self {
            TickOutcome::Advanced(to) => Some(PlaybackEvent::Advanced { to }),
            TickOutcome::Finished(at) => Some(PlaybackEvent::Finished { at }),
            TickOutcome::Idle => None,
        }
    }
}

/// Two-state playback cursor over `len` periods.
///
/// `start` and `stop` are the only transitions between states. Reaching the
/// final index stops playback; starting again from there rewinds to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    len: usize,
    cursor: usize,
    state: PlaybackState,
}

impl Playback {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            cursor: 0,
            state: PlaybackState::Paused,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn at_end(&self) -> bool {
        self.len > 0 && self.cursor + 1 >= self.len
    }

    /// No-op while already playing or when there is nothing to play.
    pub fn start(&mut self) -> Option<PlaybackEvent> {
        if self.is_playing() || self.is_empty() {
            return None;
        }
        if self.at_end() {
            self.cursor = 0;
        }
        self.state = PlaybackState::Playing;
        tracing::debug!(from = self.cursor, "playback started");
        Some(PlaybackEvent::Started { from: self.cursor })
    }

    pub fn stop(&mut self) -> Option<PlaybackEvent> {
        if !self.is_playing() {
            return None;
        }
        self.state = PlaybackState::Paused;
        tracing::debug!(at = self.cursor, "playback stopped");
        Some(PlaybackEvent::Stopped { at: self.cursor })
    }

    pub fn toggle(&mut self) -> Option<PlaybackEvent> {
        if self.is_playing() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Moves the cursor (clamped to the last index). Playback state is left
    /// alone, so a running animation continues from the new position.
    pub fn seek(&mut self, index: usize) -> Option<PlaybackEvent> {
        if self.is_empty() {
            return None;
        }
        self.cursor = index.min(self.len - 1);
        Some(PlaybackEvent::Seeked { to: self.cursor })
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }
        if !self.at_end() {
            self.cursor += 1;
        }
        if self.at_end() {
            self.state = PlaybackState::Paused;
            tracing::debug!(at = self.cursor, "playback finished");
            TickOutcome::Finished(self.cursor)
        } else {
            TickOutcome::Advanced(self.cursor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Playback, PlaybackState, TickOutcome};
    use crate::event_bus::PlaybackEvent;

    #[test]
    fn starts_paused_at_zero() {
        let p = Playback::new(5);
        assert_eq!(p.state(), PlaybackState::Paused);
        assert_eq!(p.cursor(), 0);
    }

    #[test]
    fn each_tick_advances_exactly_one_and_stops_at_end() {
        let mut p = Playback::new(4);
        assert_eq!(p.start(), Some(PlaybackEvent::Started { from: 0 }));
        assert_eq!(p.tick(), TickOutcome::Advanced(1));
        assert_eq!(p.tick(), TickOutcome::Advanced(2));
        assert_eq!(p.tick(), TickOutcome::Finished(3));
        assert!(!p.is_playing());
        assert_eq!(p.tick(), TickOutcome::Idle);
        assert_eq!(p.cursor(), 3);
    }

    #[test]
    fn start_while_playing_is_a_noop() {
        let mut p = Playback::new(4);
        p.start();
        p.tick();
        assert_eq!(p.start(), None);
        assert_eq!(p.cursor(), 1);
        assert!(p.is_playing());
    }

    #[test]
    fn start_at_end_rewinds() {
        let mut p = Playback::new(3);
        p.seek(2);
        assert_eq!(p.start(), Some(PlaybackEvent::Started { from: 0 }));
        assert_eq!(p.cursor(), 0);
    }

    #[test]
    fn stop_and_toggle() {
        let mut p = Playback::new(3);
        assert_eq!(p.stop(), None);
        assert!(matches!(p.toggle(), Some(PlaybackEvent::Started { .. })));
        assert_eq!(p.toggle(), Some(PlaybackEvent::Stopped { at: 0 }));
        assert_eq!(p.tick(), TickOutcome::Idle);
    }

    #[test]
    fn seek_clamps_and_keeps_playing() {
        let mut p = Playback::new(10);
        p.start();
        assert_eq!(p.seek(99), Some(PlaybackEvent::Seeked { to: 9 }));
        assert!(p.is_playing());

        p.seek(4);
        assert_eq!(p.tick(), TickOutcome::Advanced(5));
        assert!(p.is_playing());
    }

    #[test]
    fn empty_and_single_period() {
        let mut empty = Playback::new(0);
        assert_eq!(empty.start(), None);
        assert_eq!(empty.seek(3), None);
        assert_eq!(empty.tick(), TickOutcome::Idle);

        let mut one = Playback::new(1);
        assert!(one.start().is_some());
        assert_eq!(one.tick(), TickOutcome::Finished(0));
        assert!(!one.is_playing());
    }
}
