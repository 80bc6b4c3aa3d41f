use serde::Serialize;

use crate::frame::Frame;

/// What happened to the playback cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started { from: usize },
    Advanced { to: usize },
    Seeked { to: usize },
    Stopped { at: usize },
    /// Reached the final index; playback is paused.
    Finished { at: usize },
}

impl PlaybackEvent {
    /// Index that should be on screen after this event.
    pub fn cursor(&self) -> usize {
        match *self {
            PlaybackEvent::Started { from } => from,
            PlaybackEvent::Advanced { to } | PlaybackEvent::Seeked { to } => to,
            PlaybackEvent::Stopped { at } | PlaybackEvent::Finished { at } => at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub frame_index: u64,
    #[serde(flatten)]
    pub kind: PlaybackEvent,
}

/// Ordered log of playback events, stamped with the tick they happened on.
#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, frame: Frame, kind: PlaybackEvent) {
        tracing::debug!(frame = frame.index, ?kind, "playback event");
        self.events.push(Event {
            frame_index: frame.index,
            kind,
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
