use std::time::Duration;

use layers::RenderUpdate;
use runtime::{Event, EventBus, Frame, PlaybackEvent, TickOutcome};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::visualization::Visualization;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Seek(usize),
}

/// One line of player output: what happened, and the frame drawn for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOutput {
    #[serde(flatten)]
    pub event: Event,
    pub update: Option<RenderUpdate>,
}

/// Timer-driven playback around a [`Visualization`].
///
/// At most one timer task exists. It only sends ticks; every state change
/// happens in the loop that owns the player.
pub struct Player {
    viz: Visualization,
    interval: Duration,
    tick_limit: Option<u64>,
    timer: Option<JoinHandle<()>>,
    ticks_tx: mpsc::Sender<()>,
    ticks_rx: mpsc::Receiver<()>,
    frame: Frame,
    bus: EventBus,
}

impl Player {
    pub fn new(viz: Visualization, interval: Duration) -> Self {
        let (ticks_tx, ticks_rx) = mpsc::channel(1);
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            viz,
            interval,
            tick_limit: None,
            timer: None,
            ticks_tx,
            ticks_rx,
            frame: Frame::new(0, interval_ms),
            bus: EventBus::new(),
        }
    }

    /// Stop after this many timer ticks even if the end is not reached.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    pub fn visualization(&self) -> &Visualization {
        &self.viz
    }

    pub fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    fn arm_timer(&mut self) {
        if self.timer.is_some() {
            return;
        }
        let tx = self.ticks_tx.clone();
        let period = self.interval;
        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the first step should not.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(interval_ms = self.frame.interval_ms, "timer armed");
    }

    fn disarm_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
            tracing::debug!("timer disarmed");
        }
        // Drop a tick that was already queued before the abort.
        while self.ticks_rx.try_recv().is_ok() {}
    }

    fn output(&mut self, event: PlaybackEvent, redraw: bool) -> PlayerOutput {
        self.bus.emit(self.frame, event);
        let update = if redraw { self.viz.render() } else { None };
        if let Some(update) = &update {
            tracing::trace!(cursor = event.cursor(), period = %update.state.period, "frame drawn");
        }
        PlayerOutput {
            event: Event {
                frame_index: self.frame.index,
                kind: event,
            },
            update,
        }
    }

    /// Draws the current period without touching playback.
    pub fn redraw(&mut self) -> Option<RenderUpdate> {
        self.viz.render()
    }

    pub fn apply(&mut self, command: Command) -> Option<PlayerOutput> {
        let event = match command {
            Command::Start => self.viz.start(),
            Command::Stop => self.viz.stop(),
            Command::Toggle => {
                if self.viz.playback().is_playing() {
                    self.viz.stop()
                } else {
                    self.viz.start()
                }
            }
            Command::Seek(index) => self.viz.seek(index),
        }?;

        match event {
            PlaybackEvent::Started { .. } => self.arm_timer(),
            PlaybackEvent::Stopped { .. } => self.disarm_timer(),
            _ => {}
        }
        let redraw = !matches!(event, PlaybackEvent::Stopped { .. });
        Some(self.output(event, redraw))
    }

    fn on_tick(&mut self) -> Option<PlayerOutput> {
        if self.tick_limit.is_some_and(|limit| self.frame.index >= limit) {
            let stopped = self.viz.stop();
            self.disarm_timer();
            return stopped.map(|event| self.output(event, false));
        }
        self.frame = self.frame.next();
        let outcome = self.viz.tick();
        if matches!(outcome, TickOutcome::Finished(_) | TickOutcome::Idle) {
            self.disarm_timer();
        }
        let event = outcome.event()?;
        let out = self.output(event, true);

        if let (Some(limit), TickOutcome::Advanced(_)) = (self.tick_limit, outcome) {
            if self.frame.index >= limit {
                if let Some(stopped) = self.viz.stop() {
                    self.disarm_timer();
                    self.bus.emit(self.frame, stopped);
                }
            }
        }
        Some(out)
    }

    /// Runs until the command channel is closed and playback has stopped.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<Command>,
        mut sink: impl FnMut(PlayerOutput),
    ) {
        let mut commands_open = true;
        loop {
            if !commands_open && self.timer.is_none() {
                break;
            }
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Some(out) = self.apply(command) {
                            sink(out);
                        }
                    }
                    None => commands_open = false,
                },
                tick = self.ticks_rx.recv(), if self.timer.is_some() => {
                    if tick.is_some() {
                        if let Some(out) = self.on_tick() {
                            sink(out);
                        }
                    }
                }
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}
