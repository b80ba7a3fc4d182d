//! Timer engine implementation.
//!
//! Wraps a [`SegmentSequencer`] with a real-time driver. The engine owns at
//! most one [`TickHandle`]; it exists exactly while the sequencer is running
//! and unpaused and is dropped on every other transition, so a stopped or
//! paused engine has no tick source left to fire.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Box::new(library), &config.timer);
//! engine.initialize(&preset);
//! engine.start()?;
//! loop {
//!     tokio::select! {
//!         events = engine.wait_tick() => { /* render */ }
//!         cmd = commands.recv() => { /* pause/resume/stop */ }
//!     }
//! }
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::sequencer::{SegmentSequencer, Transition};
use super::ticker::{TickHandle, TickerRegistry};
use crate::audio::CuePlayer;
use crate::error::ControlError;
use crate::events::Event;
use crate::preset::Preset;
use crate::storage::{TickClock, TimerConfig};

const EVENT_CAPACITY: usize = 64;

/// Read-only view of the engine for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub preset_id: Option<String>,
    pub segment_name: String,
    pub remaining_ms: f64,
    pub segment_index: usize,
    pub segment_count: usize,
    pub repeat_index: u32,
    pub repeat_count: u32,
    pub running: bool,
    pub paused: bool,
    pub finished: bool,
    pub progress_pct: f64,
}

/// Format milliseconds as `MM:SS.cc`.
///
/// Negative and non-finite input renders as zero. Minutes are not wrapped
/// into hours.
pub fn format_remaining(ms: f64) -> String {
    let centis = if ms.is_finite() && ms > 0.0 {
        (ms / 10.0).floor() as u64
    } else {
        0
    };
    let minutes = centis / 6000;
    let seconds = (centis / 100) % 60;
    format!("{minutes:02}:{seconds:02}.{:02}", centis % 100)
}

pub struct TimerEngine {
    sequencer: SegmentSequencer,
    preset: Option<Preset>,
    player: Box<dyn CuePlayer>,
    tick_interval: Duration,
    clock: TickClock,
    ticker: Option<TickHandle>,
    registry: TickerRegistry,
    events: broadcast::Sender<Event>,
    finished: bool,
}

impl TimerEngine {
    pub fn new(player: Box<dyn CuePlayer>, config: &TimerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sequencer: SegmentSequencer::new(config.boundary_policy()),
            preset: None,
            player,
            tick_interval: config.tick_interval(),
            clock: config.clock,
            ticker: None,
            registry: TickerRegistry::default(),
            events,
            finished: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn preset(&self) -> Option<&Preset> {
        self.preset.as_ref()
    }

    pub fn sequencer(&self) -> &SegmentSequencer {
        &self.sequencer
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Whether the tick loop is live.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Tick handles alive for this engine. Never more than one.
    pub fn live_tickers(&self) -> usize {
        self.registry.live()
    }

    /// True once the last segment of the last repeat has run out, until the
    /// next `start()` or `initialize()`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.sequencer.state();
        EngineSnapshot {
            preset_id: self.preset.as_ref().map(|p| p.id.clone()),
            segment_name: self
                .sequencer
                .current_segment()
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            remaining_ms: state.remaining_ms,
            segment_index: state.current_segment_index,
            segment_count: self.sequencer.segments().len(),
            repeat_index: state.current_repeat,
            repeat_count: self.sequencer.repeat_count(),
            running: state.running,
            paused: state.paused,
            finished: self.finished,
            progress_pct: self.sequencer.progress_pct(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Load `preset` for play, idle at its first segment.
    ///
    /// Any running sequence is stopped first. The first cue is warmed up so
    /// `start()` can sound it without delay.
    pub fn initialize(&mut self, preset: &Preset) {
        self.release_ticker();
        self.sequencer
            .initialize(preset.segments.clone(), preset.repeat_count);
        self.preset = Some(preset.clone());
        self.finished = false;
        if let Some(first) = preset.segments.first() {
            self.player.warm_up(first.cue_id());
        }
        debug!(preset = %preset.id, segments = preset.segments.len(), "preset loaded");
    }

    pub fn start(&mut self) -> Result<(), ControlError> {
        if self.preset.is_none() {
            return Err(ControlError::NotInitialized);
        }
        let transition = self.sequencer.start()?;
        self.finished = false;
        self.apply(transition);
        self.sync_ticker();
        info!(preset = ?self.preset.as_ref().map(|p| &p.id), "timer started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        self.sequencer.pause()?;
        self.sync_ticker();
        self.publish(Event::TimerPaused {
            remaining_ms: self.sequencer.remaining_ms(),
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ControlError> {
        self.sequencer.resume()?;
        self.sync_ticker();
        self.publish(Event::TimerResumed {
            remaining_ms: self.sequencer.remaining_ms(),
            at: Utc::now(),
        });
        Ok(())
    }

    /// Cancel the tick loop and reset to the first segment.
    ///
    /// The tick handle is gone before this returns.
    pub fn stop(&mut self) {
        self.release_ticker();
        self.sequencer.stop();
        self.publish(Event::TimerStopped { at: Utc::now() });
    }

    /// Reconcile an edited preset into the live sequencer.
    ///
    /// Ignored (returns false) unless `preset` is the one loaded.
    pub fn reload_preset(&mut self, preset: &Preset) -> bool {
        let loaded = self.preset.as_ref().map(|p| p.id.as_str());
        if loaded != Some(preset.id.as_str()) {
            return false;
        }
        self.sequencer
            .replace_segments(preset.segments.clone(), preset.repeat_count);
        self.preset = Some(preset.clone());
        self.sync_ticker();
        true
    }

    /// Advance the sequencer by `delta_ms` and dispatch what happened.
    ///
    /// Cues are played before the matching events are published.
    pub fn advance(&mut self, delta_ms: f64) -> Vec<Event> {
        let transitions = self.sequencer.tick(delta_ms);
        let events: Vec<Event> = transitions.into_iter().map(|t| self.apply(t)).collect();
        self.sync_ticker();
        events
    }

    /// Wait for the next tick and advance by it.
    ///
    /// Never resolves while the engine is not ticking, which makes it safe
    /// to poll from `tokio::select!` alongside other inputs.
    pub async fn wait_tick(&mut self) -> Vec<Event> {
        let Some(ticker) = self.ticker.as_mut() else {
            return std::future::pending().await;
        };
        let measured = ticker.wait().await;
        let delta = match self.clock {
            TickClock::Nominal => self.tick_interval,
            TickClock::Measured => measured,
        };
        self.advance(delta.as_secs_f64() * 1000.0)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, transition: Transition) -> Event {
        let event = match transition {
            Transition::SegmentStarted {
                segment_index,
                repeat,
            } => {
                let segment = &self.sequencer.segments()[segment_index];
                let event = Event::SegmentStarted {
                    segment_index,
                    repeat,
                    segment_name: segment.name().to_string(),
                    cue_id: segment.cue_id().to_string(),
                    duration_ms: segment.duration_ms(),
                    at: Utc::now(),
                };
                let cue = segment.cue_id().to_string();
                self.player.play(&cue);
                event
            }
            Transition::SequenceCompleted => {
                self.finished = true;
                info!("sequence completed");
                Event::SequenceCompleted {
                    repeat_count: self.sequencer.repeat_count(),
                    at: Utc::now(),
                }
            }
        };
        self.publish(event.clone());
        event
    }

    /// Hold a tick handle iff the sequencer is running and unpaused.
    fn sync_ticker(&mut self) {
        if self.sequencer.is_active() {
            if self.ticker.is_none() {
                self.ticker = Some(TickHandle::acquire(self.tick_interval, &self.registry));
            }
        } else {
            self.release_ticker();
        }
    }

    fn release_ticker(&mut self) {
        self.ticker = None;
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
