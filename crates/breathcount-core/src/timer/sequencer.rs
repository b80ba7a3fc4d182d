//! Segment sequencer.
//!
//! A pure state machine over an ordered list of segments played
//! `repeat_count` times. It knows nothing about wall-clock time: the caller
//! feeds it elapsed milliseconds through `tick()` and gets back the boundary
//! transitions that happened.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -start-> Running <-pause/resume-> Paused
//!   ^              |                       |
//!   +---stop / last boundary---------------+
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::preset::Segment;

/// How `tick()` treats a delta that crosses more than one boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// At most one boundary per tick; time past the boundary is dropped.
    #[default]
    Single,
    /// Keep crossing boundaries until the delta is used up.
    CatchUp,
}

/// Boundary transitions reported by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SegmentStarted { segment_index: usize, repeat: u32 },
    SequenceCompleted,
}

/// Runtime position within a sequence. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    pub current_segment_index: usize,
    pub current_repeat: u32,
    pub remaining_ms: f64,
    pub running: bool,
    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct SegmentSequencer {
    segments: Vec<Segment>,
    repeat_count: u32,
    policy: BoundaryPolicy,
    state: SequencerState,
}

impl Default for SegmentSequencer {
    fn default() -> Self {
        Self::new(BoundaryPolicy::default())
    }
}

impl SegmentSequencer {
    /// An empty, idle sequencer.
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            segments: Vec::new(),
            repeat_count: 1,
            policy,
            state: SequencerState {
                current_segment_index: 0,
                current_repeat: 0,
                remaining_ms: 0.0,
                running: false,
                paused: false,
            },
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.get(self.state.current_segment_index)
    }

    pub fn remaining_ms(&self) -> f64 {
        self.state.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Running and not paused: the only state in which time advances.
    pub fn is_active(&self) -> bool {
        self.state.running && !self.state.paused
    }

    /// 0.0 .. 100.0 progress across every repeat.
    pub fn progress_pct(&self) -> f64 {
        let pass_ms: f64 = self.segments.iter().map(Segment::duration_ms).sum();
        let total = pass_ms * self.repeat_count as f64;
        if total <= 0.0 {
            return 0.0;
        }
        let done_in_pass: f64 = self
            .segments
            .iter()
            .take(self.state.current_segment_index)
            .map(Segment::duration_ms)
            .sum();
        let current = self.current_duration_ms() - self.state.remaining_ms;
        let elapsed = pass_ms * self.state.current_repeat as f64 + done_in_pass + current;
        (elapsed / total * 100.0).clamp(0.0, 100.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Load a new sequence and reset to its first segment, idle.
    ///
    /// An empty `segments` leaves the sequencer idle with nothing to play.
    pub fn initialize(&mut self, segments: Vec<Segment>, repeat_count: u32) {
        self.segments = segments;
        self.repeat_count = repeat_count.max(1);
        self.reset();
    }

    pub fn start(&mut self) -> Result<Transition, ControlError> {
        if self.segments.is_empty() {
            return Err(ControlError::NoSegments);
        }
        if self.state.running {
            return Err(ControlError::AlreadyRunning);
        }
        self.state.running = true;
        self.state.paused = false;
        self.state.remaining_ms = self.current_duration_ms();
        Ok(Transition::SegmentStarted {
            segment_index: self.state.current_segment_index,
            repeat: self.state.current_repeat,
        })
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        if !self.state.running {
            return Err(ControlError::NotRunning);
        }
        if self.state.paused {
            return Err(ControlError::AlreadyPaused);
        }
        self.state.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ControlError> {
        if !self.state.running {
            return Err(ControlError::NotRunning);
        }
        if !self.state.paused {
            return Err(ControlError::NotPaused);
        }
        self.state.paused = false;
        Ok(())
    }

    /// Back to the first segment of the first repeat, idle. Valid from any state.
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Advance by `delta_ms`. No-op unless running and not paused.
    pub fn tick(&mut self, delta_ms: f64) -> Vec<Transition> {
        let mut transitions = Vec::new();
        if !self.is_active() || self.segments.is_empty() {
            return transitions;
        }

        let mut left = delta_ms.max(0.0);
        loop {
            if left < self.state.remaining_ms {
                self.state.remaining_ms -= left;
                break;
            }
            left -= self.state.remaining_ms;
            self.state.remaining_ms = 0.0;

            let transition = self.cross_boundary();
            transitions.push(transition);
            if transition == Transition::SequenceCompleted
                || self.policy == BoundaryPolicy::Single
            {
                break;
            }
        }
        transitions
    }

    /// Swap in an edited segment list and repeat count without restarting.
    ///
    /// Idle: position is clamped and the remaining time re-derived from the
    /// (possibly new) current segment. Running: position is clamped and the
    /// remaining time capped at the current segment's new duration; if the
    /// current segment no longer exists the position lands on the last
    /// segment, from its full duration. An empty list stops the sequencer.
    pub fn replace_segments(&mut self, segments: Vec<Segment>, repeat_count: u32) {
        self.segments = segments;
        self.repeat_count = repeat_count.max(1);

        if self.segments.is_empty() {
            self.reset();
            return;
        }

        let last_index = self.segments.len() - 1;
        let moved = self.state.current_segment_index > last_index;
        self.state.current_segment_index = self.state.current_segment_index.min(last_index);
        self.state.current_repeat = self.state.current_repeat.min(self.repeat_count - 1);

        let full = self.current_duration_ms();
        if !self.state.running || moved {
            self.state.remaining_ms = full;
        } else {
            self.state.remaining_ms = self.state.remaining_ms.min(full);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn current_duration_ms(&self) -> f64 {
        self.current_segment().map(Segment::duration_ms).unwrap_or(0.0)
    }

    fn reset(&mut self) {
        self.state = SequencerState {
            current_segment_index: 0,
            current_repeat: 0,
            remaining_ms: self.segments.first().map(Segment::duration_ms).unwrap_or(0.0),
            running: false,
            paused: false,
        };
    }

    fn cross_boundary(&mut self) -> Transition {
        let next = self.state.current_segment_index + 1;
        if next < self.segments.len() {
            self.state.current_segment_index = next;
            self.state.remaining_ms = self.current_duration_ms();
            return Transition::SegmentStarted {
                segment_index: next,
                repeat: self.state.current_repeat,
            };
        }

        let next_repeat = self.state.current_repeat + 1;
        if next_repeat < self.repeat_count {
            self.state.current_repeat = next_repeat;
            self.state.current_segment_index = 0;
            self.state.remaining_ms = self.current_duration_ms();
            return Transition::SegmentStarted {
                segment_index: 0,
                repeat: next_repeat,
            };
        }

        self.reset();
        Transition::SequenceCompleted
    }
}
