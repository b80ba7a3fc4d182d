use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every engine state change produces an Event.
/// The CLI prints them; subscribers receive them over a broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A segment began, either from `start()` or at a boundary.
    SegmentStarted {
        segment_index: usize,
        repeat: u32,
        segment_name: String,
        cue_id: String,
        duration_ms: f64,
        at: DateTime<Utc>,
    },
    /// The last segment of the last repeat ran out.
    SequenceCompleted {
        repeat_count: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: f64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: f64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            Event::SegmentStarted { .. } | Event::SequenceCompleted { .. }
        )
    }
}
