//! Segment timing: the pure sequencer, its tick source, and the engine that
//! joins them to audio and events.

mod engine;
mod sequencer;
mod ticker;

pub use engine::{format_remaining, EngineSnapshot, TimerEngine};
pub use sequencer::{BoundaryPolicy, SegmentSequencer, SequencerState, Transition};
pub use ticker::{TickHandle, TickerRegistry};
