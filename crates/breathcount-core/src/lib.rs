//! # Breathcount Core Library
//!
//! Core logic for Breathcount, a segmented interval timer for paced breathing
//! and similar routines. A preset is an ordered list of named, timed segments
//! repeated a number of times; each segment start is marked by an audio cue.
//!
//! ## Architecture
//!
//! - **Sequencer**: a pure state machine advanced by explicit `tick(delta)`
//!   calls, with no clock of its own
//! - **Engine**: drives the sequencer from a cancellable tick source, plays
//!   cues and publishes events
//! - **Audio**: a cue library with in-memory buffers and a streaming fallback
//! - **Storage**: SQLite-backed preset collection and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: real-time driver over [`SegmentSequencer`]
//! - [`PresetStore`]: versioned, transactional preset persistence
//! - [`AudioCueLibrary`]: cue playback
//! - [`Config`]: application configuration management

pub mod audio;
pub mod error;
pub mod events;
pub mod preset;
pub mod storage;
pub mod timer;

pub use audio::{AudioCueLibrary, CuePlayer};
pub use error::{AudioError, ConfigError, ControlError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use preset::{Preset, PresetCollection, PresetEdit, Segment};
pub use storage::{Config, Database, PresetStore};
pub use timer::{format_remaining, EngineSnapshot, SegmentSequencer, TimerEngine, Transition};
