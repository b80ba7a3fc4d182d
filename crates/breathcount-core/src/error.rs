//! Core error types for breathcount-core.
//!
//! The hierarchy follows how failures are handled at runtime:
//! validation and control errors are handed back to the caller with a
//! reason code, storage and audio errors are mostly recovered locally
//! and only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathcount-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rejected edits
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Rejected timer commands
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// Audio errors that escaped local recovery
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Machine-readable reason code for errors that carry one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CoreError::Validation(e) => Some(e.code()),
            CoreError::Control(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Edits rejected before any state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("segment name must not be empty")]
    EmptySegmentName,

    #[error("segment name is {len} characters, at most {max} allowed")]
    SegmentNameTooLong { len: usize, max: usize },

    #[error("segment duration must be greater than 0 seconds (got {value})")]
    NonPositiveDuration { value: f64 },

    #[error("repeat count must be at least 1 (got {value})")]
    RepeatCountTooLow { value: i64 },

    #[error("preset name must not be empty")]
    EmptyPresetName,

    #[error("preset name is {len} characters, at most {max} allowed")]
    PresetNameTooLong { len: usize, max: usize },

    #[error("segment index {index} out of range (preset has {len} segments)")]
    SegmentIndexOutOfRange { index: usize, len: usize },

    #[error("no preset with id '{id}'")]
    PresetNotFound { id: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptySegmentName => "empty_segment_name",
            ValidationError::SegmentNameTooLong { .. } => "segment_name_too_long",
            ValidationError::NonPositiveDuration { .. } => "non_positive_duration",
            ValidationError::RepeatCountTooLow { .. } => "repeat_count_too_low",
            ValidationError::EmptyPresetName => "empty_preset_name",
            ValidationError::PresetNameTooLong { .. } => "preset_name_too_long",
            ValidationError::SegmentIndexOutOfRange { .. } => "segment_index_out_of_range",
            ValidationError::PresetNotFound { .. } => "preset_not_found",
        }
    }
}

/// Timer commands issued in a state that does not accept them.
///
/// A rejected command leaves the sequencer untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("add at least one segment before starting")]
    NoSegments,

    #[error("timer is already running")]
    AlreadyRunning,

    #[error("timer is not running")]
    NotRunning,

    #[error("timer is not paused")]
    NotPaused,

    #[error("timer is already paused")]
    AlreadyPaused,

    #[error("no preset loaded")]
    NotInitialized,
}

impl ControlError {
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::NoSegments => "no_segments",
            ControlError::AlreadyRunning => "already_running",
            ControlError::NotRunning => "not_running",
            ControlError::NotPaused => "not_paused",
            ControlError::AlreadyPaused => "already_paused",
            ControlError::NotInitialized => "not_initialized",
        }
    }
}

/// Audio errors. `AudioCueLibrary` logs and swallows these.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to decode cue '{cue_id}': {message}")]
    Decode { cue_id: String, message: String },

    #[error("Failed to open audio output: {0}")]
    Stream(String),

    #[error("Failed to play audio: {0}")]
    Play(String),

    #[error("Audio output unavailable")]
    Unavailable,

    #[error("Unknown cue '{0}'")]
    UnknownCue(String),

    #[error("IO error reading cue: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
