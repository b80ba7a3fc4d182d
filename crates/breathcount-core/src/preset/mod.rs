mod edit;
mod model;

pub use edit::PresetEdit;
pub use model::{
    round_robin_cue, Preset, PresetCollection, Segment, DEFAULT_CUES, MAX_PRESET_NAME_CHARS,
    MAX_SEGMENT_NAME_CHARS,
};
