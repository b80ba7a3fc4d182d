pub mod config;
pub mod play;
pub mod preset;
pub mod segment;

use breathcount_core::storage::{Config, PresetStore};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the preset store, handing out the configured cues to new segments.
pub fn open_store() -> Result<PresetStore, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    Ok(PresetStore::open()?.with_cues(config.audio.cue_ids()))
}
