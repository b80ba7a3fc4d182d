//! Segment and repeat editing commands for CLI.
//!
//! Every edit goes through the store's read-modify-write path and prints the
//! updated preset.

use breathcount_core::PresetEdit;
use clap::Subcommand;

use super::{open_store, CliResult};

#[derive(Subcommand)]
pub enum SegmentAction {
    /// Append a segment; its cue is assigned round-robin
    Add {
        /// Preset ID
        preset: String,
        /// Segment name (up to 10 characters)
        name: String,
        /// Duration in seconds
        #[arg(allow_negative_numbers = true)]
        secs: f64,
    },
    /// Rename and retime a segment, keeping its cue
    Edit {
        /// Preset ID
        preset: String,
        /// Zero-based segment index
        index: usize,
        /// New segment name
        name: String,
        /// New duration in seconds
        #[arg(allow_negative_numbers = true)]
        secs: f64,
    },
    /// Remove a segment
    Remove {
        /// Preset ID
        preset: String,
        /// Zero-based segment index
        index: usize,
    },
}

pub fn run(action: SegmentAction) -> CliResult {
    let (preset, edit) = match action {
        SegmentAction::Add { preset, name, secs } => (
            preset,
            PresetEdit::AddSegment {
                name,
                duration_secs: secs,
            },
        ),
        SegmentAction::Edit {
            preset,
            index,
            name,
            secs,
        } => (
            preset,
            PresetEdit::EditSegment {
                index,
                name,
                duration_secs: secs,
            },
        ),
        SegmentAction::Remove { preset, index } => (preset, PresetEdit::RemoveSegment { index }),
    };
    apply(&preset, &edit)
}

pub fn set_repeat(preset: &str, count: i64) -> CliResult {
    apply(preset, &PresetEdit::SetRepeatCount { count })
}

fn apply(preset: &str, edit: &PresetEdit) -> CliResult {
    let store = open_store()?;
    let updated = store.apply_edit(preset, edit)?;
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}
