//! Preset management commands for CLI.

use breathcount_core::{CoreError, PresetEdit, ValidationError};
use clap::Subcommand;

use super::{open_store, CliResult};

#[derive(Subcommand)]
pub enum PresetAction {
    /// List all presets
    List,
    /// Show one preset
    Show {
        /// Preset ID
        id: String,
    },
    /// Create an empty preset
    Create {
        /// Preset name (up to 20 characters)
        name: String,
    },
    /// Rename a preset
    Rename {
        /// Preset ID
        id: String,
        /// New name
        name: String,
    },
    /// Delete a preset
    Delete {
        /// Preset ID
        id: String,
    },
    /// Discard all presets and restore the built-in ones
    Reset,
}

pub fn run(action: PresetAction) -> CliResult {
    let store = open_store()?;

    match action {
        PresetAction::List => {
            let presets = store.list()?;
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
        PresetAction::Show { id } => {
            let preset = store.get(&id)?.ok_or_else(|| not_found(&id))?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Create { name } => {
            let preset = store.create_preset(&name)?;
            eprintln!("Preset created: {}", preset.id);
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Rename { id, name } => {
            let preset = store.apply_edit(&id, &PresetEdit::Rename { name })?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Delete { id } => {
            if !store.delete(&id)? {
                return Err(not_found(&id).into());
            }
            eprintln!("Preset deleted: {id}");
        }
        PresetAction::Reset => {
            let presets = store.reset_to_defaults()?;
            eprintln!("Presets reset to defaults");
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
    }
    Ok(())
}

pub(crate) fn not_found(id: &str) -> CoreError {
    ValidationError::PresetNotFound { id: id.to_string() }.into()
}
