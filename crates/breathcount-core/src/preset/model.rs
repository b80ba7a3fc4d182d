use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest allowed segment name, in characters.
pub const MAX_SEGMENT_NAME_CHARS: usize = 10;
/// Longest allowed preset name, in characters.
pub const MAX_PRESET_NAME_CHARS: usize = 20;

/// Cue ids shipped with the app, assigned round-robin to new segments.
pub const DEFAULT_CUES: [&str; 3] = ["ding", "windchime", "metallophone"];

/// One named, fixed-duration phase of a pass.
///
/// Fields are private so that every `Segment` in existence went through
/// validation, including ones read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    name: String,
    duration_secs: f64,
    cue_id: String,
}

#[derive(Deserialize)]
struct RawSegment {
    name: String,
    duration_secs: f64,
    cue_id: String,
}

impl TryFrom<RawSegment> for Segment {
    type Error = ValidationError;

    fn try_from(raw: RawSegment) -> Result<Self, Self::Error> {
        Segment::new(raw.name, raw.duration_secs, raw.cue_id)
    }
}

impl Segment {
    pub fn new(
        name: impl Into<String>,
        duration_secs: f64,
        cue_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySegmentName);
        }
        let len = trimmed.chars().count();
        if len > MAX_SEGMENT_NAME_CHARS {
            return Err(ValidationError::SegmentNameTooLong {
                len,
                max: MAX_SEGMENT_NAME_CHARS,
            });
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ValidationError::NonPositiveDuration {
                value: duration_secs,
            });
        }
        Ok(Self {
            name: trimmed.to_string(),
            duration_secs,
            cue_id: cue_id.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs * 1000.0
    }

    pub fn cue_id(&self) -> &str {
        &self.cue_id
    }
}

/// A named, repeatable list of segments.
///
/// An empty segment list is a valid stored state; it cannot be played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub repeat_count: u32,
}

impl Preset {
    /// The preset seeded on first run and after a schema change.
    pub fn bedtime_breathing() -> Self {
        let seg = |name: &str, secs: f64, cue: &str| Segment {
            name: name.into(),
            duration_secs: secs,
            cue_id: cue.into(),
        };
        Self {
            id: "preset_1".into(),
            name: "Bedtime Breathing".into(),
            segments: vec![
                seg("Inhale", 2.0, DEFAULT_CUES[0]),
                seg("Hold", 2.0, DEFAULT_CUES[1]),
                seg("Exhale", 4.0, DEFAULT_CUES[2]),
            ],
            repeat_count: 25,
        }
    }

    /// Validate a preset name, returning the trimmed form.
    pub fn validate_name(name: &str) -> Result<String, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPresetName);
        }
        let len = trimmed.chars().count();
        if len > MAX_PRESET_NAME_CHARS {
            return Err(ValidationError::PresetNameTooLong {
                len,
                max: MAX_PRESET_NAME_CHARS,
            });
        }
        Ok(trimmed.to_string())
    }

    /// Checks the invariants serde cannot express on its own.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.repeat_count < 1 {
            return Err(ValidationError::RepeatCountTooLow {
                value: self.repeat_count as i64,
            });
        }
        Ok(())
    }

    /// Length of one pass in milliseconds.
    pub fn pass_ms(&self) -> f64 {
        self.segments.iter().map(Segment::duration_ms).sum()
    }

    /// Length of the whole sequence in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.pass_ms() * self.repeat_count as f64
    }
}

/// Every stored preset. Ids are unique across the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCollection {
    presets: Vec<Preset>,
}

impl PresetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in collection: a single "Bedtime Breathing" preset.
    pub fn seeded() -> Self {
        Self {
            presets: vec![Preset::bedtime_breathing()],
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Preset> {
        self.presets.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert or replace by id, keeping the position of an existing entry.
    pub fn upsert(&mut self, preset: Preset) {
        match self.get_mut(&preset.id) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    /// Remove the preset with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        self.presets.len() != before
    }

    /// Validate every preset and the id uniqueness invariant.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for preset in &self.presets {
            if !seen.insert(preset.id.as_str()) {
                return Err(format!("duplicate preset id '{}'", preset.id));
            }
            preset
                .validate()
                .map_err(|e| format!("preset '{}': {e}", preset.id))?;
        }
        Ok(())
    }
}

/// Cue for the segment appended at `position`, cycling through `cues`.
pub fn round_robin_cue<S: AsRef<str>>(position: usize, cues: &[S]) -> String {
    if cues.is_empty() {
        return DEFAULT_CUES[position % DEFAULT_CUES.len()].to_string();
    }
    cues[position % cues.len()].as_ref().to_string()
}
