//! Validated edits to a single preset.
//!
//! Every edit builds and checks its new values before touching the preset,
//! so a rejected edit leaves it unchanged.

use serde::{Deserialize, Serialize};

use super::model::{round_robin_cue, Preset, Segment};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PresetEdit {
    /// Append a segment. Its cue is picked round-robin by position.
    AddSegment { name: String, duration_secs: f64 },
    /// Replace a segment. The existing cue is kept.
    EditSegment {
        index: usize,
        name: String,
        duration_secs: f64,
    },
    RemoveSegment { index: usize },
    SetRepeatCount { count: i64 },
    Rename { name: String },
}

impl PresetEdit {
    /// Apply to `preset`, drawing new cues from `cues`.
    pub fn apply<S: AsRef<str>>(
        &self,
        preset: &mut Preset,
        cues: &[S],
    ) -> Result<(), ValidationError> {
        match self {
            PresetEdit::AddSegment {
                name,
                duration_secs,
            } => {
                let cue = round_robin_cue(preset.segments.len(), cues);
                let segment = Segment::new(name.as_str(), *duration_secs, cue)?;
                preset.segments.push(segment);
            }
            PresetEdit::EditSegment {
                index,
                name,
                duration_secs,
            } => {
                let existing = preset.segments.get(*index).ok_or(
                    ValidationError::SegmentIndexOutOfRange {
                        index: *index,
                        len: preset.segments.len(),
                    },
                )?;
                let segment = Segment::new(name.as_str(), *duration_secs, existing.cue_id())?;
                preset.segments[*index] = segment;
            }
            PresetEdit::RemoveSegment { index } => {
                if *index >= preset.segments.len() {
                    return Err(ValidationError::SegmentIndexOutOfRange {
                        index: *index,
                        len: preset.segments.len(),
                    });
                }
                preset.segments.remove(*index);
            }
            PresetEdit::SetRepeatCount { count } => {
                if *count < 1 || *count > u32::MAX as i64 {
                    return Err(ValidationError::RepeatCountTooLow { value: *count });
                }
                preset.repeat_count = *count as u32;
            }
            PresetEdit::Rename { name } => {
                preset.name = Preset::validate_name(name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::model::DEFAULT_CUES;

    fn empty() -> Preset {
        Preset {
            id: "p".into(),
            name: "Test".into(),
            segments: vec![],
            repeat_count: 1,
        }
    }

    fn add(name: &str, secs: f64) -> PresetEdit {
        PresetEdit::AddSegment {
            name: name.into(),
            duration_secs: secs,
        }
    }

    #[test]
    fn add_assigns_cues_round_robin() {
        let mut p = empty();
        for name in ["a", "b", "c", "d"] {
            add(name, 1.0).apply(&mut p, &DEFAULT_CUES[..]).unwrap();
        }
        let cues: Vec<_> = p.segments.iter().map(|s| s.cue_id()).collect();
        assert_eq!(cues, ["ding", "windchime", "metallophone", "ding"]);
    }

    #[test]
    fn edit_keeps_original_cue() {
        let mut p = Preset::bedtime_breathing();
        PresetEdit::EditSegment {
            index: 2,
            name: "Out".into(),
            duration_secs: 6.5,
        }
        .apply(&mut p, &DEFAULT_CUES[..])
        .unwrap();
        assert_eq!(p.segments[2].name(), "Out");
        assert_eq!(p.segments[2].duration_secs(), 6.5);
        assert_eq!(p.segments[2].cue_id(), "metallophone");
    }

    #[test]
    fn rejected_edits_leave_preset_untouched() {
        let mut p = Preset::bedtime_breathing();
        let before = p.clone();

        let err = add("", 2.0).apply(&mut p, &DEFAULT_CUES[..]).unwrap_err();
        assert_eq!(err.code(), "empty_segment_name");

        let err = PresetEdit::EditSegment {
            index: 0,
            name: "In".into(),
            duration_secs: 0.0,
        }
        .apply(&mut p, &DEFAULT_CUES[..])
        .unwrap_err();
        assert_eq!(err.code(), "non_positive_duration");

        let err = PresetEdit::RemoveSegment { index: 3 }
            .apply(&mut p, &DEFAULT_CUES[..])
            .unwrap_err();
        assert_eq!(err.code(), "segment_index_out_of_range");

        let err = PresetEdit::SetRepeatCount { count: 0 }
            .apply(&mut p, &DEFAULT_CUES[..])
            .unwrap_err();
        assert_eq!(err.code(), "repeat_count_too_low");

        assert_eq!(p, before);
    }

    #[test]
    fn rename_trims_and_limits() {
        let mut p = empty();
        PresetEdit::Rename {
            name: "  Box Breathing ".into(),
        }
        .apply(&mut p, &DEFAULT_CUES[..])
        .unwrap();
        assert_eq!(p.name, "Box Breathing");

        let err = PresetEdit::Rename {
            name: "x".repeat(21),
        }
        .apply(&mut p, &DEFAULT_CUES[..])
        .unwrap_err();
        assert_eq!(err.code(), "preset_name_too_long");
    }

    #[test]
    fn remove_then_set_repeat() {
        let mut p = Preset::bedtime_breathing();
        PresetEdit::RemoveSegment { index: 1 }
            .apply(&mut p, &DEFAULT_CUES[..])
            .unwrap();
        PresetEdit::SetRepeatCount { count: 4 }
            .apply(&mut p, &DEFAULT_CUES[..])
            .unwrap();
        let names: Vec<_> = p.segments.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["Inhale", "Exhale"]);
        assert_eq!(p.repeat_count, 4);
    }
}
