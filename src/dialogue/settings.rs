//! Dialogue tuning knobs loaded from `config/dialogue.toml`.
use std::{fs, path::Path};

use bevy::prelude::*;
use serde::Deserialize;

const CONFIG_PATH: &str = "config/dialogue.toml";

#[derive(Debug, Clone, Deserialize, Default)]
struct RawDialogueConfig {
    #[serde(default)]
    proximity: RawProximitySection,
    #[serde(default)]
    pacing: RawPacingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawProximitySection {
    interaction_range: f32,
}

impl Default for RawProximitySection {
    fn default() -> Self {
        Self {
            interaction_range: 64.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawPacingSection {
    auto_advance_dwell_seconds: f32,
    characters_per_second: f32,
}

impl Default for RawPacingSection {
    fn default() -> Self {
        Self {
            auto_advance_dwell_seconds: 2.0,
            characters_per_second: 30.0,
        }
    }
}

/// Tunable parameters for proximity detection and line pacing.
#[derive(Resource, Debug, Clone)]
pub struct DialogueSettings {
    /// World-unit radius within which characters count as "in range".
    pub interaction_range: f32,
    /// Pause after an auto-advance state finishes printing, before the
    /// conversation moves on by itself.
    pub auto_advance_dwell_seconds: f32,
    /// Typewriter reveal speed for dialogue boxes.
    pub characters_per_second: f32,
}

impl DialogueSettings {
    pub fn load_or_default() -> Self {
        let path = Path::new(CONFIG_PATH);
        match fs::read_to_string(path) {
            Ok(data) => match toml::from_str::<RawDialogueConfig>(&data) {
                Ok(raw) => raw.into(),
                Err(err) => {
                    warn!(
                        "Failed to parse {} ({}). Falling back to defaults.",
                        CONFIG_PATH, err
                    );
                    RawDialogueConfig::default().into()
                }
            },
            Err(err) => {
                warn!(
                    "Failed to read {} ({}). Falling back to defaults.",
                    CONFIG_PATH, err
                );
                RawDialogueConfig::default().into()
            }
        }
    }
}

impl Default for DialogueSettings {
    fn default() -> Self {
        RawDialogueConfig::default().into()
    }
}

impl From<RawDialogueConfig> for DialogueSettings {
    fn from(value: RawDialogueConfig) -> Self {
        Self {
            interaction_range: value.proximity.interaction_range.max(0.0),
            auto_advance_dwell_seconds: value.pacing.auto_advance_dwell_seconds.max(0.0),
            characters_per_second: value.pacing.characters_per_second.max(1.0),
        }
    }
}
