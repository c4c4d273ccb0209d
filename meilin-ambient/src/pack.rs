//! Serialized behavior packs.
//!
//! A pack is one JSON document with `behaviors`, optional `modes`,
//! optional `settings`, optional `idle_responses` and optional `clips`.
//! Keys from the older flat format (`text`, `weight`, `min_interval`,
//! `name`, `context`, `behavior_multipliers`, `suppress`,
//! `ambient_behaviors`) are accepted as aliases.
//!
//! [`AmbientPack::into_parts`] does all load-time validation. A pack that
//! converts cleanly can never make a selector fail on catalogue grounds.

use crate::catalog::BehaviorCatalog;
use crate::clips::{ClipEntry, ClipResponder, DEFAULT_CLIP_DIRECTORY};
use crate::error::{AmbientError, Result};
use crate::idle::{DEFAULT_CACHE_DIRECTORY, IdleResponder, IdleResponseEntry};
use crate::modes::ModeTable;
use crate::selector::BehaviorSelector;
use crate::types::{Behavior, BehaviorId, ModeId, PersonalityMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The MeiLin catalogue: 29 behaviors, 9 personality modes, idle responses.
pub const BUILTIN_PACK_JSON: &str = include_str!("../data/meilin_pack.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEntry {
    pub id: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(alias = "text")]
    pub utterances: Vec<String>,
    pub sounds: Vec<String>,
    #[serde(alias = "weight")]
    pub base_weight: f64,
    #[serde(default, alias = "min_interval")]
    pub min_interval_seconds: f64,
    #[serde(default, alias = "context", skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEntry {
    pub id: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "behavior_multipliers")]
    pub multipliers: BTreeMap<String, f64>,
    #[serde(default, alias = "suppress")]
    pub suppressed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackSettings {
    /// Mode a fresh selector starts in.
    pub default_mode: String,
    /// Directory holding pre-generated idle response audio.
    pub cache_directory: String,
    /// Directory holding ambient clip audio.
    pub clip_directory: String,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            default_mode: ModeId::default().to_string(),
            cache_directory: DEFAULT_CACHE_DIRECTORY.to_owned(),
            clip_directory: DEFAULT_CLIP_DIRECTORY.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientPack {
    pub behaviors: Vec<BehaviorEntry>,
    #[serde(default)]
    pub modes: Vec<ModeEntry>,
    #[serde(default)]
    pub settings: PackSettings,
    #[serde(default)]
    pub idle_responses: Vec<IdleResponseEntry>,
    #[serde(default, alias = "ambient_behaviors", skip_serializing_if = "Vec::is_empty")]
    pub clips: Vec<ClipEntry>,
}

/// A validated pack, ready to drive a selector.
#[derive(Debug, Clone)]
pub struct PackParts {
    pub catalog: BehaviorCatalog,
    pub modes: ModeTable,
    pub settings: PackSettings,
    pub idle: IdleResponder,
    pub clips: ClipResponder,
}

impl PackParts {
    /// Build a selector starting in the pack's default mode.
    ///
    /// Clips are dropped; destructure the parts to keep them.
    pub fn into_selector(self) -> Result<(BehaviorSelector, IdleResponder, PackSettings)> {
        let selector =
            BehaviorSelector::new(self.catalog, self.modes, &self.settings.default_mode)?;
        Ok((selector, self.idle, self.settings))
    }
}

impl AmbientPack {
    /// # Errors
    ///
    /// Returns [`AmbientError::Pack`] if `json` is not a valid pack document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AmbientError::Pack(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`AmbientError::Io`] if the file cannot be read, or
    /// [`AmbientError::Pack`] if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_PACK_JSON)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AmbientError::Pack(e.to_string()))
    }

    /// Validate every entry and build the runtime tables.
    ///
    /// A pack without modes gets a single neutral mode named after
    /// `settings.default_mode`.
    ///
    /// # Errors
    ///
    /// Returns [`AmbientError::Configuration`] for any malformed behavior or
    /// mode, a dangling behavior reference, a malformed clip, or a
    /// `default_mode` that the mode table does not define.
    pub fn into_parts(self) -> Result<PackParts> {
        let behaviors = self
            .behaviors
            .into_iter()
            .map(behavior_from_entry)
            .collect::<Result<Vec<_>>>()?;
        let catalog = BehaviorCatalog::new(behaviors)?;

        let modes = if self.modes.is_empty() {
            ModeTable::single_neutral(&self.settings.default_mode)
        } else {
            let modes = self.modes.into_iter().map(mode_from_entry).collect();
            ModeTable::new(modes, &catalog)?
        };
        if !modes.contains(&self.settings.default_mode) {
            return Err(AmbientError::Configuration(format!(
                "default_mode {} is not a defined personality mode",
                self.settings.default_mode
            )));
        }

        let idle = IdleResponder::new(self.idle_responses, &self.settings.cache_directory);
        let clips = ClipResponder::new(self.clips, &self.settings.clip_directory)?;
        Ok(PackParts {
            catalog,
            modes,
            settings: self.settings,
            idle,
            clips,
        })
    }
}

fn behavior_from_entry(entry: BehaviorEntry) -> Result<Behavior> {
    let interval = entry.min_interval_seconds;
    if !interval.is_finite() || interval < 0.0 {
        return Err(AmbientError::Configuration(format!(
            "behavior {}: min_interval_seconds must be a non-negative number, got {interval}",
            entry.id
        )));
    }
    let min_interval = Duration::try_from_secs_f64(interval).map_err(|e| {
        AmbientError::Configuration(format!(
            "behavior {}: min_interval_seconds {interval}: {e}",
            entry.id
        ))
    })?;
    Ok(Behavior {
        display_name: entry.display_name.unwrap_or_else(|| entry.id.clone()),
        id: BehaviorId::new(entry.id),
        utterances: entry.utterances,
        sounds: entry.sounds,
        base_weight: entry.base_weight,
        min_interval,
        contexts: entry.contexts.into_iter().collect(),
    })
}

fn mode_from_entry(entry: ModeEntry) -> PersonalityMode {
    PersonalityMode {
        display_name: entry.display_name.unwrap_or_else(|| entry.id.clone()),
        id: ModeId::new(entry.id),
        description: entry.description,
        multipliers: entry
            .multipliers
            .into_iter()
            .map(|(id, m)| (BehaviorId::new(id), m))
            .collect(),
        suppressed: entry.suppressed.into_iter().map(BehaviorId::new).collect(),
    }
}
