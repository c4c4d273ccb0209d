//! Core data model: behaviors, personality modes, timestamps and selections.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// Opaque key identifying a [`Behavior`] (e.g. `"sigh"`, `"giggle"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(String);

impl BehaviorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BehaviorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque key identifying a [`PersonalityMode`] (e.g. `"sleepy"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(String);

impl ModeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A point on the selector's timeline, in milliseconds from an origin
/// chosen by the [`Clock`](crate::clock::Clock).
///
/// Only differences between timestamps carry meaning. A later timestamp
/// that compares smaller than an earlier one (a clock that stepped back)
/// yields zero elapsed time rather than an underflow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, saturating at zero.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

/// A named, reusable ambient reaction.
///
/// Behaviors are immutable once loaded into a
/// [`BehaviorCatalog`](crate::catalog::BehaviorCatalog), which enforces the
/// invariants: positive finite weight, non-empty utterances and sounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub id: BehaviorId,
    pub display_name: String,
    /// Candidate spoken text variants.
    pub utterances: Vec<String>,
    /// Candidate short vocalizations, sampled independently of `utterances`.
    pub sounds: Vec<String>,
    /// Relative likelihood versus other eligible behaviors.
    pub base_weight: f64,
    /// Minimum time between two selections of this behavior.
    pub min_interval: Duration,
    /// Context tags this behavior suits. Empty means any context.
    pub contexts: BTreeSet<String>,
}

impl Behavior {
    /// Whether this behavior may be offered for `tag`.
    pub fn matches_context(&self, tag: &str) -> bool {
        self.contexts.is_empty() || self.contexts.contains(tag)
    }
}

/// A named override profile that boosts or suppresses behaviors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersonalityMode {
    pub id: ModeId,
    pub display_name: String,
    pub description: String,
    /// Per-behavior weight multipliers; absent entries mean `1.0`.
    pub multipliers: HashMap<BehaviorId, f64>,
    /// Behaviors never eligible while this mode is active.
    pub suppressed: HashSet<BehaviorId>,
}

impl PersonalityMode {
    /// A mode with no overrides.
    pub fn neutral(id: impl Into<String>) -> Self {
        let id = ModeId::new(id);
        Self {
            display_name: id.to_string(),
            id,
            ..Default::default()
        }
    }

    pub fn is_suppressed(&self, id: &BehaviorId) -> bool {
        self.suppressed.contains(id)
    }

    pub fn multiplier(&self, id: &BehaviorId) -> f64 {
        self.multipliers.get(id).copied().unwrap_or(1.0)
    }
}

impl Default for ModeId {
    fn default() -> Self {
        Self::new("normal")
    }
}

/// The outcome of a successful draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub behavior_id: BehaviorId,
    pub display_name: String,
    pub chosen_utterance: String,
    pub chosen_sound: String,
    pub mode_id: ModeId,
    /// `true` only when a context-filtered draw found a matching behavior.
    /// Unfiltered draws and context fallbacks carry `false`.
    pub matched_context: bool,
    pub fired_at: Timestamp,
}
