//! Short pre-recorded ambient clips for conversational moments.
//!
//! Unlike selector behaviors, clips play around a request: while waiting
//! on an API, right after a voice command, or during processing. Every clip
//! has a `type` (`yawn`, `hmm`, ...). Cooldowns are tracked per type, so two
//! recordings of the same sound share one interval.
//!
//! A pick looks for ready clips tagged with the context and falls back to
//! ready clips tagged `idle`.

use crate::error::{AmbientError, Result};
use crate::history::{CooldownState, SelectionHistory};
use crate::random::{RandomSource, weighted_index};
use crate::types::{BehaviorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const WAITING_CONTEXT: &str = "waiting_api";
pub const AFTER_COMMAND_CONTEXT: &str = "after_command";
pub const PROCESSING_CONTEXT: &str = "processing";
pub const CLIP_IDLE_CONTEXT: &str = "idle";

/// Default directory holding the clip audio.
pub const DEFAULT_CLIP_DIRECTORY: &str = "static/ambient_behaviors";

fn default_clip_weight() -> f64 {
    1.0
}

/// One clip as it appears in a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub filename: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_clip_weight")]
    pub weight: f64,
    #[serde(default)]
    pub min_interval_seconds: f64,
}

/// A picked clip with its resolved audio path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbientClip {
    pub id: String,
    pub kind: String,
    pub text: String,
    pub filename: String,
    pub audio_path: PathBuf,
    pub emotion: String,
    pub contexts: Vec<String>,
    pub weight: f64,
    /// `false` when the pick came from the `idle` fallback.
    pub matched_context: bool,
}

#[derive(Debug, Clone)]
struct Clip {
    entry: ClipEntry,
    kind: BehaviorId,
    min_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ClipResponder {
    clips: Vec<Clip>,
    cache_directory: PathBuf,
    history: SelectionHistory,
}

impl ClipResponder {
    /// # Errors
    ///
    /// Returns [`AmbientError::Configuration`] for a blank or duplicate id,
    /// a blank type, a weight that is not a positive finite number, or an
    /// unusable `min_interval_seconds`.
    pub fn new(entries: Vec<ClipEntry>, cache_directory: impl Into<PathBuf>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut clips = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.id.clone();
            if id.trim().is_empty() {
                return Err(AmbientError::Configuration("clip id must not be empty".into()));
            }
            if !seen.insert(id.clone()) {
                return Err(AmbientError::Configuration(format!("duplicate clip id: {id}")));
            }
            if entry.kind.trim().is_empty() {
                return Err(AmbientError::Configuration(format!(
                    "clip {id}: type must not be empty"
                )));
            }
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(AmbientError::Configuration(format!(
                    "clip {id}: weight must be a positive number, got {}",
                    entry.weight
                )));
            }
            let min_interval = interval_from_secs(&id, entry.min_interval_seconds)?;
            clips.push(Clip {
                kind: BehaviorId::new(entry.kind.clone()),
                entry,
                min_interval,
            });
        }
        Ok(Self {
            clips,
            cache_directory: cache_directory.into(),
            history: SelectionHistory::new(),
        })
    }

    pub fn empty() -> Self {
        Self {
            clips: Vec::new(),
            cache_directory: PathBuf::from(DEFAULT_CLIP_DIRECTORY),
            history: SelectionHistory::new(),
        }
    }

    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = dir.into();
        self
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Weighted pick among ready clips for `context`, else among ready
    /// `idle` clips. Records the chosen clip's type at `now`.
    pub fn pick(
        &mut self,
        context: &str,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Option<AmbientClip> {
        let mut matched_context = true;
        let mut candidates = self.ready(context, now);
        if candidates.is_empty() {
            debug!(context, "no ready clip for context, trying idle clips");
            matched_context = false;
            candidates = self.ready(CLIP_IDLE_CONTEXT, now);
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|&i| self.clips[i].entry.weight)
            .collect();
        let chosen = &self.clips[candidates[weighted_index(&weights, rng)?]];
        self.history.record(chosen.kind.clone(), now);

        let entry = &chosen.entry;
        Some(AmbientClip {
            id: entry.id.clone(),
            kind: entry.kind.clone(),
            text: entry.text.clone(),
            filename: entry.filename.clone(),
            audio_path: self.cache_directory.join(&entry.filename),
            emotion: entry.emotion.clone(),
            contexts: entry.context.clone(),
            weight: entry.weight,
            matched_context,
        })
    }

    pub fn waiting(&mut self, now: Timestamp, rng: &mut dyn RandomSource) -> Option<AmbientClip> {
        self.pick(WAITING_CONTEXT, now, rng)
    }

    pub fn after_command(
        &mut self,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Option<AmbientClip> {
        self.pick(AFTER_COMMAND_CONTEXT, now, rng)
    }

    pub fn processing(
        &mut self,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Option<AmbientClip> {
        self.pick(PROCESSING_CONTEXT, now, rng)
    }

    /// Cooldown of a clip type, using the longest interval among its clips.
    pub fn cooldown_state(&self, kind: &str, now: Timestamp) -> Option<CooldownState> {
        let kind = BehaviorId::new(kind);
        let interval = self
            .clips
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.min_interval)
            .max()?;
        Some(self.history.cooldown_for(&kind, interval, now))
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    fn ready(&self, context: &str, now: Timestamp) -> Vec<usize> {
        self.clips
            .iter()
            .enumerate()
            .filter(|(_, c)| c.entry.context.iter().any(|x| x == context))
            .filter(|(_, c)| {
                self.history.cooldown_for(&c.kind, c.min_interval, now) == CooldownState::Ready
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn interval_from_secs(id: &str, secs: f64) -> Result<Duration> {
    if secs < 0.0 {
        return Err(AmbientError::Configuration(format!(
            "clip {id}: min_interval_seconds must not be negative, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| {
        AmbientError::Configuration(format!("clip {id}: min_interval_seconds {secs}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    fn clip(id: &str, kind: &str, contexts: &[&str], interval: f64) -> ClipEntry {
        ClipEntry {
            id: id.to_owned(),
            kind: kind.to_owned(),
            text: format!("{kind}~"),
            filename: format!("{id}.wav"),
            emotion: "neutral".into(),
            context: contexts.iter().map(|c| (*c).to_owned()).collect(),
            weight: 1.0,
            min_interval_seconds: interval,
        }
    }

    fn responder() -> ClipResponder {
        ClipResponder::new(
            vec![
                clip("hmm_01", "hmm", &["waiting_api", "processing"], 30.0),
                clip("hmm_02", "hmm", &["waiting_api"], 30.0),
                clip("yawn_01", "yawn", &["idle"], 120.0),
            ],
            "static/ambient_behaviors",
        )
        .unwrap()
    }

    #[test]
    fn picks_matching_context_and_resolves_path() {
        let mut clips = responder();
        let mut rng = SequenceRandom::new([0.0]);
        let pick = clips.waiting(Timestamp::ZERO, &mut rng).unwrap();
        assert_eq!(pick.id, "hmm_01");
        assert!(pick.matched_context);
        assert_eq!(
            pick.audio_path,
            PathBuf::from("static/ambient_behaviors").join("hmm_01.wav")
        );
    }

    #[test]
    fn cooldown_is_shared_by_type() {
        let mut clips = responder();
        let mut rng = SequenceRandom::new([0.0]);
        clips.waiting(Timestamp::ZERO, &mut rng).unwrap();

        // Both hmm clips are blocked, so waiting falls back to the idle yawn.
        let fallback = clips.waiting(Timestamp::from_secs(10), &mut rng).unwrap();
        assert_eq!(fallback.kind, "yawn");
        assert!(!fallback.matched_context);

        assert_eq!(
            clips.cooldown_state("hmm", Timestamp::from_secs(10)),
            Some(CooldownState::CoolingDown {
                remaining: Duration::from_secs(20)
            })
        );
        assert!(clips.waiting(Timestamp::from_secs(20), &mut rng).is_none());

        let again = clips.waiting(Timestamp::from_secs(30), &mut rng).unwrap();
        assert_eq!(again.kind, "hmm");
    }

    #[test]
    fn unknown_context_uses_idle_clips() {
        let mut clips = responder();
        let mut rng = SequenceRandom::new([0.5]);
        let pick = clips.after_command(Timestamp::ZERO, &mut rng).unwrap();
        assert_eq!(pick.id, "yawn_01");
        assert!(!pick.matched_context);
    }

    #[test]
    fn reset_clears_type_cooldowns() {
        let mut clips = responder();
        let mut rng = SequenceRandom::new([0.0]);
        clips.pick("idle", Timestamp::ZERO, &mut rng).unwrap();
        assert!(clips.pick("idle", Timestamp::from_secs(1), &mut rng).is_none());
        clips.reset_history();
        assert!(clips.pick("idle", Timestamp::from_secs(1), &mut rng).is_some());
    }

    #[test]
    fn empty_responder_picks_nothing() {
        let mut clips = ClipResponder::empty();
        let mut rng = SequenceRandom::new([0.5]);
        assert!(clips.processing(Timestamp::ZERO, &mut rng).is_none());
        assert_eq!(clips.cooldown_state("hmm", Timestamp::ZERO), None);
    }

    #[test]
    fn invalid_entries_rejected() {
        let mut bad_weight = clip("a", "hmm", &["idle"], 0.0);
        bad_weight.weight = 0.0;
        assert!(ClipResponder::new(vec![bad_weight], "x").is_err());

        let huge = clip("b", "hmm", &["idle"], 1e20);
        let err = ClipResponder::new(vec![huge], "x").unwrap_err();
        assert!(matches!(err, AmbientError::Configuration(_)));

        let dup = vec![clip("c", "hmm", &[], 0.0), clip("c", "sigh", &[], 0.0)];
        assert!(ClipResponder::new(dup, "x").unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn entry_reads_original_key_names() {
        let json = r#"{"id": "sigh_01", "type": "sigh", "text": "Haa...",
            "filename": "sigh_01.wav", "emotion": "tired",
            "context": ["waiting_api", "idle"], "min_interval_seconds": 45}"#;
        let entry: ClipEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.kind, "sigh");
        assert_eq!(entry.weight, 1.0);
        assert_eq!(entry.min_interval_seconds, 45.0);
    }
}
