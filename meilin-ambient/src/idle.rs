//! Pre-generated idle, sleep and goodbye responses.
//!
//! Each response points at a cached audio file and lists the situations
//! (`idle_mode`, `going_to_sleep`, `goodbye`, `standby`, ...) and times of
//! day it fits. Picking narrows in stages:
//!
//! 1. context **and** time of day match, weighted by how many contexts the
//!    response lists;
//! 2. context match only, uniform;
//! 3. any `idle_mode` response, uniform;
//! 4. nothing.

use crate::random::{RandomSource, weighted_index};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const IDLE_MODE_CONTEXT: &str = "idle_mode";
pub const SLEEP_CONTEXT: &str = "going_to_sleep";
pub const GOODBYE_CONTEXT: &str = "goodbye";
pub const STANDBY_CONTEXT: &str = "standby";

/// Default directory holding the cached response audio.
pub const DEFAULT_CACHE_DIRECTORY: &str = "static/ambient_responses";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// 06–12 morning, 12–18 afternoon, 18–22 evening, otherwise night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pre-generated response as it appears in a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleResponseEntry {
    pub id: String,
    pub text: String,
    pub filename: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub time_of_day: Vec<TimeOfDay>,
}

/// A picked response with its resolved audio path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleResponse {
    pub id: String,
    pub text: String,
    pub filename: String,
    pub audio_path: PathBuf,
    pub emotion: String,
    pub contexts: Vec<String>,
    pub time_of_day: TimeOfDay,
}

#[derive(Debug, Clone)]
pub struct IdleResponder {
    responses: Vec<IdleResponseEntry>,
    cache_directory: PathBuf,
}

impl IdleResponder {
    pub fn new(responses: Vec<IdleResponseEntry>, cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            responses,
            cache_directory: cache_directory.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), DEFAULT_CACHE_DIRECTORY)
    }

    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = dir.into();
        self
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn pick(
        &self,
        context: &str,
        time_of_day: TimeOfDay,
        rng: &mut dyn RandomSource,
    ) -> Option<IdleResponse> {
        let has_context = |r: &IdleResponseEntry, c: &str| r.context.iter().any(|x| x == c);

        let timed: Vec<(&IdleResponseEntry, f64)> = self
            .responses
            .iter()
            .filter(|r| has_context(r, context) && r.time_of_day.contains(&time_of_day))
            .map(|r| (r, r.context.len() as f64))
            .collect();

        let candidates = if !timed.is_empty() {
            timed
        } else {
            let untimed: Vec<_> = self
                .responses
                .iter()
                .filter(|r| has_context(r, context))
                .map(|r| (r, 1.0))
                .collect();
            if !untimed.is_empty() {
                untimed
            } else {
                self.responses
                    .iter()
                    .filter(|r| has_context(r, IDLE_MODE_CONTEXT))
                    .map(|r| (r, 1.0))
                    .collect()
            }
        };

        let weights: Vec<f64> = candidates.iter().map(|(_, w)| *w).collect();
        let (chosen, _) = candidates[weighted_index(&weights, rng)?];
        Some(IdleResponse {
            id: chosen.id.clone(),
            text: chosen.text.clone(),
            filename: chosen.filename.clone(),
            audio_path: self.cache_directory.join(&chosen.filename),
            emotion: chosen.emotion.clone(),
            contexts: chosen.context.clone(),
            time_of_day,
        })
    }

    pub fn sleep(
        &self,
        time_of_day: TimeOfDay,
        rng: &mut dyn RandomSource,
    ) -> Option<IdleResponse> {
        self.pick(SLEEP_CONTEXT, time_of_day, rng)
    }

    pub fn goodbye(
        &self,
        time_of_day: TimeOfDay,
        rng: &mut dyn RandomSource,
    ) -> Option<IdleResponse> {
        self.pick(GOODBYE_CONTEXT, time_of_day, rng)
    }

    pub fn standby(
        &self,
        time_of_day: TimeOfDay,
        rng: &mut dyn RandomSource,
    ) -> Option<IdleResponse> {
        self.pick(STANDBY_CONTEXT, time_of_day, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    fn entry(id: &str, contexts: &[&str], times: &[TimeOfDay]) -> IdleResponseEntry {
        IdleResponseEntry {
            id: id.to_owned(),
            text: format!("{id} text"),
            filename: format!("{id}.mp3"),
            emotion: "calm".into(),
            context: contexts.iter().map(|c| (*c).to_owned()).collect(),
            time_of_day: times.to_vec(),
        }
    }

    fn responder() -> IdleResponder {
        IdleResponder::new(
            vec![
                entry("night_sleep", &["going_to_sleep"], &[TimeOfDay::Night]),
                entry(
                    "night_sleep_idle",
                    &["going_to_sleep", "idle_mode", "standby"],
                    &[TimeOfDay::Night],
                ),
                entry("morning_bye", &["goodbye"], &[TimeOfDay::Morning]),
                entry("plain_idle", &["idle_mode"], &[TimeOfDay::Afternoon]),
            ],
            "cache",
        )
    }

    #[test]
    fn hour_boundaries() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(22), TimeOfDay::Night);
    }

    #[test]
    fn timed_match_weights_by_context_count() {
        // Weights 1 and 3 → the first owns [0, 0.25).
        let r = responder();
        let mut rng = SequenceRandom::new([0.2, 0.3]);
        assert_eq!(r.sleep(TimeOfDay::Night, &mut rng).unwrap().id, "night_sleep");
        assert_eq!(
            r.sleep(TimeOfDay::Night, &mut rng).unwrap().id,
            "night_sleep_idle"
        );
    }

    #[test]
    fn falls_back_to_context_ignoring_time() {
        let r = responder();
        let mut rng = SequenceRandom::new([0.0]);
        let pick = r.goodbye(TimeOfDay::Evening, &mut rng).unwrap();
        assert_eq!(pick.id, "morning_bye");
        assert_eq!(pick.time_of_day, TimeOfDay::Evening);
        assert_eq!(pick.audio_path, PathBuf::from("cache").join("morning_bye.mp3"));
    }

    #[test]
    fn falls_back_to_idle_mode() {
        let r = responder();
        let mut rng = SequenceRandom::new([0.99]);
        let pick = r.pick("leaving", TimeOfDay::Morning, &mut rng).unwrap();
        assert_eq!(pick.id, "plain_idle");
    }

    #[test]
    fn empty_responder_yields_none() {
        let mut rng = SequenceRandom::new([0.5]);
        assert!(IdleResponder::empty().standby(TimeOfDay::Night, &mut rng).is_none());
    }

    #[test]
    fn time_of_day_deserializes_lowercase() {
        let parsed: Vec<TimeOfDay> = serde_json::from_str(r#"["morning","night"]"#).unwrap();
        assert_eq!(parsed, vec![TimeOfDay::Morning, TimeOfDay::Night]);
    }
}
