//! Weighted, cooldown-gated behavior selection.
//!
//! A draw walks the catalogue once:
//!
//! 1. drop behaviors the mode suppresses;
//! 2. drop behaviors whose `min_interval` has not elapsed since they last fired;
//! 3. weight the rest by `base_weight * mode multiplier`;
//! 4. pick one by inverse-CDF, then sample an utterance and a sound independently;
//! 5. stamp the winner's last-fired time.
//!
//! Nothing is recorded when no behavior is eligible.

use crate::catalog::BehaviorCatalog;
use crate::error::Result;
use crate::history::{CooldownState, SelectionHistory};
use crate::modes::ModeTable;
use crate::random::{RandomSource, weighted_index};
use crate::types::{Behavior, BehaviorId, ModeId, PersonalityMode, Selection, Timestamp};
use serde::Serialize;
use tracing::{debug, info};

/// One row of [`BehaviorSelector::list_modes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSummary {
    pub id: ModeId,
    pub display_name: String,
    pub description: String,
    pub is_active: bool,
}

/// What a mode does to the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeStats {
    pub mode_id: ModeId,
    pub display_name: String,
    pub description: String,
    /// Behaviors with a multiplier above 1.0, in catalogue order.
    pub boosted: Vec<BehaviorId>,
    /// Suppressed behaviors, sorted by id.
    pub suppressed: Vec<BehaviorId>,
    pub total_behaviors: usize,
    pub available_behaviors: usize,
}

/// Owns the catalogue, the mode table, the active mode and the cooldown
/// history.
///
/// The selector is synchronous and single-owner. Hosts that share it
/// across tasks must serialize access (one owning task, or a mutex), or
/// two concurrent draws could both pick a behavior before either records it.
#[derive(Debug, Clone)]
pub struct BehaviorSelector {
    catalog: BehaviorCatalog,
    modes: ModeTable,
    active: ModeId,
    history: SelectionHistory,
}

impl BehaviorSelector {
    /// # Errors
    ///
    /// Returns [`AmbientError::UnknownMode`](crate::AmbientError::UnknownMode)
    /// if `initial_mode` is not in `modes`.
    pub fn new(catalog: BehaviorCatalog, modes: ModeTable, initial_mode: &str) -> Result<Self> {
        let active = modes.resolve(initial_mode)?.id.clone();
        Ok(Self {
            catalog,
            modes,
            active,
            history: SelectionHistory::new(),
        })
    }

    /// Draw one behavior for `mode_id` at `now`.
    ///
    /// Returns `Ok(None)` when every behavior is suppressed or cooling down.
    ///
    /// # Errors
    ///
    /// Returns [`AmbientError::UnknownMode`](crate::AmbientError::UnknownMode)
    /// for an unregistered mode. History is untouched in that case.
    pub fn select_random(
        &mut self,
        mode_id: &str,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Selection>> {
        self.draw(mode_id, now, rng, None)
    }

    /// Draw one behavior suited to `context_tag`.
    ///
    /// Only behaviors tagged with `context_tag`, or left untagged, compete.
    /// If none of those is eligible, this falls back to
    /// [`select_random`](Self::select_random). The result's
    /// `matched_context` tells a real match (`true`) from a fallback (`false`).
    ///
    /// # Errors
    ///
    /// Same as [`select_random`](Self::select_random).
    pub fn select_for_context(
        &mut self,
        context_tag: &str,
        mode_id: &str,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Selection>> {
        if let Some(selection) = self.draw(mode_id, now, rng, Some(context_tag))? {
            return Ok(Some(selection));
        }
        debug!(
            context = context_tag,
            mode = mode_id,
            "no eligible behavior for context, falling back"
        );
        self.draw(mode_id, now, rng, None)
    }

    /// [`select_random`](Self::select_random) under the active mode.
    pub fn select_active(
        &mut self,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Selection>> {
        let mode = self.active.clone();
        self.select_random(mode.as_str(), now, rng)
    }

    /// [`select_for_context`](Self::select_for_context) under the active mode.
    pub fn select_active_for_context(
        &mut self,
        context_tag: &str,
        now: Timestamp,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Selection>> {
        let mode = self.active.clone();
        self.select_for_context(context_tag, mode.as_str(), now, rng)
    }

    /// Make `mode_id` the active mode. Cooldown history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`AmbientError::UnknownMode`](crate::AmbientError::UnknownMode)
    /// and leaves the active mode unchanged if `mode_id` is unregistered.
    pub fn switch_mode(&mut self, mode_id: &str) -> Result<()> {
        let next = self.modes.resolve(mode_id)?.id.clone();
        if next != self.active {
            info!(from = %self.active, to = %next, "personality mode switched");
        }
        self.active = next;
        Ok(())
    }

    /// Switch to the next mode in table order, wrapping. Returns the new mode.
    pub fn cycle_mode(&mut self) -> &PersonalityMode {
        let next = self.modes.next_after(&self.active).id.clone();
        info!(from = %self.active, to = %next, "personality mode cycled");
        self.active = next;
        self.active_mode()
    }

    /// Forget every last-fired timestamp.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    pub fn active_mode(&self) -> &PersonalityMode {
        self.modes
            .iter()
            .find(|m| m.id == self.active)
            .unwrap_or_else(|| self.modes.next_after(&self.active))
    }

    pub fn list_modes(&self) -> Vec<ModeSummary> {
        self.modes
            .iter()
            .map(|mode| ModeSummary {
                id: mode.id.clone(),
                display_name: mode.display_name.clone(),
                description: mode.description.clone(),
                is_active: mode.id == self.active,
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`AmbientError::UnknownMode`](crate::AmbientError::UnknownMode)
    /// for an unregistered mode.
    pub fn mode_stats(&self, mode_id: &str) -> Result<ModeStats> {
        let mode = self.modes.resolve(mode_id)?;
        let boosted = self
            .catalog
            .iter()
            .filter(|b| mode.multiplier(&b.id) > 1.0)
            .map(|b| b.id.clone())
            .collect();
        let mut suppressed: Vec<BehaviorId> = mode.suppressed.iter().cloned().collect();
        suppressed.sort();
        let total = self.catalog.len();
        Ok(ModeStats {
            mode_id: mode.id.clone(),
            display_name: mode.display_name.clone(),
            description: mode.description.clone(),
            boosted,
            available_behaviors: total.saturating_sub(suppressed.len()),
            suppressed,
            total_behaviors: total,
        })
    }

    /// Cooldown state of one behavior; `None` if the id is not catalogued.
    pub fn cooldown_state(&self, id: &BehaviorId, now: Timestamp) -> Option<CooldownState> {
        self.catalog
            .get(id)
            .map(|b| self.history.cooldown_state(b, now))
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn catalog(&self) -> &BehaviorCatalog {
        &self.catalog
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    fn draw(
        &mut self,
        mode_id: &str,
        now: Timestamp,
        rng: &mut dyn RandomSource,
        context_tag: Option<&str>,
    ) -> Result<Option<Selection>> {
        let mode = self.modes.resolve(mode_id)?;

        let mut candidates: Vec<&Behavior> = Vec::with_capacity(self.catalog.len());
        let mut weights: Vec<f64> = Vec::with_capacity(self.catalog.len());
        for behavior in self.catalog.iter() {
            if mode.is_suppressed(&behavior.id) {
                continue;
            }
            if context_tag.is_some_and(|tag| !behavior.matches_context(tag)) {
                continue;
            }
            if !self.history.is_ready(behavior, now) {
                continue;
            }
            candidates.push(behavior);
            weights.push(behavior.base_weight * mode.multiplier(&behavior.id));
        }

        let Some(winner) = weighted_index(&weights, rng) else {
            debug!(mode = mode_id, context = ?context_tag, "no eligible behavior");
            return Ok(None);
        };
        let behavior = candidates[winner];
        let utterance = &behavior.utterances[rng.index(behavior.utterances.len())];
        let sound = &behavior.sounds[rng.index(behavior.sounds.len())];

        let selection = Selection {
            behavior_id: behavior.id.clone(),
            display_name: behavior.display_name.clone(),
            chosen_utterance: utterance.clone(),
            chosen_sound: sound.clone(),
            mode_id: mode.id.clone(),
            matched_context: context_tag.is_some(),
            fired_at: now,
        };
        debug!(
            behavior = %selection.behavior_id,
            mode = %selection.mode_id,
            eligible = candidates.len(),
            matched_context = selection.matched_context,
            "ambient behavior selected"
        );
        self.history.record(selection.behavior_id.clone(), now);
        Ok(Some(selection))
    }
}
