//! Clock- and RNG-owning facade over the behavior selector.
//!
//! [`AmbientEngine`] is what the idle loop drives. It adds the host-side
//! policy around a [`BehaviorSelector`]: the master enable switch, the
//! per-check trigger probability, and the explicit fallback to the default
//! mode when asked for an unknown one. It also serves idle responses and
//! ambient clips on the same clock and RNG.

use crate::config::AmbientConfig;
use crate::error::Result;
use meilin_ambient::clips::{AFTER_COMMAND_CONTEXT, PROCESSING_CONTEXT, WAITING_CONTEXT};
use meilin_ambient::{
    AmbientClip, AmbientPack, BehaviorSelector, ClipResponder, Clock, IdleResponder, IdleResponse,
    ModeId, ModeStats, ModeSummary, PackParts, PersonalityMode, RandomSource, Selection,
    StdRandom, SystemClock, TimeOfDay,
};
use tracing::{info, warn};

pub struct AmbientEngine {
    selector: BehaviorSelector,
    idle: IdleResponder,
    clips: ClipResponder,
    clock: Box<dyn Clock + Send>,
    rng: Box<dyn RandomSource + Send>,
    enabled: bool,
    trigger_probability: f64,
    default_mode: ModeId,
}

impl std::fmt::Debug for AmbientEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientEngine")
            .field("active_mode", &self.selector.active_mode().id)
            .field("enabled", &self.enabled)
            .field("trigger_probability", &self.trigger_probability)
            .finish_non_exhaustive()
    }
}

impl AmbientEngine {
    /// The selector's current mode becomes the default mode.
    pub fn new(
        selector: BehaviorSelector,
        idle: IdleResponder,
        clock: Box<dyn Clock + Send>,
        rng: Box<dyn RandomSource + Send>,
    ) -> Self {
        let default_mode = selector.active_mode().id.clone();
        Self {
            selector,
            idle,
            clips: ClipResponder::empty(),
            clock,
            rng,
            enabled: true,
            trigger_probability: 0.3,
            default_mode,
        }
    }

    /// Build an engine from host configuration on the system clock.
    ///
    /// # Errors
    ///
    /// Fails if the pack cannot be read or validated, or if
    /// `config.default_mode` is not a mode the pack defines.
    pub fn from_config(config: &AmbientConfig) -> Result<Self> {
        Self::from_config_with_clock(config, Box::new(SystemClock::new()))
    }

    /// Like [`from_config`](Self::from_config) with an injected clock.
    pub fn from_config_with_clock(
        config: &AmbientConfig,
        clock: Box<dyn Clock + Send>,
    ) -> Result<Self> {
        let pack = match &config.pack_path {
            Some(path) => AmbientPack::from_file(path)?,
            None => AmbientPack::builtin()?,
        };
        let PackParts {
            catalog,
            modes,
            settings,
            mut idle,
            mut clips,
        } = pack.into_parts()?;
        let initial_mode = config
            .default_mode
            .as_deref()
            .unwrap_or(settings.default_mode.as_str());
        let selector = BehaviorSelector::new(catalog, modes, initial_mode)?;
        if let Some(dir) = &config.cache_directory {
            idle = idle.with_cache_directory(dir);
        }
        if let Some(dir) = &config.clip_directory {
            clips = clips.with_cache_directory(dir);
        }
        let rng: Box<dyn RandomSource + Send> = match config.seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        };

        info!(
            mode = %selector.active_mode().id,
            behaviors = selector.catalog().len(),
            modes = selector.modes().len(),
            clips = clips.len(),
            "ambient engine ready"
        );
        Ok(Self::new(selector, idle, clock, rng)
            .with_clips(clips)
            .with_enabled(config.enabled)
            .with_trigger_probability(config.trigger_probability))
    }

    pub fn with_clips(mut self, clips: ClipResponder) -> Self {
        self.clips = clips;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Clamped into `0.0..=1.0`.
    pub fn with_trigger_probability(mut self, probability: f64) -> Self {
        self.trigger_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Roll whether this check should produce a behavior at all.
    pub fn should_trigger(&mut self) -> bool {
        self.enabled && self.rng.unit() < self.trigger_probability
    }

    /// Context-aware behavior under the active mode, with fallback.
    pub fn behavior(&mut self, context: &str) -> Result<Option<Selection>> {
        let now = self.clock.now();
        Ok(self
            .selector
            .select_active_for_context(context, now, self.rng.as_mut())?)
    }

    /// Unfiltered behavior under the active mode.
    pub fn random_behavior(&mut self) -> Result<Option<Selection>> {
        let now = self.clock.now();
        Ok(self.selector.select_active(now, self.rng.as_mut())?)
    }

    /// # Errors
    ///
    /// Fails with an unknown-mode error and keeps the current mode.
    pub fn switch_mode(&mut self, mode: &str) -> Result<()> {
        Ok(self.selector.switch_mode(mode)?)
    }

    /// Switch to `mode`, or to the default mode if `mode` is unknown.
    ///
    /// Returns the mode that ended up active.
    ///
    /// # Errors
    ///
    /// Fails only if the default mode itself does not resolve.
    pub fn switch_mode_or_default(&mut self, mode: &str) -> Result<&ModeId> {
        if self.selector.switch_mode(mode).is_err() {
            warn!(
                requested = mode,
                default = %self.default_mode,
                "unknown personality mode, using default"
            );
            self.selector.switch_mode(self.default_mode.as_str())?;
        }
        Ok(&self.selector.active_mode().id)
    }

    pub fn cycle_mode(&mut self) -> &PersonalityMode {
        self.selector.cycle_mode()
    }

    pub fn current_mode(&self) -> &PersonalityMode {
        self.selector.active_mode()
    }

    pub fn default_mode(&self) -> &ModeId {
        &self.default_mode
    }

    pub fn list_modes(&self) -> Vec<ModeSummary> {
        self.selector.list_modes()
    }

    pub fn current_mode_stats(&self) -> Result<ModeStats> {
        let id = &self.selector.active_mode().id;
        Ok(self.selector.mode_stats(id.as_str())?)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "ambient behaviors toggled");
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn trigger_probability(&self) -> f64 {
        self.trigger_probability
    }

    /// Clear behavior and clip cooldowns.
    pub fn reset_history(&mut self) {
        self.selector.reset_history();
        self.clips.reset_history();
    }

    /// Pre-generated response for `context` at the clock's time of day.
    pub fn idle_response(&mut self, context: &str) -> Option<IdleResponse> {
        let time_of_day = TimeOfDay::from_hour(self.clock.local_hour());
        self.idle.pick(context, time_of_day, self.rng.as_mut())
    }

    /// Ambient clip for `context`, falling back to `idle` clips.
    pub fn clip(&mut self, context: &str) -> Option<AmbientClip> {
        let now = self.clock.now();
        self.clips.pick(context, now, self.rng.as_mut())
    }

    pub fn waiting_clip(&mut self) -> Option<AmbientClip> {
        self.clip(WAITING_CONTEXT)
    }

    pub fn after_command_clip(&mut self) -> Option<AmbientClip> {
        self.clip(AFTER_COMMAND_CONTEXT)
    }

    pub fn processing_clip(&mut self) -> Option<AmbientClip> {
        self.clip(PROCESSING_CONTEXT)
    }

    pub fn selector(&self) -> &BehaviorSelector {
        &self.selector
    }
}
