//! Per-behavior cooldown bookkeeping.
//!
//! # State Machine
//!
//! ```text
//! ┌───────┐  selected   ┌──────────────┐
//! │ Ready ├────────────►│ CoolingDown  │
//! └───▲───┘             └──────┬───────┘
//!     │   min_interval elapsed │
//!     └────────────────────────┘
//! ```
//!
//! No timers run. The `CoolingDown → Ready` edge is evaluated lazily
//! whenever a selector asks.

use crate::types::{Behavior, BehaviorId, Timestamp};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Ready,
    CoolingDown { remaining: Duration },
}

/// Last-fired timestamps, written only by the owning selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionHistory {
    last_fired_at: HashMap<BehaviorId, Timestamp>,
}

impl SelectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `id` last fired; `None` if it never has.
    pub fn last_fired(&self, id: &BehaviorId) -> Option<Timestamp> {
        self.last_fired_at.get(id).copied()
    }

    pub fn cooldown_state(&self, behavior: &Behavior, now: Timestamp) -> CooldownState {
        self.cooldown_for(&behavior.id, behavior.min_interval, now)
    }

    /// Cooldown of any key with the given interval.
    pub fn cooldown_for(
        &self,
        id: &BehaviorId,
        min_interval: Duration,
        now: Timestamp,
    ) -> CooldownState {
        let Some(last) = self.last_fired(id) else {
            return CooldownState::Ready;
        };
        let elapsed = now.saturating_since(last);
        if elapsed >= min_interval {
            CooldownState::Ready
        } else {
            CooldownState::CoolingDown {
                remaining: min_interval - elapsed,
            }
        }
    }

    pub fn is_ready(&self, behavior: &Behavior, now: Timestamp) -> bool {
        self.cooldown_state(behavior, now) == CooldownState::Ready
    }

    pub(crate) fn record(&mut self, id: BehaviorId, at: Timestamp) {
        self.last_fired_at.insert(id, at);
    }

    pub fn clear(&mut self) {
        self.last_fired_at.clear();
    }

    pub fn len(&self) -> usize {
        self.last_fired_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired_at.is_empty()
    }
}
