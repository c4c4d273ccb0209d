//! Validated, immutable behavior catalogue.
//!
//! Behaviors keep their load order, which is also the iteration order of
//! every draw. A fixed random seed therefore reproduces the same sequence
//! of selections.

use crate::error::{AmbientError, Result};
use crate::types::{Behavior, BehaviorId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BehaviorCatalog {
    behaviors: Vec<Behavior>,
    index: HashMap<BehaviorId, usize>,
}

impl BehaviorCatalog {
    /// Build a catalogue, rejecting malformed entries.
    ///
    /// # Errors
    ///
    /// Returns [`AmbientError::Configuration`] for an empty or duplicate id,
    /// a weight that is not a positive finite number, or an empty
    /// utterance or sound list.
    pub fn new(behaviors: Vec<Behavior>) -> Result<Self> {
        let mut index = HashMap::with_capacity(behaviors.len());
        for (position, behavior) in behaviors.iter().enumerate() {
            validate_behavior(behavior)?;
            if index.insert(behavior.id.clone(), position).is_some() {
                return Err(AmbientError::Configuration(format!(
                    "duplicate behavior id: {}",
                    behavior.id
                )));
            }
        }
        Ok(Self { behaviors, index })
    }

    pub fn get(&self, id: &BehaviorId) -> Option<&Behavior> {
        self.index.get(id).map(|&i| &self.behaviors[i])
    }

    pub fn contains(&self, id: &BehaviorId) -> bool {
        self.index.contains_key(id)
    }

    /// Behaviors in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Behavior> {
        self.behaviors.iter()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

fn validate_behavior(behavior: &Behavior) -> Result<()> {
    let id = behavior.id.as_str();
    if id.trim().is_empty() {
        return Err(AmbientError::Configuration(
            "behavior id must not be empty".into(),
        ));
    }
    if !behavior.base_weight.is_finite() || behavior.base_weight <= 0.0 {
        return Err(AmbientError::Configuration(format!(
            "behavior {id}: base_weight must be a positive number, got {}",
            behavior.base_weight
        )));
    }
    if behavior.utterances.is_empty() {
        return Err(AmbientError::Configuration(format!(
            "behavior {id}: utterances must not be empty"
        )));
    }
    if behavior.sounds.is_empty() {
        return Err(AmbientError::Configuration(format!(
            "behavior {id}: sounds must not be empty"
        )));
    }
    Ok(())
}
