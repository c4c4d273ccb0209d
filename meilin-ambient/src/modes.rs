//! Personality mode table, validated against a behavior catalogue.

use crate::catalog::BehaviorCatalog;
use crate::error::{AmbientError, Result};
use crate::types::{ModeId, PersonalityMode};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ModeTable {
    modes: Vec<PersonalityMode>,
    index: HashMap<ModeId, usize>,
}

impl ModeTable {
    /// Build a mode table whose every reference resolves in `catalog`.
    ///
    /// A behavior that a mode both boosts and suppresses is accepted:
    /// suppression wins at selection time, and the overlap is logged.
    ///
    /// # Errors
    ///
    /// Returns [`AmbientError::Configuration`] if the table is empty, an id
    /// repeats, a multiplier is not a positive finite number, a boosted
    /// weight overflows, or a multiplier or suppression entry names an
    /// unknown behavior.
    pub fn new(modes: Vec<PersonalityMode>, catalog: &BehaviorCatalog) -> Result<Self> {
        if modes.is_empty() {
            return Err(AmbientError::Configuration(
                "at least one personality mode must be defined".into(),
            ));
        }
        let mut index = HashMap::with_capacity(modes.len());
        for (position, mode) in modes.iter().enumerate() {
            validate_mode(mode, catalog)?;
            if index.insert(mode.id.clone(), position).is_some() {
                return Err(AmbientError::Configuration(format!(
                    "duplicate personality mode id: {}",
                    mode.id
                )));
            }
        }
        Ok(Self { modes, index })
    }

    /// A table holding one neutral mode, for packs that define none.
    pub fn single_neutral(id: &str) -> Self {
        let mode = PersonalityMode::neutral(id);
        let index = HashMap::from([(mode.id.clone(), 0)]);
        Self {
            modes: vec![mode],
            index,
        }
    }

    /// # Errors
    ///
    /// Returns [`AmbientError::UnknownMode`] if `id` is not registered.
    pub fn resolve(&self, id: &str) -> Result<&PersonalityMode> {
        self.index
            .get(&ModeId::new(id))
            .map(|&i| &self.modes[i])
            .ok_or_else(|| AmbientError::UnknownMode(id.to_owned()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&ModeId::new(id))
    }

    /// The mode after `id` in table order, wrapping around.
    pub fn next_after(&self, id: &ModeId) -> &PersonalityMode {
        let next = self
            .index
            .get(id)
            .map_or(0, |&i| (i + 1) % self.modes.len());
        &self.modes[next]
    }

    /// Modes in load order.
    pub fn iter(&self) -> impl Iterator<Item = &PersonalityMode> {
        self.modes.iter()
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

fn validate_mode(mode: &PersonalityMode, catalog: &BehaviorCatalog) -> Result<()> {
    let id = &mode.id;
    if id.as_str().trim().is_empty() {
        return Err(AmbientError::Configuration(
            "personality mode id must not be empty".into(),
        ));
    }
    for (behavior, multiplier) in &mode.multipliers {
        let Some(entry) = catalog.get(behavior) else {
            return Err(AmbientError::Configuration(format!(
                "mode {id}: multiplier references unknown behavior {behavior}"
            )));
        };
        if !multiplier.is_finite() || *multiplier <= 0.0 {
            return Err(AmbientError::Configuration(format!(
                "mode {id}: multiplier for {behavior} must be a positive number, got {multiplier}"
            )));
        }
        let effective = entry.base_weight * multiplier;
        if !effective.is_finite() {
            return Err(AmbientError::Configuration(format!(
                "mode {id}: weight of {behavior} overflows ({} x {multiplier})",
                entry.base_weight
            )));
        }
        if mode.suppressed.contains(behavior) {
            warn!(
                mode = %id,
                %behavior,
                "behavior is both boosted and suppressed; suppression wins"
            );
        }
    }
    if let Some(behavior) = mode.suppressed.iter().find(|b| !catalog.contains(b)) {
        return Err(AmbientError::Configuration(format!(
            "mode {id}: suppression references unknown behavior {behavior}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Behavior;
    use std::time::Duration;

    fn catalog() -> BehaviorCatalog {
        let make = |id: &str| Behavior {
            id: id.into(),
            display_name: id.to_owned(),
            utterances: vec!["u".into()],
            sounds: vec!["s".into()],
            base_weight: 1.0,
            min_interval: Duration::ZERO,
            contexts: Default::default(),
        };
        BehaviorCatalog::new(vec![make("yawn"), make("cheerful")]).unwrap()
    }

    fn mode(id: &str) -> PersonalityMode {
        PersonalityMode::neutral(id)
    }

    #[test]
    fn resolves_known_mode() {
        let table = ModeTable::new(vec![mode("normal"), mode("sleepy")], &catalog()).unwrap();
        assert_eq!(table.resolve("sleepy").unwrap().id.as_str(), "sleepy");
        assert!(table.contains("normal"));
    }

    #[test]
    fn unknown_mode_is_error() {
        let table = ModeTable::new(vec![mode("normal")], &catalog()).unwrap();
        let err = table.resolve("hyper").unwrap_err();
        assert!(matches!(err, AmbientError::UnknownMode(ref m) if m == "hyper"));
    }

    #[test]
    fn empty_table_rejected() {
        assert!(ModeTable::new(Vec::new(), &catalog()).is_err());
    }

    #[test]
    fn duplicate_mode_rejected() {
        let err = ModeTable::new(vec![mode("normal"), mode("normal")], &catalog()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn unknown_multiplier_reference_rejected() {
        let mut m = mode("energetic");
        m.multipliers.insert("tease".into(), 2.0);
        let err = ModeTable::new(vec![m], &catalog()).unwrap_err();
        assert!(err.to_string().contains("tease"));
    }

    #[test]
    fn unknown_suppression_reference_rejected() {
        let mut m = mode("sleepy");
        m.suppressed.insert("excitement".into());
        let err = ModeTable::new(vec![m], &catalog()).unwrap_err();
        assert!(err.to_string().contains("excitement"));
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        let mut m = mode("sleepy");
        m.multipliers.insert("yawn".into(), 0.0);
        assert!(ModeTable::new(vec![m], &catalog()).is_err());
    }

    #[test]
    fn overflowing_effective_weight_rejected() {
        let mut heavy = catalog().iter().cloned().collect::<Vec<_>>();
        heavy[0].base_weight = 1e300;
        let catalog = BehaviorCatalog::new(heavy).unwrap();
        let mut m = mode("sleepy");
        m.multipliers.insert("yawn".into(), 1e10);
        let err = ModeTable::new(vec![m], &catalog).unwrap_err();
        assert!(matches!(err, AmbientError::Configuration(_)));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn boost_and_suppress_overlap_is_accepted() {
        let mut m = mode("moody");
        m.multipliers.insert("cheerful".into(), 3.0);
        m.suppressed.insert("cheerful".into());
        assert!(ModeTable::new(vec![m], &catalog()).is_ok());
    }

    #[test]
    fn next_after_wraps() {
        let table = ModeTable::new(
            vec![mode("normal"), mode("energetic"), mode("sleepy")],
            &catalog(),
        )
        .unwrap();
        assert_eq!(table.next_after(&"normal".into()).id.as_str(), "energetic");
        assert_eq!(table.next_after(&"sleepy".into()).id.as_str(), "normal");
    }

    #[test]
    fn single_neutral_table() {
        let table = ModeTable::single_neutral("normal");
        assert_eq!(table.len(), 1);
        assert!(table.resolve("normal").unwrap().multipliers.is_empty());
    }
}
