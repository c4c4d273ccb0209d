//! Injectable randomness and the weighted draw.
//!
//! [`weighted_index`] implements the cumulative-weight inverse-CDF method
//! directly on top of a single uniform draw, so every selection can be
//! reproduced from the values a [`RandomSource`] hands out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() requires a non-empty range");
        let scaled = (self.unit() * len as f64) as usize;
        scaled.min(len.saturating_sub(1))
    }
}

/// [`RandomSource`] backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Deterministic source for tests and reproducible simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of unit samples, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "SequenceRandom needs at least one value");
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Pick an index with probability proportional to its weight.
///
/// Returns `None` when `weights` is empty or sums to nothing positive.
/// Non-positive and non-finite weights never win. Weights are scaled by
/// the largest one before summing, so huge finite weights keep their odds.
pub fn weighted_index(weights: &[f64], rng: &mut dyn RandomSource) -> Option<usize> {
    let usable = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let largest = weights.iter().copied().map(usable).fold(0.0, f64::max);
    if largest <= 0.0 {
        return None;
    }
    let scaled = |w: f64| usable(w) / largest;
    let total: f64 = weights.iter().copied().map(scaled).sum();

    let target = rng.unit() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        let w = scaled(w);
        if w == 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if target < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave `target` a hair above the final cumulative sum.
    last_positive
}
