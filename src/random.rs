//! Scalar random source shared by the string and shape grammars.
//!
//! Every draw advances shared state, so the order of calls is part of the
//! observable output: two runs in [`RandomMode::Deterministic`] with the same
//! seed and the same call sequence produce the same structure.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Multiplier applied to `sin(state)` before taking the fractional part.
pub const NOISE_SCALE: f64 = 43758.5453123;

/// How [`RandomSource::next_f64`] produces values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomMode {
    /// Platform uniform generator. Not reproducible.
    #[default]
    Stochastic,
    /// `fract(sin(state) * NOISE_SCALE)`, keyed purely by call order.
    Deterministic,
}

/// Random handle threaded explicitly through expansion and execution.
#[derive(Clone, Debug, Default)]
pub struct RandomSource {
    mode: RandomMode,
    state: i64,
    draws: u64,
}

impl RandomSource {
    pub fn new(mode: RandomMode, seed: i64) -> Self {
        Self {
            mode,
            state: seed,
            draws: 0,
        }
    }

    /// Shorthand for a deterministic source starting at `seed`.
    pub fn deterministic(seed: i64) -> Self {
        Self::new(RandomMode::Deterministic, seed)
    }

    /// Resets the cursor. The mode is left untouched.
    pub fn set_seed(&mut self, seed: i64) {
        self.state = seed;
    }

    /// Switches mode without resetting the cursor.
    pub fn set_mode(&mut self, mode: RandomMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> RandomMode {
        self.mode
    }

    /// Current cursor. Only advanced in deterministic mode.
    pub fn state(&self) -> i64 {
        self.state
    }

    /// Number of values handed out since construction, in either mode.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Returns the next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        match self.mode {
            RandomMode::Stochastic => rand::thread_rng().r#gen::<f64>(),
            RandomMode::Deterministic => {
                let value = hash_noise(self.state);
                self.state = self.state.wrapping_add(1);
                value
            }
        }
    }
}

/// `fract(sin(x) * NOISE_SCALE)` with a floor-based fract so negative
/// products still land in `[0, 1)`.
pub fn hash_noise(x: i64) -> f64 {
    let s = (x as f64).sin() * NOISE_SCALE;
    let f = s - s.floor();
    if f >= 1.0 { 0.0 } else { f }
}
