//! Run-level configuration for the string grammar and its presets.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::random::{RandomMode, RandomSource};

/// Colours for the material classes the host can restyle between runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Trunk and branch prisms.
    pub wood: Vec4,
    /// Branch tips.
    pub leaf: Vec4,
    /// Decorations hung on branches.
    pub fruit: Vec4,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            wood: Vec4::new(0.36, 0.25, 0.18, 1.0),
            leaf: Vec4::new(0.22, 0.45, 0.20, 1.0),
            fruit: Vec4::new(0.85, 0.80, 0.25, 1.0),
        }
    }
}

/// Configuration for a generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of rewrite passes applied to the axiom.
    pub iterations: u32,
    pub random_mode: RandomMode,
    pub seed: i64,
    pub palette: Palette,
    /// Maximum number of saved turtle states.
    pub max_stack_depth: usize,
    /// Placement count above which the run is flagged as over budget.
    pub max_placements: Option<usize>,
    /// Cross-section polygon count for branch prisms.
    pub branch_sides: u32,
    /// Radius factor applied per shrinking branch segment.
    pub taper: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            iterations: 12,
            random_mode: RandomMode::Stochastic,
            seed: 0,
            palette: Palette::default(),
            max_stack_depth: 1024,
            max_placements: None,
            branch_sides: 6,
            taper: 0.98,
        }
    }
}

impl GeneratorConfig {
    /// Builds a random source in the configured mode, positioned at `seed`.
    pub fn random_source(&self) -> RandomSource {
        RandomSource::new(self.random_mode, self.seed)
    }
}
