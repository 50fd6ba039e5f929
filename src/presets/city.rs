//! City grid: a ground plane and one building per cell, its density class
//! and height driven by fbm noise over the cell centre.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GrammarError;
use crate::noise;
use crate::random::RandomSource;
use crate::shape::{ShapeGrammar, ShapeReport, ShapeSymbol};
use crate::sink::GeometrySink;

/// Layout parameters for [`City`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    /// Cells per side of the square grid.
    pub grid: u32,
    /// Half-extent of the ground plane.
    pub half_extent: f32,
    pub noise_frequency: f32,
    /// Side of every building's footprint.
    pub footprint: f32,
    /// Height added at full noise for houses, blocks and towers.
    pub house_height: f32,
    pub block_height: f32,
    pub tower_height: f32,
    /// Expansion rounds applied by [`City::grow`].
    pub max_rounds: u32,
    pub max_placements: Option<usize>,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            grid: 15,
            half_extent: 50.0,
            noise_frequency: 1.0,
            footprint: 4.0,
            house_height: 12.0,
            block_height: 20.0,
            tower_height: 100.0,
            max_rounds: 16,
            max_placements: None,
        }
    }
}

/// Density class chosen from the noise value at a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Density {
    Low,
    Medium,
    High,
}

impl Density {
    pub fn from_noise(value: f32) -> Self {
        if value < 0.333 {
            Density::Low
        } else if value < 0.667 {
            Density::Medium
        } else {
            Density::High
        }
    }
}

/// Centre of cell `(i, j)` on the ground plane.
pub fn cell_center(config: &CityConfig, i: u32, j: u32) -> Vec2 {
    let offset = (Vec2::new(i as f32, j as f32) + 0.5) / config.grid as f32;
    Vec2::splat(-config.half_extent) + Vec2::splat(config.half_extent * 2.0) * offset
}

/// One unexpanded building per grid cell, row-major. Draws happen in cell
/// order, so the layout is reproducible from a deterministic source.
pub fn layout(config: &CityConfig, rng: &mut RandomSource) -> Vec<ShapeSymbol> {
    let mut buildings = Vec::with_capacity((config.grid * config.grid) as usize);
    for i in 0..config.grid {
        for j in 0..config.grid {
            let cell = cell_center(config, i, j);
            let value = noise::fbm_at(cell, config.noise_frequency);
            let side = config.footprint;
            let footprint = |height: f32| Vec3::new(side, 1.0 + value * height, side);

            let (building, yaw) = match Density::from_noise(value) {
                Density::Low => {
                    let size = footprint(config.house_height);
                    let house = ShapeSymbol::house(Vec3::ZERO, Vec3::ZERO, size, rng)
                        .with_color(Vec4::new(0.4, 0.4, 1.0 - value, 1.0));
                    (house, rng.next_f64() as f32 * 90.0 - 45.0)
                }
                Density::Medium => {
                    let size = footprint(config.block_height);
                    let block = ShapeSymbol::block(Vec3::ZERO, Vec3::ZERO, size)
                        .with_color(Vec4::new(0.4, value + 0.23, 0.4, 1.0));
                    (block, rng.next_f64() as f32 * 20.0 - 10.0)
                }
                Density::High => {
                    let size = footprint(config.tower_height);
                    let tower = ShapeSymbol::tower(Vec3::ZERO, Vec3::ZERO, size, rng)
                        .with_color(Vec4::new(value, 0.4, 0.4, 1.0));
                    (tower, 0.0)
                }
            };
            let lift = building.scale.y * 0.5;
            buildings.push(building.with_global(
                Vec3::new(0.0, yaw, 0.0),
                Vec3::new(cell.x, lift, cell.y),
            ));
        }
    }
    buildings
}

/// A laid-out city and the grammar growing it.
#[derive(Clone, Debug)]
pub struct City {
    config: CityConfig,
    grammar: ShapeGrammar,
}

impl City {
    pub fn new(config: CityConfig, rng: &mut RandomSource) -> Self {
        let buildings = layout(&config, rng);
        debug!(buildings = buildings.len(), "laid out city");
        let grammar = ShapeGrammar::new(buildings).with_budget(config.max_placements);
        Self { config, grammar }
    }

    pub fn config(&self) -> &CityConfig {
        &self.config
    }

    pub fn grammar(&self) -> &ShapeGrammar {
        &self.grammar
    }

    /// Expands every building until settled or `max_rounds` is reached.
    pub fn grow(&mut self, rng: &mut RandomSource) -> Result<u32, GrammarError> {
        self.grammar.expand_until_terminal(self.config.max_rounds, rng)
    }

    /// Emits the ground plane followed by every building piece. The plane is
    /// not counted in the report.
    pub fn emit(&self, sink: &mut dyn GeometrySink) -> ShapeReport {
        sink.add_plane(Vec2::splat(self.config.half_extent));
        self.grammar.emit(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_centres_cover_the_plane_symmetrically() {
        let config = CityConfig {
            grid: 4,
            ..Default::default()
        };
        let first = cell_center(&config, 0, 0);
        let last = cell_center(&config, 3, 3);
        assert!((first + last).length() < 1e-4);
        assert!((first.x + 50.0 - 12.5).abs() < 1e-4);
    }

    #[test]
    fn density_thresholds() {
        assert_eq!(Density::from_noise(0.1), Density::Low);
        assert_eq!(Density::from_noise(0.5), Density::Medium);
        assert_eq!(Density::from_noise(0.9), Density::High);
    }

    #[test]
    fn buildings_stand_on_the_ground() {
        let config = CityConfig {
            grid: 5,
            ..Default::default()
        };
        let mut rng = RandomSource::deterministic(3);
        for building in layout(&config, &mut rng) {
            let lift = building.global_translation.y - building.scale.y * 0.5;
            assert!(lift.abs() < 1e-5);
            assert!(building.scale.y >= 1.0);
            assert!(building.global_rotation.y.abs() <= 45.0);
        }
    }
}
