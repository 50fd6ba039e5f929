//! Low-density houses: footprint split in two directions, corners culled,
//! floors stacked under a gable roof, facades dressed last.

use glam::Vec4;

use super::{Axis, Face, Fate, ShapeKind, ShapeSymbol, Status, SubdivisionRange, Transition};
use crate::error::GrammarError;
use crate::random::RandomSource;
use crate::sink::Facade;

/// Yellow, orange, white, red and blue walls.
const COLORS: [Vec4; 5] = [
    Vec4::new(0.9, 0.9, 0.8, 1.0),
    Vec4::new(0.95, 0.8, 0.7, 1.0),
    Vec4::new(0.85, 0.85, 0.85, 1.0),
    Vec4::new(0.95, 0.75, 0.75, 1.0),
    Vec4::new(0.85, 0.85, 0.97, 1.0),
];

const CORNER_CULL_CHANCE: f64 = 0.4;
const FLAT_TOP_CHANCE: f64 = 0.4;
const PILOTIS_CHANCE: f64 = 0.15;
/// Chance that the storey under the roof is left open, the roof standing
/// over it like a canopy.
const OPEN_STOREY_CHANCE: f64 = 0.1;
const UNLIT_CHANCE: f64 = 0.5;
const WINDOW_CHANCE: f64 = 0.3333;
/// Ground floors are more likely to get windows.
const GROUND_WINDOW_BIAS: f64 = 0.2;
const CHIMNEY_CHANCE: f64 = 0.3;
const CHIMNEY_WIDTH: f32 = 0.2;

pub(super) fn transition(depth: u32) -> Option<Transition> {
    match depth {
        0 => Some(split_footprint),
        1 => Some(split_across),
        2 => Some(cull_corner),
        3 => Some(stack_floors),
        4 => Some(dress_floor),
        _ => None,
    }
}

pub(super) fn roof_transition(depth: u32) -> Option<Transition> {
    match depth {
        4 => Some(top_out),
        _ => None,
    }
}

pub(super) fn pick_color(u: f64) -> Vec4 {
    COLORS[super::palette_index(u, COLORS.len())]
}

fn split_footprint(
    shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    let axis = if p < 0.5 { Axis::X } else { Axis::Z };
    shape.subdivide(axis, SubdivisionRange::DEFAULT, rng)
}

fn split_across(
    shape: ShapeSymbol,
    _p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    let axis = if shape.subdiv_count[Axis::X.index()] > 0 {
        Axis::Z
    } else {
        Axis::X
    };
    shape.subdivide(axis, SubdivisionRange::DEFAULT, rng)
}

fn cull_corner(
    mut shape: ShapeSymbol,
    p: f64,
    _rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    if p < CORNER_CULL_CHANCE && shape.is_corner() {
        shape.delete();
    } else {
        shape.depth += 1;
    }
    Ok(vec![shape])
}

fn stack_floors(
    shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    let mut floors = shape.subdivide(Axis::Y, SubdivisionRange::DEFAULT, rng)?;

    let mut roof_at = floors.len() - 1;
    if p < FLAT_TOP_CHANCE && roof_at > 0 {
        floors[roof_at].delete();
        roof_at -= 1;
    }

    let mut roof = floors[roof_at].clone().into_kind(ShapeKind::Roof);
    if rng.next_f64() > 0.5 {
        roof.rotation.y = 90.0;
        let footprint = roof.scale;
        roof.scale.x = footprint.z;
        roof.scale.z = footprint.x;
    }
    roof.boundary.set(Face::Top, true);
    roof.depth = 4;
    floors[roof_at] = roof;

    if roof_at > 0 && rng.next_f64() < PILOTIS_CHANCE {
        floors[0].fate = Fate::Column;
    }
    if roof_at > 1 && rng.next_f64() < OPEN_STOREY_CHANCE {
        floors[roof_at - 1].fate = Fate::Deleted;
    }
    Ok(floors)
}

fn dress_floor(
    mut shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    shape.depth += 1;
    if shape.fate != Fate::Keep {
        return Ok(vec![shape.settle()]);
    }

    let lit = p >= UNLIT_CHANCE;
    let bias = if shape.boundary.touches(Face::Bottom) {
        GROUND_WINDOW_BIAS
    } else {
        0.0
    };
    if rng.next_f64() - bias < WINDOW_CHANCE {
        shape.facade = Facade::Windows { lit };
    }
    Ok(vec![shape])
}

fn top_out(
    mut roof: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    roof.status = Status::Terminal;
    if p >= CHIMNEY_CHANCE {
        return Ok(vec![roof]);
    }

    let mut chimney = roof.clone().into_kind(ShapeKind::House);
    chimney.true_color = pick_color(rng.next_f64());
    let width = roof.scale.x.min(roof.scale.z) * CHIMNEY_WIDTH;
    chimney.scale.x = width;
    chimney.scale.z = width;
    chimney.position.x += width * chimney_offset(rng);
    chimney.position.z += width * chimney_offset(rng);
    chimney.status = Status::Terminal;
    chimney.depth = 5;
    Ok(vec![roof, chimney])
}

/// Signed offset in `[0.75, 1.5)` chimney widths.
fn chimney_offset(rng: &mut RandomSource) -> f32 {
    let magnitude = 0.75 + 0.75 * rng.next_f64() as f32;
    let sign = if rng.next_f64() > 0.5 { 1.0 } else { -1.0 };
    magnitude * sign
}
