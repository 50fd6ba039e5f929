//! High-density towers: a stack of floors shrinking with height, optionally
//! banded and crowned by a spike.

use glam::Vec4;

use super::{Axis, Face, ShapeKind, ShapeSymbol, Status, SubdivisionRange, TowerStyle, Transition};
use crate::error::GrammarError;
use crate::random::RandomSource;

/// Gray, white and blue facades.
const COLORS: [Vec4; 3] = [
    Vec4::new(0.75, 0.75, 0.75, 1.0),
    Vec4::new(0.85, 0.85, 0.85, 1.0),
    Vec4::new(0.85, 0.85, 0.97, 1.0),
];
const SHADE: f32 = 0.85;

const ROUND_CHANCE: f64 = 0.5;
const ALTERNATING_CHANCE: f64 = 0.7;
const SPIKE_CHANCE: f64 = 0.6;

const ROUND_INSET: f32 = 0.71;
const FLOOR_TAPER: f32 = 0.9;
const BAND_INSET: f32 = 0.93;

const FLOORS: SubdivisionRange = SubdivisionRange {
    min: 6,
    range: 4,
    odd_only: false,
    vertical_bonus: false,
};
const BANDS: SubdivisionRange = SubdivisionRange {
    min: 3,
    range: 7,
    odd_only: true,
    vertical_bonus: false,
};

pub(super) fn transition(depth: u32) -> Option<Transition> {
    match depth {
        0 => Some(stack_floors),
        1 => Some(crown),
        _ => None,
    }
}

pub(super) fn pick_color(u: f64) -> Vec4 {
    let base = COLORS[super::palette_index(u, COLORS.len())];
    (base * SHADE).truncate().extend(1.0)
}

fn stack_floors(
    mut shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    let style = TowerStyle {
        round: p < ROUND_CHANCE,
        alternating: rng.next_f64() < ALTERNATING_CHANCE,
    };
    shape.kind = ShapeKind::Tower(style);

    let mut floors = shape.subdivide(Axis::Y, FLOORS, rng)?;
    let (mut inset, sides) = if style.round {
        (ROUND_INSET, 8)
    } else {
        (1.0, 4)
    };
    for floor in &mut floors {
        floor.scale.x *= inset;
        floor.scale.z *= inset;
        floor.sides = sides;
        inset *= FLOOR_TAPER;
    }
    Ok(floors)
}

fn crown(
    mut shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    if shape.boundary.touches(Face::Top) {
        if p < SPIKE_CHANCE {
            return Ok(vec![into_spike(shape)]);
        }
        // Top floors that keep their shape spend one extra draw.
        rng.next_f64();
    }

    let alternating = matches!(shape.kind, ShapeKind::Tower(style) if style.alternating);
    if !alternating {
        shape.depth += 1;
        return Ok(vec![shape]);
    }

    let mut bands = shape.subdivide(Axis::Y, BANDS, rng)?;
    for band in bands.iter_mut().skip(1).step_by(2) {
        band.scale.x *= BAND_INSET;
        band.scale.z *= BAND_INSET;
    }
    Ok(bands)
}

fn into_spike(floor: ShapeSymbol) -> ShapeSymbol {
    let mut spike = floor.into_kind(ShapeKind::Spike);
    spike.scale.x *= 0.2;
    spike.scale.y *= 2.0;
    spike.scale.z *= 0.2;
    spike.status = Status::Terminal;
    spike
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn tower(rng: &mut RandomSource) -> ShapeSymbol {
        ShapeSymbol::tower(Vec3::ZERO, Vec3::ZERO, Vec3::new(4.0, 40.0, 4.0), rng)
    }

    #[test]
    fn colour_is_shaded_and_opaque() {
        let c = pick_color(0.0);
        assert!((c.x - 0.75 * SHADE).abs() < 1e-6);
        assert_eq!(c.w, 1.0);
        assert!((pick_color(0.5).x - 0.85 * SHADE).abs() < 1e-6);
        let blue = pick_color(0.999_999_9);
        assert!((blue.z - 0.97 * SHADE).abs() < 1e-6);
        assert_eq!(blue, pick_color(0.7));
    }

    #[test]
    fn kept_top_floor_spends_one_draw() {
        let mut rng = RandomSource::deterministic(4);
        let floors = tower(&mut rng).expand(0.9, &mut rng).unwrap();
        let top = floors.last().unwrap().clone();
        let middle = floors[0].clone();

        let draws = rng.draws();
        let out = top.expand(0.9, &mut rng).unwrap();
        assert_ne!(out[0].kind, ShapeKind::Spike);
        let spent_on_top = rng.draws() - draws;

        let draws = rng.draws();
        let out = middle.expand(0.9, &mut rng).unwrap();
        assert!(!out.is_empty());
        let spent_on_middle = rng.draws() - draws;
        assert_eq!(spent_on_top, spent_on_middle + 1);
    }

    #[test]
    fn round_towers_get_octagonal_tapering_floors() {
        let mut rng = RandomSource::deterministic(4);
        let floors = tower(&mut rng).expand(0.2, &mut rng).unwrap();
        assert!((6..10).contains(&floors.len()));
        assert!(floors.iter().all(|f| f.sides == 8 && f.depth == 1));
        assert!((floors[0].scale.x - 4.0 * ROUND_INSET).abs() < 1e-5);
        assert!(floors.windows(2).all(|w| w[1].scale.x < w[0].scale.x));
        let round = matches!(floors[0].kind, ShapeKind::Tower(style) if style.round);
        assert!(round);
    }

    #[test]
    fn square_towers_start_at_full_width() {
        let mut rng = RandomSource::deterministic(4);
        let floors = tower(&mut rng).expand(0.9, &mut rng).unwrap();
        assert!(floors.iter().all(|f| f.sides == 4));
        assert!((floors[0].scale.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn top_floor_can_turn_into_a_spike() {
        let mut rng = RandomSource::deterministic(4);
        let floors = tower(&mut rng).expand(0.9, &mut rng).unwrap();
        let top = floors.last().unwrap().clone();
        let width = top.scale.x;

        let out = top.expand(0.1, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        let spike = &out[0];
        assert_eq!(spike.kind, ShapeKind::Spike);
        assert!(spike.is_terminal() && !spike.is_deleted());
        assert!((spike.scale.x - width * 0.2).abs() < 1e-5);
        assert_eq!(spike.sides, 12);
        assert_eq!(spike.scale_top, 0.1);
    }

    #[test]
    fn plain_towers_just_deepen_at_the_crown() {
        let mut rng = RandomSource::deterministic(0);
        let mut floor = tower(&mut rng);
        floor.kind = ShapeKind::Tower(TowerStyle::default());
        floor.depth = 1;
        floor.boundary.set(Face::Top, false);

        let out = floor.expand(0.1, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].depth, 2);

        let settled = out[0].clone().expand(0.5, &mut rng).unwrap();
        assert!(settled[0].is_terminal());
    }

    #[test]
    fn alternating_bands_are_odd_and_inset() {
        let mut rng = RandomSource::deterministic(9);
        let mut floor = tower(&mut rng);
        floor.kind = ShapeKind::Tower(TowerStyle {
            round: false,
            alternating: true,
        });
        floor.depth = 1;
        floor.boundary.set(Face::Top, false);

        let bands = floor.expand(0.9, &mut rng).unwrap();
        assert_eq!(bands.len() % 2, 1);
        assert!((bands[1].scale.x - 4.0 * BAND_INSET).abs() < 1e-5);
        assert!((bands[0].scale.x - 4.0).abs() < 1e-5);
    }
}
