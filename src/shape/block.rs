//! Medium-density blocks: split along random axes, with corner pieces
//! eroded and ground-floor edge pieces turned into columns.

use super::{Axis, Face, Fate, ShapeSymbol, SubdivisionRange, Transition};
use crate::error::GrammarError;
use crate::random::RandomSource;

pub const MAX_DEPTH: u32 = 4;

/// Draws above this erode instead of splitting.
const EROSION_THRESHOLD: f64 = 0.8;

pub(super) fn transition(depth: u32) -> Option<Transition> {
    if depth <= MAX_DEPTH {
        Some(erode_or_split)
    } else {
        Some(settle)
    }
}

fn settle(
    shape: ShapeSymbol,
    _p: f64,
    _rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    Ok(vec![shape.settle()])
}

fn erode_or_split(
    mut shape: ShapeSymbol,
    p: f64,
    rng: &mut RandomSource,
) -> Result<Vec<ShapeSymbol>, GrammarError> {
    if shape.fate != Fate::Keep {
        return Ok(vec![shape.settle()]);
    }

    let mut p = p;
    if p > EROSION_THRESHOLD {
        if shape.depth > 1 {
            let b = shape.boundary;
            if b.touches(Face::Bottom) && !b.touches(Face::Top) {
                shape.fate = Fate::Column;
                shape.depth += 1;
                return Ok(vec![shape]);
            }
            if shape.is_corner() {
                shape.delete();
                return Ok(vec![shape]);
            }
        }
    } else {
        p /= EROSION_THRESHOLD;
    }

    if shape.depth >= MAX_DEPTH {
        return Ok(vec![shape.settle()]);
    }

    let axis = if p < 0.333 {
        Axis::X
    } else if p < 0.466 {
        Axis::Y
    } else {
        Axis::Z
    };
    shape.subdivide(axis, SubdivisionRange::DEFAULT, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ShapeKind, Status};
    use glam::Vec3;

    fn block_at_depth(depth: u32) -> ShapeSymbol {
        let mut shape = ShapeSymbol::block(Vec3::ZERO, Vec3::ZERO, Vec3::splat(2.0));
        shape.depth = depth;
        shape
    }

    #[test]
    fn low_draws_split_along_x() {
        let mut rng = RandomSource::deterministic(1);
        let pieces = block_at_depth(0).expand(0.1, &mut rng).unwrap();
        assert!(pieces.len() >= 2);
        assert!(pieces.iter().all(|p| p.subdiv_count == [1, 0, 0]));
    }

    #[test]
    fn high_draws_on_shallow_blocks_still_split() {
        let mut rng = RandomSource::deterministic(1);
        let pieces = block_at_depth(1).expand(0.9, &mut rng).unwrap();
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.subdiv_count[2] == 1));
    }

    #[test]
    fn ground_edge_piece_becomes_column_a_round_later() {
        let mut rng = RandomSource::deterministic(1);
        let mut shape = block_at_depth(2);
        shape.boundary.set(Face::Top, false);

        let out = shape.expand(0.95, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].fate, Fate::Column);
        assert_eq!(out[0].kind, ShapeKind::Block);
        assert_eq!(out[0].depth, 3);

        let column = out[0].clone().expand(0.5, &mut rng).unwrap();
        assert_eq!(column[0].kind, ShapeKind::Column);
        assert_eq!(column[0].status, Status::Terminal);
        assert!((column[0].scale.x - 0.6).abs() < 1e-6);
        assert!((column[0].scale.z - 0.4).abs() < 1e-6);
    }

    #[test]
    fn corner_pieces_are_deleted() {
        let mut rng = RandomSource::deterministic(1);
        let out = block_at_depth(2).expand(0.95, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_deleted());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn max_depth_blocks_stop() {
        let mut rng = RandomSource::deterministic(1);
        let out = block_at_depth(MAX_DEPTH).expand(0.5, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, Status::Terminal);
    }

    #[test]
    fn interior_blocks_cannot_expand() {
        let mut shape = block_at_depth(1);
        shape.boundary.set(Face::Top, false);
        shape.boundary.set(Face::Bottom, false);
        assert!(!shape.can_expand());
    }
}
