//! Volumetric shape symbols and the subdivision grammar they follow.
//!
//! A [`ShapeSymbol`] is an oriented box-like volume. Each [`ShapeKind`] maps
//! the symbol's current `depth` to a transition (subdivide, mutate into a
//! different kind, defer a [`Fate`], or stop). Shapes are expanded as a tree
//! by [`ShapeGrammar`], never through the string rewriter.

mod block;
mod grammar;
mod house;
mod tower;

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

use bevy_math::primitives::{Cuboid, Measured2d, Measured3d, RegularPolygon};
use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::GrammarError;
use crate::random::RandomSource;
use crate::sink::{Facade, GeometrySink, PRISM_HEIGHT, PrismParams};

pub use grammar::{ShapeGrammar, ShapeReport};

const INV_SQRT_THREE: f32 = 0.577_350_26;
const SQRT_THREE_OVER_SIX: f32 = 0.288_675_13;
/// Cross-section area of the unit-side triangle used by roofs.
const TRIANGLE_SECTION: f32 = 0.433_012_7;

/// Palette slot for the draw `u`, shrunk slightly so `u` near 1 stays in range.
fn palette_index(u: f64, len: usize) -> usize {
    let index = (u * 0.99999 * len as f64).floor() as usize;
    index.min(len.saturating_sub(1))
}

/// One step of a kind's expansion policy.
pub(crate) type Transition =
    fn(ShapeSymbol, f64, &mut RandomSource) -> Result<Vec<ShapeSymbol>, GrammarError>;

/// Subdivision axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = GrammarError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Axis::ALL
            .get(index)
            .copied()
            .ok_or(GrammarError::InvalidAxis(index))
    }
}

/// End of an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Min,
    Max,
}

/// A face of the original bounding volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    Left,
    Right,
    Bottom,
    Top,
    Back,
    Front,
}

impl Face {
    pub fn new(axis: Axis, side: Side) -> Self {
        match (axis, side) {
            (Axis::X, Side::Min) => Face::Left,
            (Axis::X, Side::Max) => Face::Right,
            (Axis::Y, Side::Min) => Face::Bottom,
            (Axis::Y, Side::Max) => Face::Top,
            (Axis::Z, Side::Min) => Face::Back,
            (Axis::Z, Side::Max) => Face::Front,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Which faces of the original volume a piece still touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary([bool; 6]);

impl Boundary {
    pub const ALL: Boundary = Boundary([true; 6]);
    pub const NONE: Boundary = Boundary([false; 6]);

    pub fn touches(&self, face: Face) -> bool {
        self.0[face.slot()]
    }

    pub fn set(&mut self, face: Face, on: bool) {
        self.0[face.slot()] = on;
    }

    pub fn clear_axis(&mut self, axis: Axis) {
        self.set(Face::new(axis, Side::Min), false);
        self.set(Face::new(axis, Side::Max), false);
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::ALL
    }
}

/// Lifecycle of a shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Active,
    /// Finished; emits geometry and never expands again.
    Terminal,
    /// Logically removed: kept in the sequence, emits nothing.
    Deleted,
}

/// Classification decided at one depth and carried out at a later one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fate {
    #[default]
    Keep,
    /// Becomes a thin cylindrical [`ShapeKind::Column`].
    Column,
    Deleted,
}

/// Building-wide choices made by a tower at depth 0, inherited by every piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerStyle {
    /// Octagonal floors instead of square ones.
    pub round: bool,
    /// Floors are split again into alternating in/out bands.
    pub alternating: bool,
}

/// Concrete shape variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// High-density tower.
    Tower(TowerStyle),
    /// Medium-density block, eroded at its edges.
    Block,
    /// Low-density house.
    House,
    /// Triangular-prism roof.
    Roof,
    /// Tapered antenna on a tower.
    Spike,
    /// Thin cylindrical support.
    Column,
}

impl ShapeKind {
    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Tower(_) => "tower",
            ShapeKind::Block => "block",
            ShapeKind::House => "house",
            ShapeKind::Roof => "roof",
            ShapeKind::Spike => "spike",
            ShapeKind::Column => "column",
        }
    }

    fn default_sides(self) -> u32 {
        match self {
            ShapeKind::Roof => 3,
            ShapeKind::Column => 8,
            ShapeKind::Spike => 12,
            _ => 4,
        }
    }

    fn default_scale_top(self) -> f32 {
        match self {
            ShapeKind::Spike => 0.1,
            _ => 1.0,
        }
    }

    fn transition(self, depth: u32) -> Option<Transition> {
        match self {
            ShapeKind::Tower(_) => tower::transition(depth),
            ShapeKind::Block => block::transition(depth),
            ShapeKind::House => house::transition(depth),
            ShapeKind::Roof => house::roof_transition(depth),
            ShapeKind::Spike | ShapeKind::Column => None,
        }
    }

    /// Maps the canonical prism onto this kind's unit volume centred at the
    /// origin.
    pub fn to_unit_volume(self) -> Mat4 {
        match self {
            ShapeKind::Roof => {
                Mat4::from_translation(Vec3::new(0.0, -0.5 + SQRT_THREE_OVER_SIX, -0.5))
                    * Mat4::from_rotation_x(FRAC_PI_2)
                    * Mat4::from_rotation_y(FRAC_PI_2)
                    * Mat4::from_scale(Vec3::new(
                        INV_SQRT_THREE,
                        1.0 / PRISM_HEIGHT,
                        INV_SQRT_THREE,
                    ))
            }
            _ => Mat4::from_scale_rotation_translation(
                Vec3::new(FRAC_1_SQRT_2, 1.0 / PRISM_HEIGHT, FRAC_1_SQRT_2),
                Quat::from_rotation_y(FRAC_PI_4),
                Vec3::new(0.0, -0.5, 0.0),
            ),
        }
    }
}

/// Range of piece counts for one subdivision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdivisionRange {
    pub min: u32,
    /// Width of the range: counts fall in `min..min + range`.
    pub range: u32,
    /// Bump even counts to the next odd one.
    pub odd_only: bool,
    /// Add one extra piece when splitting along `Y`.
    pub vertical_bonus: bool,
}

impl SubdivisionRange {
    pub const DEFAULT: SubdivisionRange = SubdivisionRange {
        min: 2,
        range: 3,
        odd_only: false,
        vertical_bonus: true,
    };

    /// Piece count for the draw `u`.
    pub fn count(&self, axis: Axis, u: f64) -> Result<u32, GrammarError> {
        let mut count = self.min + (u * f64::from(self.range)).floor() as u32;
        if self.vertical_bonus && axis == Axis::Y {
            count += 1;
        }
        if self.odd_only && count % 2 == 0 {
            count += 1;
        }
        if count < 1 {
            return Err(GrammarError::DegenerateSubdivision { count });
        }
        Ok(count)
    }
}

impl Default for SubdivisionRange {
    fn default() -> Self {
        SubdivisionRange::DEFAULT
    }
}

/// An oriented volume in the shape grammar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSymbol {
    /// Debug label.
    pub name: String,
    pub kind: ShapeKind,
    /// Centre of the volume.
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    /// Full extents along each local axis.
    pub scale: Vec3,
    pub depth: u32,
    pub status: Status,
    pub fate: Fate,
    pub boundary: Boundary,
    /// Times subdivided along each axis.
    pub subdiv_count: [u32; 3],
    /// Debug tint assigned by the layout.
    pub color: Vec4,
    /// Material colour emitted to the sink.
    pub true_color: Vec4,
    /// Cross-section polygon count.
    pub sides: u32,
    /// Top-to-base scale ratio of the emitted prism.
    pub scale_top: f32,
    /// Euler angles in degrees, applied after the local transform.
    pub global_rotation: Vec3,
    pub global_translation: Vec3,
    pub facade: Facade,
}

impl ShapeSymbol {
    pub fn new(kind: ShapeKind, position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            name: kind.label().to_owned(),
            kind,
            position,
            rotation,
            scale,
            depth: 0,
            status: Status::Active,
            fate: Fate::Keep,
            boundary: Boundary::ALL,
            subdiv_count: [0; 3],
            color: Vec4::ONE,
            true_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            sides: kind.default_sides(),
            scale_top: kind.default_scale_top(),
            global_rotation: Vec3::ZERO,
            global_translation: Vec3::ZERO,
            facade: Facade::Plain,
        }
    }

    /// High-density tower; draws once to pick its colour.
    pub fn tower(position: Vec3, rotation: Vec3, scale: Vec3, rng: &mut RandomSource) -> Self {
        let mut shape = Self::new(
            ShapeKind::Tower(TowerStyle::default()),
            position,
            rotation,
            scale,
        );
        shape.true_color = tower::pick_color(rng.next_f64());
        shape
    }

    /// Medium-density block.
    pub fn block(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self::new(ShapeKind::Block, position, rotation, scale)
    }

    /// Low-density house; draws once to pick its colour.
    pub fn house(position: Vec3, rotation: Vec3, scale: Vec3, rng: &mut RandomSource) -> Self {
        let mut shape = Self::new(ShapeKind::House, position, rotation, scale);
        shape.true_color = house::pick_color(rng.next_f64());
        shape
    }

    /// Places the shape in a shared frame (e.g. a city grid cell).
    pub fn with_global(mut self, rotation: Vec3, translation: Vec3) -> Self {
        self.global_rotation = rotation;
        self.global_translation = translation;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status != Status::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.status == Status::Deleted
    }

    /// On a face of both horizontal axis pairs at once.
    pub fn is_corner(&self) -> bool {
        let b = &self.boundary;
        (b.touches(Face::Left) || b.touches(Face::Right))
            && (b.touches(Face::Back) || b.touches(Face::Front))
    }

    pub fn can_expand(&self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self.kind {
            ShapeKind::Block => {
                self.boundary.touches(Face::Bottom) || self.boundary.touches(Face::Top)
            }
            ShapeKind::Spike | ShapeKind::Column => false,
            _ => true,
        }
    }

    /// Deep copy preserving boundary flags, depth, colours and counters.
    pub fn spawn_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.name.push('*');
        copy
    }

    /// Marks the shape as logically removed.
    pub fn delete(&mut self) {
        self.status = Status::Deleted;
    }

    /// Runs the transition for the current depth. `p` is a fresh draw
    /// supplied by the driver. Terminal shapes come back unchanged and
    /// consume nothing.
    pub fn expand(
        mut self,
        p: f64,
        rng: &mut RandomSource,
    ) -> Result<Vec<ShapeSymbol>, GrammarError> {
        if self.is_terminal() {
            return Ok(vec![self]);
        }
        trace!(
            kind = self.kind.label(),
            depth = self.depth,
            p,
            "expanding shape"
        );
        match self.kind.transition(self.depth) {
            Some(step) => step(self, p, rng),
            None => {
                self.status = Status::Terminal;
                Ok(vec![self])
            }
        }
    }

    /// Splits the shape into `k` equal pieces along `axis`, `k` drawn from
    /// `range`. Returns `[self, copy_1, .., copy_{k-1}]` in axis order.
    pub fn subdivide(
        mut self,
        axis: Axis,
        range: SubdivisionRange,
        rng: &mut RandomSource,
    ) -> Result<Vec<ShapeSymbol>, GrammarError> {
        let count = range.count(axis, rng.next_f64())?;
        let i = axis.index();
        let original = self.scale[i];
        let piece = original / count as f32;
        let dir = self.orientation() * Vec3::AXES[i];

        self.subdiv_count[i] += 1;
        self.scale[i] = piece;
        self.position += dir * (original * 0.5 * (1.0 / count as f32) - original * 0.5);
        self.depth += 1;

        let min_face = Face::new(axis, Side::Min);
        let max_face = Face::new(axis, Side::Max);
        let had_min = self.boundary.touches(min_face);
        let had_max = self.boundary.touches(max_face);
        self.boundary.clear_axis(axis);

        let mut pieces = Vec::with_capacity(count as usize);
        for n in 1..count {
            let mut copy = self.spawn_copy();
            copy.position += dir * (n as f32 * piece);
            pieces.push(copy);
        }
        pieces.insert(0, self);

        pieces[0].boundary.set(min_face, had_min);
        if let Some(last) = pieces.last_mut() {
            last.boundary.set(max_face, had_max);
        }
        Ok(pieces)
    }

    /// Replaces this shape by a fresh one of `kind` occupying the same volume.
    pub fn into_kind(self, kind: ShapeKind) -> ShapeSymbol {
        ShapeSymbol {
            name: kind.label().to_owned(),
            kind,
            status: Status::Active,
            fate: Fate::Keep,
            subdiv_count: [0; 3],
            sides: kind.default_sides(),
            scale_top: kind.default_scale_top(),
            facade: Facade::Plain,
            ..self
        }
    }

    /// Thin terminal column standing where this shape was.
    pub fn into_column(self) -> ShapeSymbol {
        let mut column = self.into_kind(ShapeKind::Column);
        column.scale.x *= 0.3;
        column.scale.z *= 0.2;
        column.status = Status::Terminal;
        column
    }

    /// Applies a deferred fate and stops.
    pub(crate) fn settle(mut self) -> ShapeSymbol {
        match self.fate {
            Fate::Column => return self.into_column(),
            Fate::Deleted => self.delete(),
            Fate::Keep => self.status = Status::Terminal,
        }
        self
    }

    fn orientation(&self) -> Quat {
        euler_degrees(self.rotation)
    }

    /// Global × local × unit-volume transform of the emitted prism.
    pub fn placement(&self) -> Mat4 {
        let global = Mat4::from_rotation_translation(
            euler_degrees(self.global_rotation),
            self.global_translation,
        );
        let local =
            Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position);
        global * local * self.kind.to_unit_volume()
    }

    pub fn prism(&self) -> PrismParams {
        PrismParams {
            sides: self.sides,
            base_scale: 1.0,
            top_scale: self.scale_top,
            height_scale: 1.0,
            facade: self.facade,
        }
    }

    /// Emits the shape. Deleted shapes emit nothing and return `false`.
    pub fn emit(&self, sink: &mut dyn GeometrySink) -> bool {
        if self.is_deleted() {
            return false;
        }
        sink.use_color(self.true_color);
        sink.add_normal_correct_prism(self.placement(), self.prism());
        true
    }

    /// Approximate enclosed volume of the emitted prism.
    pub fn volume(&self) -> f32 {
        if self.is_deleted() {
            return 0.0;
        }
        let s = self.scale.abs();
        // Boxes and cylinders are inscribed in a circle of radius 1/√2.
        let section = match self.sides {
            3 => TRIANGLE_SECTION,
            sides => RegularPolygon::new(FRAC_1_SQRT_2, sides).area(),
        };
        let t = self.scale_top;
        Cuboid::new(s.x, s.y, s.z).volume() * section * (1.0 + t + t * t) / 3.0
    }
}

fn euler_degrees(angles: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        angles.x.to_radians(),
        angles.y.to_radians(),
        angles.z.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_block(scale: Vec3) -> ShapeSymbol {
        ShapeSymbol::block(Vec3::ZERO, Vec3::ZERO, scale)
    }

    #[test]
    fn axis_from_index_rejects_out_of_range() {
        assert_eq!(Axis::try_from(1), Ok(Axis::Y));
        assert_eq!(Axis::try_from(3), Err(GrammarError::InvalidAxis(3)));
    }

    #[test]
    fn range_applies_bonus_and_parity() {
        let range = SubdivisionRange {
            min: 3,
            range: 7,
            odd_only: true,
            vertical_bonus: false,
        };
        assert_eq!(range.count(Axis::Y, 0.0).unwrap(), 3);
        assert_eq!(range.count(Axis::Y, 0.15).unwrap(), 5);
        assert_eq!(SubdivisionRange::DEFAULT.count(Axis::Y, 0.0).unwrap(), 3);
        assert_eq!(SubdivisionRange::DEFAULT.count(Axis::X, 0.0).unwrap(), 2);
    }

    #[test]
    fn zero_range_is_degenerate() {
        let range = SubdivisionRange {
            min: 0,
            range: 1,
            odd_only: false,
            vertical_bonus: false,
        };
        assert_eq!(
            range.count(Axis::X, 0.5),
            Err(GrammarError::DegenerateSubdivision { count: 0 })
        );
    }

    #[test]
    fn subdivide_conserves_extent_and_tiles_the_parent() {
        let mut rng = RandomSource::deterministic(5);
        let parent = unit_block(Vec3::new(4.0, 8.0, 4.0));
        let pieces = parent
            .subdivide(Axis::Y, SubdivisionRange::DEFAULT, &mut rng)
            .unwrap();

        let total: f32 = pieces.iter().map(|p| p.scale.y).sum();
        assert!((total - 8.0).abs() < 1e-5);

        let bottom = pieces[0].position.y - pieces[0].scale.y * 0.5;
        let top = pieces.last().unwrap().position.y + pieces.last().unwrap().scale.y * 0.5;
        assert!((bottom + 4.0).abs() < 1e-5);
        assert!((top - 4.0).abs() < 1e-5);
        assert!(pieces.iter().all(|p| p.depth == 1));
        assert!(pieces.iter().all(|p| p.subdiv_count == [0, 1, 0]));
    }

    #[test]
    fn subdivide_keeps_outer_flags_only_on_end_pieces() {
        let mut rng = RandomSource::deterministic(11);
        let pieces = unit_block(Vec3::splat(6.0))
            .subdivide(Axis::X, SubdivisionRange::DEFAULT, &mut rng)
            .unwrap();
        let last = pieces.len() - 1;
        for (i, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.boundary.touches(Face::Left), i == 0);
            assert_eq!(piece.boundary.touches(Face::Right), i == last);
            assert!(piece.boundary.touches(Face::Top));
            assert!(piece.boundary.touches(Face::Front));
        }
    }

    #[test]
    fn interior_pieces_do_not_regain_flags() {
        let mut rng = RandomSource::deterministic(3);
        let mut middle = unit_block(Vec3::splat(6.0));
        middle.boundary.clear_axis(Axis::Z);
        let pieces = middle
            .subdivide(Axis::Z, SubdivisionRange::DEFAULT, &mut rng)
            .unwrap();
        assert!(pieces.iter().all(|p| !p.boundary.touches(Face::Back)));
        assert!(pieces.iter().all(|p| !p.boundary.touches(Face::Front)));
    }

    #[test]
    fn terminal_shapes_do_not_consume_randomness() {
        let mut rng = RandomSource::deterministic(0);
        let mut shape = unit_block(Vec3::ONE);
        shape.status = Status::Terminal;
        let before = shape.clone();
        let out = shape.expand(0.5, &mut rng).unwrap();
        assert_eq!(out, vec![before]);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn corner_needs_both_horizontal_pairs() {
        let mut shape = unit_block(Vec3::ONE);
        assert!(shape.is_corner());
        shape.boundary.clear_axis(Axis::Z);
        assert!(!shape.is_corner());
    }

    #[test]
    fn deleted_shapes_emit_nothing() {
        let mut sink = crate::sink::RecordingSink::new();
        let mut shape = unit_block(Vec3::ONE);
        shape.delete();
        assert!(!shape.emit(&mut sink));
        assert!(sink.calls.is_empty());
        assert_eq!(shape.volume(), 0.0);
    }

    #[test]
    fn box_volume_matches_extents() {
        let shape = unit_block(Vec3::new(2.0, 3.0, 4.0));
        assert!((shape.volume() - 24.0).abs() < 1e-4);
    }

    #[test]
    fn polygon_sides_drive_the_cross_section() {
        let mut shape = unit_block(Vec3::ONE);
        shape.sides = 8;
        let octagon = shape.volume();
        assert!((octagon - 2.0 * FRAC_1_SQRT_2).abs() < 1e-5);
        shape.sides = 12;
        let dodecagon = shape.volume();
        assert!((dodecagon - 1.5).abs() < 1e-5);
        assert!(1.0 < octagon && octagon < dodecagon);
        assert!(dodecagon < FRAC_PI_2);
    }

    #[test]
    fn unit_box_maps_prism_corners_to_unit_cube() {
        let m = ShapeKind::Block.to_unit_volume();
        // Canonical square prism vertex at 45 degrees, bottom ring.
        let corner = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((corner.x.abs() - 0.5).abs() < 1e-5);
        assert!((corner.z.abs() - 0.5).abs() < 1e-5);
        assert!((corner.y + 0.5).abs() < 1e-5);
    }
}
