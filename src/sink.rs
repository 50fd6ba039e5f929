//! Geometry sink boundary.
//!
//! The grammar never builds meshes. It hands placement requests to a
//! [`GeometrySink`] supplied by the host; [`RecordingSink`] is an in-memory
//! implementation that keeps every call as a serializable [`SinkCall`].

use glam::{Mat4, Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// A decoration mesh identifier referencing a host-side asset table.
pub type DecorationId = u16;

/// Height of the canonical prism along its local `+Y`, from `y = 0`.
pub const PRISM_HEIGHT: f32 = 1.0;

/// Surface treatment hint for a placed prism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facade {
    #[default]
    Plain,
    /// Window texture on the side faces; `lit` selects the lights-on variant.
    Windows { lit: bool },
}

/// Parameters of a tapered N-gonal prism.
///
/// The canonical prism has circumradius 1 in the XZ plane and spans
/// `0..PRISM_HEIGHT` along `+Y` before `transform` is applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrismParams {
    pub sides: u32,
    pub base_scale: f32,
    pub top_scale: f32,
    pub height_scale: f32,
    pub facade: Facade,
}

impl PrismParams {
    pub fn new(sides: u32, base_scale: f32, top_scale: f32, height_scale: f32) -> Self {
        Self {
            sides,
            base_scale,
            top_scale,
            height_scale,
            facade: Facade::Plain,
        }
    }
}

/// Host-side receiver of placement requests. Append-only from the grammar's
/// point of view.
pub trait GeometrySink {
    /// Sets the colour applied to subsequently emitted geometry.
    fn use_color(&mut self, color: Vec4);

    /// Places a tapered prism.
    fn add_prism(&mut self, transform: Mat4, prism: PrismParams);

    /// Places a tapered prism whose normals are recomputed after the
    /// (possibly non-uniform) transform.
    fn add_normal_correct_prism(&mut self, transform: Mat4, prism: PrismParams);

    /// Places a flat ground plane with the given half-extents.
    fn add_plane(&mut self, dims: Vec2);

    /// Attaches a decorative mesh.
    fn add_decoration(&mut self, mesh: DecorationId, transform: Mat4);

    /// Drops everything emitted so far.
    fn clear(&mut self);
}

/// One recorded sink call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SinkCall {
    UseColor(Vec4),
    Prism {
        transform: Mat4,
        prism: PrismParams,
        normal_correct: bool,
    },
    Plane(Vec2),
    Decoration {
        mesh: DecorationId,
        transform: Mat4,
    },
}

impl SinkCall {
    /// True for calls that place geometry (everything but colour changes).
    pub fn is_placement(&self) -> bool {
        !matches!(self, SinkCall::UseColor(_))
    }
}

/// Sink that records calls in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of geometry placements recorded.
    pub fn placements(&self) -> usize {
        self.calls.iter().filter(|c| c.is_placement()).count()
    }

    pub fn prisms(&self) -> impl Iterator<Item = (&Mat4, &PrismParams)> {
        self.calls.iter().filter_map(|c| match c {
            SinkCall::Prism {
                transform, prism, ..
            } => Some((transform, prism)),
            _ => None,
        })
    }
}

impl GeometrySink for RecordingSink {
    fn use_color(&mut self, color: Vec4) {
        self.calls.push(SinkCall::UseColor(color));
    }

    fn add_prism(&mut self, transform: Mat4, prism: PrismParams) {
        self.calls.push(SinkCall::Prism {
            transform,
            prism,
            normal_correct: false,
        });
    }

    fn add_normal_correct_prism(&mut self, transform: Mat4, prism: PrismParams) {
        self.calls.push(SinkCall::Prism {
            transform,
            prism,
            normal_correct: true,
        });
    }

    fn add_plane(&mut self, dims: Vec2) {
        self.calls.push(SinkCall::Plane(dims));
    }

    fn add_decoration(&mut self, mesh: DecorationId, transform: Mat4) {
        self.calls.push(SinkCall::Decoration { mesh, transform });
    }

    fn clear(&mut self) {
        self.calls.clear();
    }
}
