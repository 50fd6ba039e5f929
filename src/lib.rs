//! # symbios-shapes
//!
//! A stochastic grammar engine that grows trees and buildings into an
//! engine-agnostic [`GeometrySink`].
//!
//! Two grammars share one [`RandomSource`]:
//!
//! * a string-rewriting L-System ([`LSystem`]) whose symbols carry actions
//!   driving a turtle stack, and
//! * a shape grammar ([`ShapeGrammar`]) that recursively subdivides oriented
//!   volumes while tracking which faces of the original volume each piece
//!   still touches.
//!
//! The crate never builds meshes. Placements go to the sink as transforms
//! plus prism parameters; [`RecordingSink`] captures them for inspection.

pub mod config;
pub mod error;
pub mod lsystem;
pub mod noise;
pub mod presets;
pub mod random;
pub mod shape;
pub mod sink;
pub mod symbol;
pub mod turtle;

pub use config::{GeneratorConfig, Palette};
pub use error::GrammarError;
pub use lsystem::{ExecContext, ExecutionReport, LSystem};
pub use random::{RandomMode, RandomSource};
pub use shape::{
    Axis, Boundary, Face, Fate, ShapeGrammar, ShapeKind, ShapeReport, ShapeSymbol, Side, Status,
    SubdivisionRange, TowerStyle,
};
pub use sink::{DecorationId, Facade, GeometrySink, PrismParams, RecordingSink, SinkCall};
pub use symbol::{Alphabet, ExpansionRule, Symbol, SymbolId, WeightTable};
pub use turtle::{Turtle, TurtleStack};
