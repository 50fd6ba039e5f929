use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ShapeSymbol;
use crate::error::GrammarError;
use crate::random::RandomSource;
use crate::sink::GeometrySink;

/// Outcome of emitting a shape sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeReport {
    /// Shapes in the sequence, deleted ones included.
    pub leaves: usize,
    /// Shapes that reached a terminal state (deleted ones included).
    pub terminal: usize,
    pub deleted: usize,
    /// Prisms handed to the sink.
    pub placements: usize,
    /// Summed approximate volume of the emitted prisms.
    pub built_volume: f32,
    pub budget_exceeded: bool,
}

/// Drives a sequence of shapes through expansion rounds.
///
/// Each round visits the sequence in order. Shapes that can expand get one
/// fresh draw and are replaced by whatever their transition returns; the
/// rest are carried over untouched.
#[derive(Clone, Debug, Default)]
pub struct ShapeGrammar {
    axiom: Vec<ShapeSymbol>,
    shapes: Vec<ShapeSymbol>,
    rounds: u32,
    max_placements: Option<usize>,
}

impl ShapeGrammar {
    pub fn new(axiom: Vec<ShapeSymbol>) -> Self {
        Self {
            shapes: axiom.clone(),
            axiom,
            rounds: 0,
            max_placements: None,
        }
    }

    /// Flags emission runs that place more than `max` prisms.
    pub fn with_budget(mut self, max: Option<usize>) -> Self {
        self.max_placements = max;
        self
    }

    pub fn set_axiom(&mut self, axiom: Vec<ShapeSymbol>) {
        self.axiom = axiom;
        self.reset();
    }

    /// Restores the sequence to the axiom.
    pub fn reset(&mut self) {
        self.shapes = self.axiom.clone();
        self.rounds = 0;
    }

    pub fn shapes(&self) -> &[ShapeSymbol] {
        &self.shapes
    }

    pub fn into_shapes(self) -> Vec<ShapeSymbol> {
        self.shapes
    }

    /// Rounds applied since the last reset.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// True while some shape can still expand.
    pub fn is_active(&self) -> bool {
        self.shapes.iter().any(ShapeSymbol::can_expand)
    }

    /// One expansion round. Returns whether anything expanded. On error the
    /// sequence is left as it was.
    pub fn expand_round(&mut self, rng: &mut RandomSource) -> Result<bool, GrammarError> {
        let mut next = Vec::with_capacity(self.shapes.len());
        let mut expanded = 0usize;
        for shape in self.shapes.iter().cloned() {
            if shape.can_expand() {
                let p = rng.next_f64();
                next.extend(shape.expand(p, rng)?);
                expanded += 1;
            } else {
                next.push(shape);
            }
        }
        debug!(
            round = self.rounds,
            expanded,
            before = self.shapes.len(),
            after = next.len(),
            "expanded shapes"
        );
        self.shapes = next;
        self.rounds += 1;
        Ok(expanded > 0)
    }

    /// Expands until nothing can expand or `max_rounds` rounds have run.
    /// Returns the number of rounds that expanded something.
    pub fn expand_until_terminal(
        &mut self,
        max_rounds: u32,
        rng: &mut RandomSource,
    ) -> Result<u32, GrammarError> {
        let mut productive = 0;
        for _ in 0..max_rounds {
            if !self.expand_round(rng)? {
                break;
            }
            productive += 1;
        }
        Ok(productive)
    }

    /// Emits every non-deleted shape in sequence order.
    pub fn emit(&self, sink: &mut dyn GeometrySink) -> ShapeReport {
        let mut report = ShapeReport {
            leaves: self.shapes.len(),
            ..Default::default()
        };
        for shape in &self.shapes {
            if shape.is_terminal() {
                report.terminal += 1;
            }
            if shape.emit(sink) {
                report.placements += 1;
                report.built_volume += shape.volume();
            } else {
                report.deleted += 1;
            }
        }
        if let Some(max) = self.max_placements
            && report.placements > max
        {
            warn!(
                max,
                placements = report.placements,
                "geometry budget exceeded"
            );
            report.budget_exceeded = true;
        }
        report
    }
}
