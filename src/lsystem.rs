//! String-rewriting engine and sentence execution.
//!
//! The entry point is [`LSystem`]. Define symbols in an [`Alphabet`], hand it
//! to [`LSystem::new`] with a [`GeneratorConfig`] and a [`GeometrySink`], set
//! an axiom, rewrite it with [`LSystem::expand_string`], then materialize it
//! with [`LSystem::create_plant`].

use glam::{Mat4, Vec2, Vec4};
use tracing::{debug, warn};

use crate::config::{GeneratorConfig, Palette};
use crate::error::GrammarError;
use crate::random::RandomSource;
use crate::sink::{DecorationId, GeometrySink, PrismParams};
use crate::symbol::{Alphabet, SymbolId};
use crate::turtle::{Turtle, TurtleStack};

/// Height of a branch-tip cone relative to a full segment.
pub const TIP_LENGTH: f32 = 0.4;

/// State visible to a symbol action during execution.
///
/// Placement calls go through the context so the run can be measured
/// against [`GeneratorConfig::max_placements`].
pub struct ExecContext<'a> {
    turtles: TurtleStack,
    rng: &'a mut RandomSource,
    sink: &'a mut dyn GeometrySink,
    config: &'a GeneratorConfig,
    placements: usize,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        rng: &'a mut RandomSource,
        sink: &'a mut dyn GeometrySink,
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            turtles: TurtleStack::new(Turtle::default(), config.max_stack_depth),
            rng,
            sink,
            config,
            placements: 0,
        }
    }

    /// The turtle on top of the stack.
    pub fn turtle(&mut self) -> &mut Turtle {
        self.turtles.top_mut()
    }

    pub fn turtles(&self) -> &TurtleStack {
        &self.turtles
    }

    pub fn push_turtle(&mut self) -> Result<(), GrammarError> {
        self.turtles.push()
    }

    pub fn pop_turtle(&mut self) -> Result<(), GrammarError> {
        self.turtles.pop()
    }

    /// Draws from the shared random source.
    pub fn random(&mut self) -> f64 {
        self.rng.next_f64()
    }

    pub fn config(&self) -> &GeneratorConfig {
        self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.config.palette
    }

    pub fn use_color(&mut self, color: Vec4) {
        self.sink.use_color(color);
    }

    pub fn add_prism(&mut self, transform: Mat4, prism: PrismParams) {
        self.count_placement();
        self.sink.add_prism(transform, prism);
    }

    pub fn add_normal_correct_prism(&mut self, transform: Mat4, prism: PrismParams) {
        self.count_placement();
        self.sink.add_normal_correct_prism(transform, prism);
    }

    pub fn add_plane(&mut self, dims: Vec2) {
        self.count_placement();
        self.sink.add_plane(dims);
    }

    pub fn add_decoration(&mut self, mesh: DecorationId, transform: Mat4) {
        self.count_placement();
        self.sink.add_decoration(mesh, transform);
    }

    /// Places a branch segment `length` long at the turtle, tapering by
    /// [`GeneratorConfig::taper`]. The turtle keeps the thinner radius.
    pub fn prism_at_turtle(&mut self, length: f32) {
        let taper = self.config.taper;
        let turtle = self.turtles.top();
        let base = turtle.scale_top;
        let transform = turtle_frame(turtle);
        let prism = PrismParams::new(self.config.branch_sides, base, base * taper, length);
        self.add_prism(transform, prism);
        self.turtles.top_mut().scale_top = base * taper;
    }

    /// Places a branch segment without thinning it.
    pub fn prism_at_turtle_no_shrink(&mut self, length: f32) {
        let turtle = self.turtles.top();
        let base = turtle.scale_top;
        let transform = turtle_frame(turtle);
        let prism = PrismParams::new(self.config.branch_sides, base, base, length);
        self.add_prism(transform, prism);
    }

    /// Places a short cone closing a branch.
    pub fn tip_at_turtle(&mut self) {
        let turtle = self.turtles.top();
        let base = turtle.scale_top;
        let transform = turtle_frame(turtle);
        let prism = PrismParams::new(self.config.branch_sides, base, 0.0, TIP_LENGTH);
        self.add_prism(transform, prism);
    }

    /// Hangs a decoration mesh at the turtle.
    pub fn decoration_at_turtle(&mut self, mesh: DecorationId) {
        let transform = turtle_frame(self.turtles.top());
        self.add_decoration(mesh, transform);
    }

    fn count_placement(&mut self) {
        self.placements += 1;
        if let Some(max) = self.config.max_placements
            && self.placements == max + 1
        {
            warn!(max, "geometry budget exceeded");
        }
    }

    fn report(&self) -> ExecutionReport {
        ExecutionReport {
            placements: self.placements,
            budget_exceeded: self
                .config
                .max_placements
                .is_some_and(|max| self.placements > max),
        }
    }
}

fn turtle_frame(turtle: &Turtle) -> Mat4 {
    Mat4::from_rotation_translation(turtle.rotation(), turtle.position)
}

/// Summary of one execution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Geometry placements requested from the sink.
    pub placements: usize,
    /// Set when `placements` went beyond the configured cap. Emission is not
    /// truncated; the host decides what to do.
    pub budget_exceeded: bool,
}

/// Stochastic L-System: an axiom, its current rewrite, and the sink the
/// sentence is materialized into.
pub struct LSystem<S: GeometrySink> {
    alphabet: Alphabet,
    axiom: Vec<SymbolId>,
    sentence: Vec<SymbolId>,
    config: GeneratorConfig,
    plant: S,
}

impl<S: GeometrySink> LSystem<S> {
    pub fn new(alphabet: Alphabet, config: GeneratorConfig, plant: S) -> Self {
        Self {
            alphabet,
            axiom: Vec::new(),
            sentence: Vec::new(),
            config,
            plant,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Mutable access for runtime weight edits between passes.
    pub fn alphabet_mut(&mut self) -> &mut Alphabet {
        &mut self.alphabet
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    /// Stores the axiom and makes it the current sentence.
    pub fn set_axiom(&mut self, axiom: Vec<SymbolId>) -> Result<(), GrammarError> {
        self.alphabet.check_ids(&axiom)?;
        self.sentence = axiom.clone();
        self.axiom = axiom;
        Ok(())
    }

    pub fn axiom(&self) -> &[SymbolId] {
        &self.axiom
    }

    /// Restores the sentence to the axiom.
    pub fn reset_system(&mut self) {
        self.sentence = self.axiom.clone();
    }

    pub fn sentence(&self) -> &[SymbolId] {
        &self.sentence
    }

    /// Current sentence rendered as concatenated symbol names.
    pub fn sentence_string(&self) -> String {
        self.sentence
            .iter()
            .filter_map(|&id| self.alphabet.get(id).ok())
            .map(|s| s.name())
            .collect()
    }

    /// One rewrite pass. Every expandable symbol consumes exactly one draw,
    /// left to right. On error the sentence is left as it was.
    pub fn expand_string(&mut self, rng: &mut RandomSource) -> Result<(), GrammarError> {
        let mut next = Vec::with_capacity(self.sentence.len());
        for &id in &self.sentence {
            let symbol = self.alphabet.get(id)?;
            if symbol.can_expand() {
                next.extend_from_slice(symbol.choose(rng.next_f64())?);
            } else {
                next.push(id);
            }
        }
        debug!(
            before = self.sentence.len(),
            after = next.len(),
            "expanded sentence"
        );
        self.sentence = next;
        Ok(())
    }

    /// Applies `iterations` rewrite passes to the current sentence.
    pub fn run_iterations(
        &mut self,
        iterations: u32,
        rng: &mut RandomSource,
    ) -> Result<(), GrammarError> {
        for _ in 0..iterations {
            self.expand_string(rng)?;
        }
        Ok(())
    }

    /// Executes the sentence left to right into the sink.
    pub fn create_plant(
        &mut self,
        rng: &mut RandomSource,
    ) -> Result<ExecutionReport, GrammarError> {
        let mut ctx = ExecContext::new(rng, &mut self.plant, &self.config);
        for &id in &self.sentence {
            self.alphabet.get(id)?.run(&mut ctx)?;
        }
        let report = ctx.report();
        debug!(
            symbols = self.sentence.len(),
            placements = report.placements,
            "created plant"
        );
        Ok(report)
    }

    /// Alias of [`create_plant`](Self::create_plant).
    pub fn execute_string(
        &mut self,
        rng: &mut RandomSource,
    ) -> Result<ExecutionReport, GrammarError> {
        self.create_plant(rng)
    }

    /// Clears the sink without touching the sentence.
    pub fn reset_plant(&mut self) {
        self.plant.clear();
    }

    /// Reseeds, rebuilds the sentence from the axiom with `grow`, reseeds
    /// again and redraws, so the drawing does not depend on how many draws
    /// the rewriting consumed.
    pub fn regenerate_with<F>(
        &mut self,
        rng: &mut RandomSource,
        grow: F,
    ) -> Result<ExecutionReport, GrammarError>
    where
        F: FnOnce(&mut Self, &mut RandomSource) -> Result<(), GrammarError>,
    {
        rng.set_mode(self.config.random_mode);
        rng.set_seed(self.config.seed);
        self.reset_system();
        grow(self, rng)?;
        self.redraw(rng)
    }

    /// [`regenerate_with`](Self::regenerate_with) using plain
    /// [`GeneratorConfig::iterations`] passes.
    pub fn regenerate(&mut self, rng: &mut RandomSource) -> Result<ExecutionReport, GrammarError> {
        let iterations = self.config.iterations;
        self.regenerate_with(rng, |lsys, rng| lsys.run_iterations(iterations, rng))
    }

    /// Reseeds and redraws the current sentence.
    pub fn redraw(&mut self, rng: &mut RandomSource) -> Result<ExecutionReport, GrammarError> {
        rng.set_seed(self.config.seed);
        self.reset_plant();
        self.create_plant(rng)
    }

    pub fn plant(&self) -> &S {
        &self.plant
    }

    pub fn plant_mut(&mut self) -> &mut S {
        &mut self.plant
    }

    pub fn into_plant(self) -> S {
        self.plant
    }
}
