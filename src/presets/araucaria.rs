//! Monkey-puzzle tree: a kinked trunk that turns upright, then a branchy
//! leader shedding whorls of long, upturned branches with bushy tips.

use std::f32::consts::PI;

use glam::Vec3;

use crate::config::GeneratorConfig;
use crate::error::GrammarError;
use crate::lsystem::{ExecContext, ExecutionReport, LSystem};
use crate::random::RandomSource;
use crate::sink::{DecorationId, GeometrySink, PRISM_HEIGHT};
use crate::symbol::{Action, Alphabet, ExpansionRule, SymbolId};
use crate::turtle::Turtle;

/// Decoration slot the host binds to its fruit mesh.
pub const FRUIT: DecorationId = 0;

/// Above this many passes the last [`SETTLE_PASSES`] run without spawning
/// new branch whorls, so late whorls are not left as bare stubs.
pub const STAGED_THRESHOLD: u32 = 9;
pub const SETTLE_PASSES: u32 = 5;

const TRUNK_BEND: f32 = PI * 0.133_333_3;
const TWIST: f32 = PI * 0.2;
const BRANCHY_TURN: f32 = PI * 0.1;
const BRANCHY_LIFT: f32 = 0.2;
const VERTIFY_LIFT: f32 = 0.8;
const LONG_LIFT: f32 = 0.2;
const LONG_THINNING: f32 = 0.8;
const LONG_SEGMENTS: usize = 5;
const LONG_FRUIT_CHANCE: f64 = 0.15;
const TIP_STEP: f32 = 0.4;

/// Araucaria grammar bound to a sink.
pub struct Araucaria<S: GeometrySink> {
    lsystem: LSystem<S>,
    /// `(B+x)`, `(B-x)`, `(B+y)`, `(B-y)`: their first rule spawns a whorl.
    branchy: [SymbolId; 4],
}

impl<S: GeometrySink> Araucaria<S> {
    pub fn new(config: GeneratorConfig, sink: S) -> Result<Self, GrammarError> {
        let mut alphabet = Alphabet::new();
        let (push, pop) = alphabet.define_branching()?;

        let trunk = alphabet.define("F", segment(2.0))?;
        let short = alphabet.define("(f)", segment(1.55))?;
        let mid = alphabet.define("(ff)", segment(1.75))?;
        let bend = alphabet.define("(+Z)", |ctx| {
            ctx.turtle().rotate_z(TRUNK_BEND);
            Ok(())
        })?;
        let fruit = alphabet.define("(pear)", |ctx| {
            hang_fruit(ctx);
            Ok(())
        })?;

        let twist_pos = alphabet.define("(T+Y)", twist(TWIST))?;
        let twist_neg = alphabet.define("(T-Y)", twist(-TWIST))?;
        let twist_start = alphabet.define_inert("(TS)")?;
        alphabet.set_rules(
            twist_start,
            vec![
                ExpansionRule::new(1.0, [twist_pos]),
                ExpansionRule::new(1.0, [twist_neg]),
            ],
        )?;
        alphabet.set_rules(twist_pos, twist_rules(twist_pos, twist_neg))?;
        alphabet.set_rules(twist_neg, twist_rules(twist_neg, twist_pos))?;

        let bx_pos = alphabet.define("(B+x)", branchy(Turtle::rotate_x, BRANCHY_TURN))?;
        let bx_neg = alphabet.define("(B-x)", branchy(Turtle::rotate_x, -BRANCHY_TURN))?;
        let by_pos = alphabet.define("(B+y)", branchy(Turtle::rotate_y, BRANCHY_TURN))?;
        let by_neg = alphabet.define("(B-y)", branchy(Turtle::rotate_y, -BRANCHY_TURN))?;
        let branchy_start = alphabet.define_inert("(BS)")?;
        alphabet.set_rules(
            branchy_start,
            [bx_pos, bx_neg, by_pos, by_neg]
                .into_iter()
                .map(|id| ExpansionRule::new(1.0, [id]))
                .collect(),
        )?;

        let whorl = alphabet.define_inert("(AS)")?;
        // Each leader piece: spawn, continue, swap sign, or veer on the other axis.
        for (this, opposite, other_pos, other_neg) in [
            (bx_pos, bx_neg, by_pos, by_neg),
            (bx_neg, bx_pos, by_pos, by_neg),
            (by_pos, by_neg, bx_pos, bx_neg),
            (by_neg, by_pos, bx_pos, bx_neg),
        ] {
            alphabet.set_rules(
                this,
                vec![
                    ExpansionRule::new(9.0, [this, whorl, whorl, whorl]),
                    ExpansionRule::new(6.0, [this]),
                    ExpansionRule::new(2.0, [this, opposite]),
                    ExpansionRule::new(1.0, [this, other_pos]),
                    ExpansionRule::new(1.0, [this, other_neg]),
                ],
            )?;
        }

        let vertify = alphabet.define("(vert)", |ctx| {
            for _ in 0..3 {
                ctx.prism_at_turtle(1.0);
                let turtle = ctx.turtle();
                turtle.move_forward(PRISM_HEIGHT);
                turtle.nudge(Vec3::new(0.0, VERTIFY_LIFT, 0.0));
            }
            Ok(())
        })?;
        let flatify = alphabet.define("(flat)", |ctx| {
            let angle = ctx.random() as f32 * 2.0 * PI;
            let y = -(ctx.random() as f32) * 0.3 + 0.05;
            aim(ctx.turtle(), angle, y);
            Ok(())
        })?;
        let randify = alphabet.define("(rand)", |ctx| {
            let angle = ctx.random() as f32 * 2.0 * PI;
            let y = ctx.random() as f32 * 1.8 - 0.9;
            aim(ctx.turtle(), angle, y);
            Ok(())
        })?;
        let long = alphabet.define("(AL)", |ctx| {
            ctx.turtle().scale_top *= LONG_THINNING;
            let length = 1.4 + ctx.random() as f32 * 0.2;
            for _ in 0..LONG_SEGMENTS {
                ctx.prism_at_turtle_no_shrink(length);
                let turtle = ctx.turtle();
                turtle.move_forward(PRISM_HEIGHT * length);
                turtle.nudge(Vec3::new(0.0, LONG_LIFT, 0.0));
                if ctx.random() < LONG_FRUIT_CHANCE {
                    hang_fruit(ctx);
                }
            }
            Ok(())
        })?;
        let tip = alphabet.define("(AT)", |ctx| {
            let leaf = ctx.palette().leaf;
            let wood = ctx.palette().wood;
            ctx.use_color(leaf);
            ctx.tip_at_turtle();
            ctx.use_color(wood);
            ctx.turtle().move_forward(PRISM_HEIGHT * TIP_STEP);
            Ok(())
        })?;

        // One long branch ending in three forked twigs.
        let cluster = {
            let fork = [push, randify, tip, push, randify, tip, pop, pop];
            let mut seq = vec![push, flatify, long, fruit, tip, push, randify, tip];
            for _ in 0..3 {
                seq.extend_from_slice(&fork);
            }
            seq.extend([pop, pop]);
            seq
        };
        let mut paired = cluster.clone();
        paired.extend_from_slice(&cluster);
        let mut climbing = cluster.clone();
        climbing.push(branchy_start);
        climbing.extend_from_slice(&cluster);
        alphabet.set_rules(
            whorl,
            vec![
                ExpansionRule::new(6.0, paired),
                ExpansionRule::new(1.0, climbing),
            ],
        )?;

        alphabet.set_rules(
            tip,
            vec![
                ExpansionRule::new(1.0, [tip]),
                ExpansionRule::new(6.0, [tip, push, randify, tip, pop]),
                ExpansionRule::new(3.0, [tip, fruit, push, randify, tip, pop]),
                ExpansionRule::new(0.5, [tip, tip]),
                ExpansionRule::new(0.5, [tip, fruit, tip]),
            ],
        )?;

        let mut lsystem = LSystem::new(alphabet, config, sink);
        lsystem.set_axiom(vec![
            short,
            bend,
            short,
            bend,
            short,
            bend,
            mid,
            twist_start,
            vertify,
            trunk,
            branchy_start,
        ])?;

        Ok(Self {
            lsystem,
            branchy: [bx_pos, bx_neg, by_pos, by_neg],
        })
    }

    pub fn lsystem(&self) -> &LSystem<S> {
        &self.lsystem
    }

    pub fn lsystem_mut(&mut self) -> &mut LSystem<S> {
        &mut self.lsystem
    }

    pub fn into_lsystem(self) -> LSystem<S> {
        self.lsystem
    }

    /// Rewrites the current sentence `iterations` times with the staged
    /// schedule. Whorl weights are restored even if a pass fails.
    pub fn run_iterations(
        &mut self,
        iterations: u32,
        rng: &mut RandomSource,
    ) -> Result<(), GrammarError> {
        staged_iterations(&mut self.lsystem, self.branchy, iterations, rng)
    }

    /// Rebuilds from the axiom with the configured iteration count and draws.
    pub fn regenerate(&mut self, rng: &mut RandomSource) -> Result<ExecutionReport, GrammarError> {
        let branchy = self.branchy;
        let iterations = self.lsystem.config().iterations;
        self.lsystem.regenerate_with(rng, |lsys, rng| {
            staged_iterations(lsys, branchy, iterations, rng)
        })
    }

    /// Current weight of the whorl-spawning rule.
    pub fn whorl_weight(&self) -> Result<f64, GrammarError> {
        self.lsystem.alphabet().rule_weight(self.branchy[0], 0)
    }
}

fn staged_iterations<S: GeometrySink>(
    lsys: &mut LSystem<S>,
    branchy: [SymbolId; 4],
    iterations: u32,
    rng: &mut RandomSource,
) -> Result<(), GrammarError> {
    if iterations <= STAGED_THRESHOLD {
        return lsys.run_iterations(iterations, rng);
    }
    lsys.run_iterations(iterations - SETTLE_PASSES, rng)?;

    let spawn_weight = lsys.alphabet().rule_weight(branchy[0], 0)?;
    set_whorl_weight(lsys.alphabet_mut(), branchy, 0.0)?;
    let settled = lsys.run_iterations(SETTLE_PASSES, rng);
    set_whorl_weight(lsys.alphabet_mut(), branchy, spawn_weight)?;
    settled
}

fn set_whorl_weight(
    alphabet: &mut Alphabet,
    branchy: [SymbolId; 4],
    weight: f64,
) -> Result<(), GrammarError> {
    for id in branchy {
        alphabet.set_rule_weight(id, 0, weight)?;
        alphabet.update_weights(id)?;
    }
    Ok(())
}

fn twist_rules(this: SymbolId, other: SymbolId) -> Vec<ExpansionRule> {
    vec![
        ExpansionRule::new(2.0, [this, this]),
        ExpansionRule::new(4.0, [this]),
        ExpansionRule::new(1.0, [this, other]),
    ]
}

/// Tapering trunk segment of length 2 advancing the turtle by `advance`.
fn segment(advance: f32) -> Action {
    Box::new(move |ctx| {
        ctx.prism_at_turtle(2.0);
        ctx.turtle().move_forward(PRISM_HEIGHT * advance);
        Ok(())
    })
}

fn twist(angle: f32) -> Action {
    Box::new(move |ctx| {
        ctx.turtle().rotate_y(angle);
        ctx.prism_at_turtle(1.0);
        ctx.turtle().move_forward(PRISM_HEIGHT * 0.8);
        Ok(())
    })
}

fn branchy(rotate: fn(&mut Turtle, f32), angle: f32) -> Action {
    Box::new(move |ctx| {
        let turtle = ctx.turtle();
        turtle.nudge(Vec3::new(0.0, BRANCHY_LIFT, 0.0));
        rotate(turtle, angle);
        ctx.prism_at_turtle(1.0);
        ctx.turtle().move_forward(PRISM_HEIGHT);
        Ok(())
    })
}

fn aim(turtle: &mut Turtle, angle: f32, y: f32) {
    turtle.orientation = Vec3::new(angle.cos(), y, angle.sin())
        .try_normalize()
        .unwrap_or(Vec3::Y);
}

fn hang_fruit(ctx: &mut ExecContext<'_>) {
    let fruit = ctx.palette().fruit;
    let wood = ctx.palette().wood;
    ctx.use_color(fruit);
    ctx.decoration_at_turtle(FRUIT);
    ctx.use_color(wood);
}
