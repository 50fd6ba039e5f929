// tests/string_grammar.rs
use std::cell::RefCell;
use std::rc::Rc;

use symbios_shapes::{
    Alphabet, ExpansionRule, GeneratorConfig, GrammarError, LSystem, RandomMode, RandomSource,
    RecordingSink, SymbolId, Turtle,
};

struct Plant {
    lsys: LSystem<RecordingSink>,
    grow: SymbolId,
    seg: SymbolId,
    push: SymbolId,
    pop: SymbolId,
}

fn config(seed: i64) -> GeneratorConfig {
    GeneratorConfig {
        random_mode: RandomMode::Deterministic,
        seed,
        iterations: 4,
        ..Default::default()
    }
}

/// `A -> F [ + A ] A | F A | F`, with `F` a tapering segment and `+` a
/// random tilt.
fn setup(seed: i64) -> Plant {
    let mut alphabet = Alphabet::new();
    let (push, pop) = alphabet.define_branching().unwrap();
    let seg = alphabet
        .define("F", |ctx| {
            ctx.prism_at_turtle(1.0);
            ctx.turtle().move_forward(1.0);
            Ok(())
        })
        .unwrap();
    let tilt = alphabet
        .define("+", |ctx| {
            let angle = ctx.random() as f32;
            ctx.turtle().rotate_z(angle);
            Ok(())
        })
        .unwrap();
    let grow = alphabet.define_inert("A").unwrap();
    alphabet
        .set_rules(
            grow,
            vec![
                ExpansionRule::new(2.0, [seg, push, tilt, grow, pop, grow]),
                ExpansionRule::new(1.0, [seg, grow]),
                ExpansionRule::new(1.0, [seg]),
            ],
        )
        .unwrap();

    let mut lsys = LSystem::new(alphabet, config(seed), RecordingSink::new());
    lsys.set_axiom(vec![grow]).unwrap();
    Plant {
        lsys,
        grow,
        seg,
        push,
        pop,
    }
}

#[test]
fn test_deterministic_runs_are_identical() {
    let run = || {
        let mut plant = setup(7);
        let mut rng = plant.lsys.config().random_source();
        plant.lsys.run_iterations(5, &mut rng).unwrap();
        plant.lsys.create_plant(&mut rng).unwrap();
        (
            plant.lsys.sentence_string(),
            serde_json::to_string(plant.lsys.plant()).unwrap(),
        )
    };
    let (sentence_a, calls_a) = run();
    let (sentence_b, calls_b) = run();
    assert_eq!(sentence_a, sentence_b);
    assert_eq!(calls_a, calls_b, "sink calls differ");
}

#[test]
fn test_each_expandable_symbol_draws_once() {
    let mut plant = setup(3);
    let mut rng = plant.lsys.config().random_source();
    plant.lsys.expand_string(&mut rng).unwrap();
    assert_eq!(rng.draws(), 1);

    let expandable = plant
        .lsys
        .sentence()
        .iter()
        .filter(|&&id| id == plant.grow)
        .count() as u64;
    plant.lsys.expand_string(&mut rng).unwrap();
    assert_eq!(rng.draws(), 1 + expandable);
}

#[test]
fn test_selection_follows_cumulative_weights() {
    let mut alphabet = Alphabet::new();
    let a = alphabet.define_inert("a").unwrap();
    let b = alphabet.define_inert("b").unwrap();
    let c = alphabet.define_inert("c").unwrap();
    let s = alphabet.define_inert("S").unwrap();
    alphabet
        .set_rules(
            s,
            vec![
                ExpansionRule::new(1.0, [a]),
                ExpansionRule::new(1.0, [b]),
                ExpansionRule::new(2.0, [c]),
            ],
        )
        .unwrap();
    let symbol = alphabet.get(s).unwrap();
    assert_eq!(symbol.choose(0.10).unwrap(), &[a]);
    assert_eq!(symbol.choose(0.45).unwrap(), &[b]);
    assert_eq!(symbol.choose(0.80).unwrap(), &[c]);
}

#[test]
fn test_update_weights_is_idempotent() {
    let mut plant = setup(0);
    let alphabet = plant.lsys.alphabet_mut();
    alphabet.update_weights(plant.grow).unwrap();
    let first = alphabet.get(plant.grow).unwrap().weights().clone();
    alphabet.update_weights(plant.grow).unwrap();
    assert_eq!(alphabet.get(plant.grow).unwrap().weights(), &first);
}

#[test]
fn test_zero_total_weight_is_rejected() {
    let mut plant = setup(0);
    let grow = plant.grow;
    let alphabet = plant.lsys.alphabet_mut();
    for index in 0..3 {
        alphabet.set_rule_weight(grow, index, 0.0).unwrap();
    }
    assert!(matches!(
        alphabet.update_weights(grow),
        Err(GrammarError::InvalidRuleSet { .. })
    ));

    let mut rng = RandomSource::deterministic(0);
    assert!(matches!(
        plant.lsys.expand_string(&mut rng),
        Err(GrammarError::InvalidRuleSet { .. })
    ));
    assert_eq!(plant.lsys.sentence(), &[grow], "sentence changed");
}

#[test]
fn test_terminal_symbols_are_kept() {
    let mut plant = setup(0);
    plant
        .lsys
        .alphabet_mut()
        .mark_terminal(plant.grow, true)
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    plant.lsys.run_iterations(3, &mut rng).unwrap();
    assert_eq!(plant.lsys.sentence(), &[plant.grow]);
    assert_eq!(rng.draws(), 0);
}

#[test]
fn test_unbalanced_pop_underflows() {
    let mut plant = setup(0);
    plant
        .lsys
        .set_axiom(vec![plant.seg, plant.push, plant.seg, plant.pop, plant.pop])
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    assert_eq!(
        plant.lsys.create_plant(&mut rng),
        Err(GrammarError::StackUnderflow)
    );
}

#[test]
fn test_unknown_axiom_symbol_is_rejected() {
    let mut plant = setup(0);
    assert_eq!(
        plant.lsys.set_axiom(vec![plant.seg, 99]),
        Err(GrammarError::UnknownSymbol(99))
    );
}

#[test]
fn test_stack_limit_overflows() {
    let mut plant = setup(0);
    plant.lsys.config_mut().max_stack_depth = 2;
    plant
        .lsys
        .set_axiom(vec![plant.push, plant.push, plant.push])
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    assert_eq!(
        plant.lsys.create_plant(&mut rng),
        Err(GrammarError::StackOverflow { limit: 2 })
    );
}

#[test]
fn test_balanced_branches_restore_turtle_exactly() {
    let snapshots: Rc<RefCell<Vec<Turtle>>> = Rc::default();
    let mut plant = setup(0);
    let log = Rc::clone(&snapshots);
    let snap = plant
        .lsys
        .alphabet_mut()
        .define("@", move |ctx| {
            log.borrow_mut().push(ctx.turtles().top().clone());
            Ok(())
        })
        .unwrap();

    let (seg, push, pop) = (plant.seg, plant.push, plant.pop);
    plant
        .lsys
        .set_axiom(vec![
            seg, snap, push, seg, push, seg, seg, pop, seg, pop, snap, seg,
        ])
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    plant.lsys.create_plant(&mut rng).unwrap();

    let snaps = snapshots.borrow();
    assert_eq!(snaps.len(), 2);
    assert_eq!(snaps[0], snaps[1]);
    assert_eq!(snaps[0].depth, 0);
}

#[test]
fn test_segments_taper_along_a_branch() {
    let mut plant = setup(0);
    plant
        .lsys
        .set_axiom(vec![plant.seg, plant.seg, plant.seg])
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    let report = plant.lsys.create_plant(&mut rng).unwrap();
    assert_eq!(report.placements, 3);

    let prisms: Vec<_> = plant.lsys.plant().prisms().map(|(_, p)| *p).collect();
    let taper = plant.lsys.config().taper;
    assert_eq!(prisms[0].base_scale, 1.0);
    assert!((prisms[0].top_scale - taper).abs() < 1e-6);
    assert_eq!(prisms[1].base_scale, prisms[0].top_scale);
}

#[test]
fn test_regenerate_ignores_draws_spent_on_rewriting() {
    let mut plant = setup(11);
    let mut rng = RandomSource::default();
    let first = plant.lsys.regenerate(&mut rng).unwrap();
    let calls = plant.lsys.plant().clone();

    // Redraw replays the same stream from the seed on the same sentence.
    let second = plant.lsys.redraw(&mut rng).unwrap();
    assert_eq!(first, second);
    assert_eq!(plant.lsys.plant(), &calls);

    let third = plant.lsys.regenerate(&mut rng).unwrap();
    assert_eq!(first, third);
    assert_eq!(plant.lsys.plant(), &calls);
}

#[test]
fn test_reset_system_restores_axiom() {
    let mut plant = setup(5);
    let mut rng = plant.lsys.config().random_source();
    plant.lsys.run_iterations(3, &mut rng).unwrap();
    plant.lsys.reset_system();
    assert_eq!(plant.lsys.sentence_string(), "A");
}

#[test]
fn test_budget_is_flagged_not_enforced() {
    let mut plant = setup(0);
    plant.lsys.config_mut().max_placements = Some(2);
    plant
        .lsys
        .set_axiom(vec![plant.seg, plant.seg, plant.seg, plant.seg])
        .unwrap();
    let mut rng = RandomSource::deterministic(0);
    let report = plant.lsys.create_plant(&mut rng).unwrap();
    assert_eq!(report.placements, 4);
    assert!(report.budget_exceeded);
    assert_eq!(plant.lsys.plant().placements(), 4);
}
