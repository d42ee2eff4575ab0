//! Engine-level tests driving the public handle the way a UI would.
//!
//! Most tests step the simulation on the test thread for determinism; the
//! threaded ones only assert properties that hold regardless of scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;

use gravity_sandbox_lib::{
    Body, BodyKind, SimConfig, SimError, SimulationEngine, SimulationMode, Vector2,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn config(mode: SimulationMode) -> SimConfig {
    SimConfig {
        seed: Some(2024),
        mode,
        tick_rate_hz: 240.0,
        ..SimConfig::default()
    }
}

fn random_asteroids(engine: &SimulationEngine, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..count {
        let body = Body::of_kind(BodyKind::Asteroid)
            .with_position(Vector2::new(rng.gen_range(0.0..300.0), rng.gen_range(0.0..300.0)))
            .with_velocity(Vector2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)));
        engine.add_body(body).unwrap();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_removed_bodies_never_reappear() {
    let engine = SimulationEngine::new(config(SimulationMode::Sandbox));
    random_asteroids(&engine, 60, 7);

    let mut seen_ids: Vec<u64> = engine.bodies_snapshot().iter().map(|b| b.id).collect();
    for _ in 0..50 {
        engine.step(10);
        let snapshot = engine.bodies_snapshot();

        assert!(snapshot.iter().all(|b| b.active));
        assert!(snapshot.iter().all(|b| seen_ids.contains(&b.id)));
        seen_ids.retain(|id| snapshot.iter().any(|b| b.id == *id));
    }

    let state = engine.state();
    let state = state.read();
    assert_eq!(state.removed_count as usize, 60 - state.bodies.len());
    let total_mass: f64 = state.bodies.iter().map(|b| b.mass).sum();
    assert!((total_mass - 60.0 * 5.0).abs() < 1e-9);
}

#[test]
fn test_threaded_run_pause_and_shutdown() {
    let mut engine = SimulationEngine::new(config(SimulationMode::Sandbox));
    engine.reset();
    engine.start().unwrap();

    thread::sleep(Duration::from_millis(100));
    engine.set_paused(true);
    // Let any in-flight tick finish
    thread::sleep(Duration::from_millis(20));
    let paused_at = engine.frontend_state().tick_count;
    let frozen = engine.bodies_snapshot();
    assert!(paused_at > 0);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.frontend_state().tick_count, paused_at);
    assert_eq!(engine.bodies_snapshot(), frozen);

    engine.set_paused(false);
    thread::sleep(Duration::from_millis(100));
    engine.shutdown();

    let stopped_at = engine.frontend_state().tick_count;
    assert!(stopped_at > paused_at);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.frontend_state().tick_count, stopped_at);
    assert_eq!(engine.stats().ticks, stopped_at);
}

#[test]
fn test_concurrent_commands_and_snapshots() {
    let mut engine = SimulationEngine::new(config(SimulationMode::Sandbox));
    engine.start().unwrap();

    for i in 0..20 {
        let body = Body::of_kind(BodyKind::Planet)
            .with_position(Vector2::new(i as f64 * 100.0, 0.0));
        engine.add_body(body).unwrap();
        let snapshot = engine.bodies_snapshot();
        assert!(snapshot.iter().all(|b| b.active && b.is_initialized()));
    }
    engine.spawn_system(Vector2::new(5000.0, 5000.0), Vector2::zero(), false);
    assert!(engine.bodies_snapshot().len() > 20);
}

#[test]
fn test_exploration_rocket_lifecycle() {
    let mut cfg = config(SimulationMode::Exploration);
    cfg.explosion_frames = 4;
    let engine = SimulationEngine::new(cfg);
    engine.reset();

    let rocket = engine.rocket().unwrap();
    assert!(rocket.body.active);
    assert_eq!(
        engine.bodies_snapshot().iter().filter(|b| b.is_rocket()).count(),
        1
    );

    // Park a black hole right on top of the rocket
    let hazard = Body::of_kind(BodyKind::BlackHole).with_position(rocket.body.position);
    engine.add_body(hazard).unwrap();
    engine.step(1);

    let rocket = engine.rocket().unwrap();
    assert!(!rocket.body.active);
    assert!(rocket.controls.exploding);
    assert!(!engine.is_game_over());

    while engine.advance_explosion().unwrap() {}
    assert!(engine.is_game_over());

    // The wreck is never swept and still accepts commands
    engine.step(30);
    assert!(engine.rocket().is_some());
    assert!(engine.set_firing(true).is_ok());
}

#[test]
fn test_rocket_only_in_one_place() {
    let engine = SimulationEngine::new(config(SimulationMode::Exploration));
    engine.reset();

    let rocket_body = Body::of_kind(BodyKind::PlayerRocket);
    assert_eq!(engine.add_body(rocket_body), Err(SimError::DuplicateRocket));

    let mut rocket = engine.rocket().unwrap();
    rocket.body.position = Vector2::new(-4000.0, -4000.0);
    let id = engine.set_rocket(rocket.clone());
    assert_eq!(id, rocket.body.id);
    assert_eq!(engine.rocket().unwrap().body.position, Vector2::new(-4000.0, -4000.0));
}

#[test]
fn test_exploration_spawns_as_viewport_moves() {
    let engine = SimulationEngine::new(config(SimulationMode::Exploration));
    engine.reset();
    let start = engine.bodies_snapshot().len();

    // First tick runs a spawn pass around the initial viewport
    engine.step(1);
    let after_first_pass = engine.bodies_snapshot().len();
    assert!(after_first_pass > start);

    // Jump far away: fresh unexplored space around the new viewport
    engine
        .set_visible_region(50_000.0, 50_000.0, 1000.0, 1000.0, 1.0)
        .unwrap();
    let spawn_interval = engine.state().read().config().spawn_interval_ticks as usize;
    engine.step(spawn_interval);
    let far_systems = engine
        .bodies_snapshot()
        .iter()
        .filter(|b| b.kind.is_stellar() && b.position.x > 40_000.0)
        .count();
    assert!(far_systems > 0);
}

#[test]
fn test_mode_switch_and_gravity_factor() {
    let engine = SimulationEngine::new(config(SimulationMode::Background));
    engine.reset();
    assert!(engine.rocket().is_none());

    engine.set_gravity_factor(2.0).unwrap();
    assert_eq!(engine.frontend_state().gravity_factor, 2.0);
    assert!(engine.set_gravity_factor(f64::NAN).is_err());

    engine.set_mode(SimulationMode::Exploration);
    engine.reset();
    assert_eq!(engine.mode(), SimulationMode::Exploration);
    assert!(engine.rocket().is_some());
}

#[test]
fn test_headless_run_returns_final_state() {
    let mut cfg = config(SimulationMode::Sandbox);
    cfg.run_seconds = 0.2;

    let state = gravity_sandbox_lib::run(cfg).unwrap();
    assert!(state.tick_count > 0);
    assert!(state.body_count >= 3);
    assert!(state.to_json().unwrap().contains("\"captured_at\""));
}
