// State Manager - Thread-safe simulation handle
// Owns the simulation worker thread and exposes commands and snapshots to the UI side

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::body::{Body, BodyId, BodyKind};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::physics_engine::{SimulationMode, SimulationState};
use crate::rocket::Rocket;
use crate::vector::{Vector2, WorldRect};

/// Window over which the worker measures its effective tick rate
const RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickStats {
    /// Ticks executed by the worker since it was started
    pub ticks: u64,
    /// Ticks per second over the last full measurement window
    pub effective_rate_hz: f64,
}

// =============================================================================
// ENGINE HANDLE
// =============================================================================

pub struct SimulationEngine {
    simulation: Arc<RwLock<SimulationState>>,
    stats: Arc<Mutex<TickStats>>,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            simulation: Arc::new(RwLock::new(SimulationState::new(config))),
            stats: Arc::new(Mutex::new(TickStats::default())),
            shutdown: Arc::new((Mutex::new(false), Condvar::new())),
            worker: None,
        }
    }

    /// Shared state for consumers that need to hold the lock across several calls
    pub fn state(&self) -> Arc<RwLock<SimulationState>> {
        self.simulation.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker thread ticking at the configured rate
    pub fn start(&mut self) -> SimResult<()> {
        if self.worker.is_some() {
            return Err(SimError::EngineAlreadyRunning);
        }
        *self.shutdown.0.lock() = false;
        *self.stats.lock() = TickStats::default();

        let tick_rate_hz = self.simulation.read().config().tick_rate_hz;
        if !(tick_rate_hz.is_finite() && tick_rate_hz > 0.0) {
            return Err(SimError::Config(format!("tick_rate_hz must be > 0, got {}", tick_rate_hz)));
        }
        let simulation = self.simulation.clone();
        let stats = self.stats.clone();
        let shutdown = self.shutdown.clone();

        self.worker = Some(thread::spawn(move || {
            run_loop(simulation, stats, shutdown, tick_rate_hz)
        }));
        log::info!("simulation thread started at {} Hz", tick_rate_hz);
        Ok(())
    }

    /// Stop and join the worker. No-op when it is not running.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        {
            let (flag, cvar) = &*self.shutdown;
            *flag.lock() = true;
            cvar.notify_all();
        }
        if handle.join().is_err() {
            log::warn!("simulation thread panicked");
        }
        log::info!("simulation thread stopped after {} ticks", self.stats.lock().ticks);
    }

    /// Run `n` ticks on the caller's thread. Returns how many actually ran: none while
    /// paused or while the worker thread is ticking.
    pub fn step(&self, n: usize) -> usize {
        if self.worker.is_some() {
            log::warn!("manual step ignored while the simulation thread is running");
            return 0;
        }
        let mut sim = self.simulation.write();
        (0..n).filter(|_| sim.step()).count()
    }

    pub fn stats(&self) -> TickStats {
        *self.stats.lock()
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    pub fn add_body(&self, body: Body) -> SimResult<BodyId> {
        rejected("add_body", self.simulation.write().add_body(body))
    }

    pub fn spawn_system(&self, center: Vector2, velocity: Vector2, include_rocket: bool) -> Vec<BodyId> {
        let ids = self
            .simulation
            .write()
            .spawn_system(center, velocity, None, include_rocket);
        log::info!("spawned system of {} bodies at ({:.0}, {:.0})", ids.len(), center.x, center.y);
        ids
    }

    pub fn reset(&self) {
        self.simulation.write().reset();
    }

    /// Deep copy of every body
    pub fn bodies_snapshot(&self) -> Vec<Body> {
        self.simulation.read().snapshot()
    }

    pub fn set_paused(&self, paused: bool) {
        self.simulation.write().is_paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.simulation.read().is_paused
    }

    pub fn set_gravity_factor(&self, factor: f64) -> SimResult<()> {
        rejected("set_gravity_factor", self.simulation.write().set_gravity_factor(factor))
    }

    pub fn set_mode(&self, mode: SimulationMode) {
        self.simulation.write().set_mode(mode);
    }

    pub fn mode(&self) -> SimulationMode {
        self.simulation.read().mode()
    }

    pub fn set_visible_region(&self, x: f64, y: f64, width: f64, height: f64, scale: f64) -> SimResult<()> {
        let region = WorldRect::new(x, y, width, height);
        rejected(
            "set_visible_region",
            self.simulation.write().set_visible_region(region, scale),
        )
    }

    pub fn set_spawn_kind(&self, kind: BodyKind) -> SimResult<()> {
        rejected("set_spawn_kind", self.simulation.write().set_spawn_kind(kind))
    }

    pub fn spawn_from_drag(&self, press: Vector2, release: Vector2) -> SimResult<Vec<BodyId>> {
        rejected("spawn_from_drag", self.simulation.write().spawn_from_drag(press, release))
    }

    pub fn rocket(&self) -> Option<Rocket> {
        self.simulation.read().rocket()
    }

    pub fn set_rocket(&self, rocket: Rocket) -> BodyId {
        self.simulation.write().set_rocket(rocket)
    }

    pub fn set_firing(&self, firing: bool) -> SimResult<()> {
        rejected("set_firing", self.simulation.write().set_firing(firing))
    }

    pub fn set_rotating_cw(&self, rotating: bool) -> SimResult<()> {
        rejected("set_rotating_cw", self.simulation.write().set_rotating_cw(rotating))
    }

    pub fn set_rotating_ccw(&self, rotating: bool) -> SimResult<()> {
        rejected("set_rotating_ccw", self.simulation.write().set_rotating_ccw(rotating))
    }

    pub fn rotate_rocket(&self, delta: i32) -> SimResult<()> {
        rejected("rotate_rocket", self.simulation.write().rotate_rocket(delta))
    }

    pub fn set_heading(&self, angle: i32) -> SimResult<()> {
        rejected("set_heading", self.simulation.write().set_heading(angle))
    }

    pub fn advance_explosion(&self) -> SimResult<bool> {
        self.simulation.write().advance_explosion()
    }

    pub fn is_game_over(&self) -> bool {
        self.simulation.read().is_game_over()
    }

    pub fn frontend_state(&self) -> FrontendState {
        self.simulation.read().to_frontend()
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn rejected<T>(command: &str, result: SimResult<T>) -> SimResult<T> {
    if let Err(e) = &result {
        log::warn!("{} rejected: {}", command, e);
    }
    result
}

// =============================================================================
// SIMULATION LOOP (runs in background thread)
// =============================================================================

fn run_loop(
    simulation: Arc<RwLock<SimulationState>>,
    stats: Arc<Mutex<TickStats>>,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    tick_rate_hz: f64,
) {
    let target_frame_time = Duration::from_secs_f64(1.0 / tick_rate_hz);
    let (stop_flag, wake) = &*shutdown;

    let mut window_start = Instant::now();
    let mut window_ticks: u64 = 0;

    loop {
        let start = Instant::now();

        // Pause is checked inside step(); an in-flight tick always completes
        if simulation.write().step() {
            window_ticks += 1;
            stats.lock().ticks += 1;
        }

        let window = window_start.elapsed();
        if window >= RATE_WINDOW {
            let rate = window_ticks as f64 / window.as_secs_f64();
            log::trace!("effective tick rate {:.1} Hz", rate);
            stats.lock().effective_rate_hz = rate;
            window_start = Instant::now();
            window_ticks = 0;
        }

        let mut stop = stop_flag.lock();
        if *stop {
            break;
        }
        let elapsed = start.elapsed();
        if elapsed < target_frame_time {
            wake.wait_for(&mut stop, target_frame_time - elapsed);
            if *stop {
                break;
            }
        }
    }
}

// =============================================================================
// SERIALIZABLE STATE FOR FRONTEND
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontendBody {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub radius: f64,
    pub mass: f64,
    pub planet_variant: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RocketTelemetry {
    pub speed: f64,
    pub travel_angle_degrees: f64,
    pub heading_degrees: i32,
    pub firing: bool,
    pub exploding: bool,
    pub explosion_frame: u32,
    pub game_over: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendState {
    pub bodies: Vec<FrontendBody>,
    pub tick_count: u64,
    pub is_paused: bool,
    pub mode: SimulationMode,
    pub gravity_factor: f64,
    pub body_count: usize,
    pub rocket: Option<RocketTelemetry>,
    pub captured_at: DateTime<Utc>,
}

impl FrontendState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl SimulationState {
    pub fn to_frontend(&self) -> FrontendState {
        let bodies: Vec<FrontendBody> = self
            .bodies
            .iter()
            .map(|b| FrontendBody {
                id: b.id,
                kind: b.kind,
                position: [b.position.x, b.position.y],
                velocity: [b.velocity.x, b.velocity.y],
                radius: b.radius(),
                mass: b.mass,
                planet_variant: b.planet_variant,
                active: b.active,
            })
            .collect();

        let explosion_frames = self.config().explosion_frames;
        let rocket = self.rocket().map(|r| RocketTelemetry {
            speed: r.speed(),
            travel_angle_degrees: r.travel_angle_degrees(),
            heading_degrees: r.controls.heading_degrees(),
            firing: r.controls.firing,
            exploding: r.controls.exploding,
            explosion_frame: r.controls.explosion_frame,
            game_over: r.controls.explosion_finished(explosion_frames),
        });

        FrontendState {
            body_count: bodies.len(),
            bodies,
            tick_count: self.tick_count,
            is_paused: self.is_paused,
            mode: self.mode(),
            gravity_factor: self.gravity_factor(),
            rocket,
            captured_at: Utc::now(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
