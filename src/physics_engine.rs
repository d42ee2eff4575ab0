// Physics Engine - N-body gravity, collisions and procedural exploration
// Owns the body collection and advances it one explicit-Euler tick at a time

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::body::{Body, BodyId, BodyKind, PLANET_VARIANTS};
use crate::config::SimConfig;
use crate::error::{validate_gravity_factor, SimError, SimResult};
use crate::explored_map::ExploredRegionMap;
use crate::generator::{random_drift, SpawnPlanner, SpawnRegions, SystemGenerator};
use crate::orbit::OrbitSolver;
use crate::rocket::{self, Rocket, RocketControls};
use crate::vector::{Vector2, WorldRect};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Gravitational constant in world units per tick
pub const G_DEFAULT: f64 = 0.05;

/// Distances are clamped to this before dividing
pub const MIN_GRAVITY_DISTANCE: f64 = 1.0;

/// Viewport edges must lie within this distance of the origin
pub const MAX_WORLD_COORDINATE: f64 = 1e9;

/// Launch velocity per world unit of mouse drag in sandbox mode
pub const DRAG_VELOCITY_FACTOR: f64 = 0.05;

/// Viewport assumed until the UI reports one
pub const DEFAULT_VIEWPORT: WorldRect = WorldRect {
    x: 0.0,
    y: 0.0,
    width: 1000.0,
    height: 1000.0,
};

// =============================================================================
// MODE
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Decorative system behind menus
    Background,
    /// User-driven spawning, no autonomous generation
    #[default]
    Sandbox,
    /// Rocket control with unbounded procedural generation
    Exploration,
}

impl FromStr for SimulationMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(SimulationMode::Background),
            "sandbox" => Ok(SimulationMode::Sandbox),
            "exploration" => Ok(SimulationMode::Exploration),
            other => Err(SimError::Config(format!("unknown simulation mode '{}'", other))),
        }
    }
}

// =============================================================================
// SIMULATION STATE
// =============================================================================

pub struct SimulationState {
    /// Authoritative collection; order only affects collision iteration order
    pub bodies: Vec<Body>,
    pub is_paused: bool,
    pub tick_count: u64,
    /// Bodies swept by cleanup since the last reset (the rocket is never swept)
    pub removed_count: u64,

    config: SimConfig,
    mode: SimulationMode,
    next_id: BodyId,
    rocket_id: Option<BodyId>,
    spawn_kind: BodyKind,
    viewport: WorldRect,
    scale: f64,
    explored: Option<ExploredRegionMap>,
    rng: StdRng,
}

impl SimulationState {
    /// Empty simulation; call `reset()` to populate it for the configured mode
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mode = config.mode;

        let mut state = Self {
            bodies: Vec::new(),
            is_paused: false,
            tick_count: 0,
            removed_count: 0,
            config,
            mode,
            next_id: 1,
            rocket_id: None,
            spawn_kind: BodyKind::Asteroid,
            viewport: DEFAULT_VIEWPORT,
            scale: 1.0,
            explored: None,
            rng,
        };
        if mode == SimulationMode::Exploration {
            state.explored = Some(state.fresh_map());
        }
        state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Effective G (base constant times runtime factor)
    pub fn gravity(&self) -> f64 {
        self.config.gravity()
    }

    pub fn gravity_factor(&self) -> f64 {
        self.config.gravity_factor
    }

    pub fn viewport(&self) -> (WorldRect, f64) {
        (self.viewport, self.scale)
    }

    pub fn explored_map(&self) -> Option<&ExploredRegionMap> {
        self.explored.as_ref()
    }

    pub fn spawn_kind(&self) -> BodyKind {
        self.spawn_kind
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.active).count()
    }

    /// Deep copy of every body
    pub fn snapshot(&self) -> Vec<Body> {
        self.bodies.clone()
    }

    fn solver(&self) -> OrbitSolver {
        OrbitSolver::new(self.gravity()).with_max_attempts(self.config.orbit_max_attempts)
    }

    fn generator(&self) -> SystemGenerator {
        SystemGenerator {
            system_orbit_radius: self.config.system_orbit_radius,
            local_orbit_radius: self.config.local_orbit_radius,
            solver: self.solver(),
        }
    }

    fn fresh_map(&self) -> ExploredRegionMap {
        ExploredRegionMap::new(
            self.viewport,
            self.config.map_cell_size,
            self.config.map_growth_step,
        )
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    pub fn set_gravity_factor(&mut self, factor: f64) -> SimResult<()> {
        validate_gravity_factor(factor)?;
        self.config.gravity_factor = factor;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: SimulationMode) {
        if self.mode == mode {
            return;
        }
        log::info!("simulation mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.explored = match mode {
            SimulationMode::Exploration => Some(self.fresh_map()),
            _ => None,
        };
    }

    pub fn set_spawn_kind(&mut self, kind: BodyKind) -> SimResult<()> {
        if kind == BodyKind::PlayerRocket {
            return Err(SimError::UnsupportedKind(kind));
        }
        self.spawn_kind = kind;
        Ok(())
    }

    /// Record the viewport. In exploration mode the explored map grows to follow it,
    /// and zooming out runs a spawn pass straight away so the newly exposed ring fills in.
    pub fn set_visible_region(&mut self, region: WorldRect, scale: f64) -> SimResult<()> {
        let invalid = || SimError::InvalidRegion {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            scale,
        };
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let in_world = |v: f64| v.is_finite() && v.abs() <= MAX_WORLD_COORDINATE;
        let edges = [region.x, region.y, region.right(), region.bottom()];
        if !(positive(region.width) && positive(region.height) && positive(scale))
            || !edges.iter().all(|&v| in_world(v))
        {
            return Err(invalid());
        }
        if let Some(map) = self.explored.as_ref() {
            let spawnable = SpawnRegions::around(&region, self.config.system_orbit_radius).spawnable;
            if !map.can_cover(&spawnable) {
                return Err(invalid());
            }
        }

        let zoomed_out = scale < self.scale;
        self.viewport = region;
        self.scale = scale;

        if self.mode == SimulationMode::Exploration {
            if let Some(map) = self.explored.as_mut() {
                map.ensure_covers(&region);
            }
            if zoomed_out {
                self.maybe_spawn_systems();
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    /// Assign an id and append. A rocket replaces the current one in place.
    fn insert(&mut self, mut body: Body) -> BodyId {
        if body.is_rocket() {
            if body.rocket.is_none() {
                body.rocket = Some(RocketControls::default());
            }
            if let Some(slot) = self.rocket_index() {
                body.id = self.bodies[slot].id;
                self.bodies[slot] = body;
                return self.bodies[slot].id;
            }
        }

        body.id = self.next_id;
        self.next_id += 1;
        if body.is_rocket() {
            self.rocket_id = Some(body.id);
        }
        let id = body.id;
        self.bodies.push(body);
        id
    }

    /// Add a single body. A `PlanetarySystem` request spawns a whole system centred
    /// on the body instead.
    pub fn add_body(&mut self, body: Body) -> SimResult<BodyId> {
        if !body.is_initialized() {
            return Err(SimError::InvalidBody {
                mass: body.mass,
                diameter: body.diameter,
            });
        }
        match body.kind {
            BodyKind::PlanetarySystem => {
                let ids = self.spawn_system(body.position, body.velocity, None, false);
                Ok(ids[0])
            }
            BodyKind::PlayerRocket if self.rocket_id.is_some() => Err(SimError::DuplicateRocket),
            _ => Ok(self.insert(body)),
        }
    }

    /// Generate and insert a whole system in one batch. Returns ids in insertion
    /// order, the central body first.
    pub fn spawn_system(
        &mut self,
        center: Vector2,
        velocity: Vector2,
        central_kind: Option<BodyKind>,
        include_rocket: bool,
    ) -> Vec<BodyId> {
        let generator = self.generator();
        let bodies = generator.generate(center, velocity, central_kind, include_rocket, &mut self.rng);
        log::debug!(
            "spawned {:?} system with {} bodies at ({:.0}, {:.0})",
            bodies[0].kind,
            bodies.len(),
            center.x,
            center.y
        );
        bodies.into_iter().map(|b| self.insert(b)).collect()
    }

    /// Sandbox click-and-drag spawn of the current spawn kind.
    /// Launch velocity points from the release point back through the press point.
    pub fn spawn_from_drag(&mut self, press: Vector2, release: Vector2) -> SimResult<Vec<BodyId>> {
        let velocity = press.sub(&release).scale(DRAG_VELOCITY_FACTOR);
        match self.spawn_kind {
            BodyKind::PlanetarySystem => Ok(self.spawn_system(press, velocity, None, false)),
            kind => {
                let body = Body::of_kind(kind).with_position(press).with_velocity(velocity);
                let body = if kind == BodyKind::Planet {
                    let variant = self.rng.gen_range(1..=PLANET_VARIANTS);
                    body.with_planet_variant(variant)
                } else {
                    body
                };
                Ok(vec![self.add_body(body)?])
            }
        }
    }

    /// Clear everything and repopulate for the current mode around the viewport centre
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.rocket_id = None;
        self.tick_count = 0;
        self.removed_count = 0;

        let centre = self.viewport.center();
        match self.mode {
            SimulationMode::Background | SimulationMode::Sandbox => {
                self.explored = None;
                self.spawn_system(centre, Vector2::zero(), None, false);
            }
            SimulationMode::Exploration => {
                self.explored = Some(self.fresh_map());
                self.spawn_system(centre, Vector2::zero(), Some(BodyKind::Star), true);
            }
        }
        log::info!("simulation reset ({:?}, {} bodies)", self.mode, self.bodies.len());
    }

    // -------------------------------------------------------------------------
    // Rocket
    // -------------------------------------------------------------------------

    fn rocket_index(&self) -> Option<usize> {
        let id = self.rocket_id?;
        self.bodies.iter().position(|b| b.id == id)
    }

    pub fn rocket(&self) -> Option<Rocket> {
        self.rocket_index()
            .and_then(|i| Rocket::from_body(&self.bodies[i]))
    }

    /// Replace the rocket (or insert one if there is none)
    pub fn set_rocket(&mut self, rocket: Rocket) -> BodyId {
        self.insert(rocket.into_body())
    }

    fn with_rocket<T>(&mut self, f: impl FnOnce(&mut RocketControls) -> T) -> SimResult<T> {
        let index = self.rocket_index().ok_or(SimError::RocketUnavailable)?;
        let controls = self.bodies[index]
            .rocket
            .as_mut()
            .ok_or(SimError::RocketUnavailable)?;
        Ok(f(controls))
    }

    pub fn set_firing(&mut self, firing: bool) -> SimResult<()> {
        self.with_rocket(|c| c.firing = firing)
    }

    pub fn set_rotating_cw(&mut self, rotating: bool) -> SimResult<()> {
        self.with_rocket(|c| c.set_rotating_cw(rotating))
    }

    pub fn set_rotating_ccw(&mut self, rotating: bool) -> SimResult<()> {
        self.with_rocket(|c| c.set_rotating_ccw(rotating))
    }

    pub fn rotate_rocket(&mut self, delta: i32) -> SimResult<()> {
        self.with_rocket(|c| c.rotate(delta))
    }

    pub fn set_heading(&mut self, angle: i32) -> SimResult<()> {
        self.with_rocket(|c| c.set_heading(angle))
    }

    /// Step the explosion animation one frame. False when not exploding or finished.
    pub fn advance_explosion(&mut self) -> SimResult<bool> {
        let frames = self.config.explosion_frames;
        self.with_rocket(|c| c.advance_explosion(frames))
    }

    pub fn is_game_over(&self) -> bool {
        let frames = self.config.explosion_frames;
        self.rocket()
            .map(|r| r.controls.explosion_finished(frames))
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advance one tick. Does nothing while paused; returns whether a tick ran.
    pub fn step(&mut self) -> bool {
        if self.is_paused {
            return false;
        }

        if self.mode == SimulationMode::Exploration
            && self.tick_count % self.config.spawn_interval_ticks.max(1) == 0
        {
            self.maybe_spawn_systems();
        }
        self.interaction_pass();
        if self.mode == SimulationMode::Exploration {
            self.rocket_control_pass();
        }
        self.movement_pass();

        self.tick_count += 1;
        true
    }

    /// Gravity and collisions over every ordered pair of bodies active at tick start.
    ///
    /// Every pair decision reads the pre-tick snapshot (position, mass, radius), so
    /// gravity is the pre-tick field whatever the iteration order, and a body absorbed
    /// earlier in the pass still pulls on the others. Merges only write to live bodies;
    /// a merge needs both bodies still live.
    fn interaction_pass(&mut self) {
        let g = self.gravity();
        let rocket_explodes = self.mode == SimulationMode::Exploration;
        let min_mass_ratio = self.config.min_mass_ratio;
        let max_distance = self.config.max_interaction_distance;

        let pre_tick: Vec<Option<PreTick>> = self.bodies.iter().map(PreTick::of).collect();

        let n = self.bodies.len();
        for i in 0..n {
            let Some(a_pre) = pre_tick[i] else {
                continue;
            };
            for j in 0..n {
                if i == j {
                    continue;
                }
                let Some(b_pre) = pre_tick[j] else {
                    continue;
                };
                let (a, b) = pair_mut(&mut self.bodies, i, j);
                if !a.active {
                    break;
                }

                if a_pre.overlaps(&b_pre) {
                    if b.active {
                        resolve_collision(a, b, rocket_explodes);
                    }
                    continue;
                }
                if is_negligible(&a_pre, &b_pre, min_mass_ratio, max_distance) {
                    continue;
                }
                apply_gravity(a, &b_pre, g);
            }
        }
    }

    fn rocket_control_pass(&mut self) {
        let thrust = self.config.thrust;
        let step = self.config.rotation_step_degrees;
        if let Some(i) = self.rocket_index() {
            rocket::integrate_controls(&mut self.bodies[i], thrust, step);
        }
    }

    /// Move active bodies, then sweep dead ones in a single pass
    fn movement_pass(&mut self) {
        for body in self.bodies.iter_mut().filter(|b| b.active) {
            body.advance();
        }

        let before = self.bodies.len();
        self.bodies.retain(|b| b.active || b.is_rocket());
        self.removed_count += (before - self.bodies.len()) as u64;
    }

    /// Exploration spawn pass: fill unexplored, out-of-view space with new systems,
    /// then mark the whole spawnable ring as explored. Returns the number of systems.
    pub fn maybe_spawn_systems(&mut self) -> usize {
        let Some(map) = self.explored.as_ref() else {
            return 0;
        };

        let planner = SpawnPlanner {
            system_orbit_radius: self.config.system_orbit_radius,
            area_per_attempt: self.config.spawn_area_per_attempt,
        };
        let stellar: Vec<Vector2> = self
            .bodies
            .iter()
            .filter(|b| b.active && b.kind.is_stellar())
            .map(|b| b.position)
            .collect();

        let centres = planner.plan(&self.viewport, map, &stellar, &mut self.rng);
        for centre in &centres {
            let drift = random_drift(&mut self.rng);
            self.spawn_system(*centre, drift, None, false);
        }

        let regions = SpawnRegions::around(&self.viewport, self.config.system_orbit_radius);
        if let Some(map) = self.explored.as_mut() {
            map.mark_explored(&regions.spawnable);
        }

        if !centres.is_empty() {
            log::debug!(
                "exploration spawn pass at tick {}: {} new systems",
                self.tick_count,
                centres.len()
            );
        }
        centres.len()
    }
}

// =============================================================================
// PAIR INTERACTIONS
// =============================================================================

/// Two distinct mutable borrows out of one slice
fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

fn resolve_collision(a: &mut Body, b: &mut Body, rocket_explodes: bool) {
    if rocket_explodes && (a.is_rocket() || b.is_rocket()) {
        let rocket = if a.is_rocket() { a } else { b };
        log::debug!("rocket destroyed at ({:.1}, {:.1})", rocket.position.x, rocket.position.y);
        rocket::explode(rocket);
        return;
    }

    if a.absorbs(b) {
        a.combine(b);
        b.active = false;
    } else {
        b.combine(a);
        a.active = false;
    }
}

fn is_negligible(a: &PreTick, b: &PreTick, min_mass_ratio: Option<f64>, max_distance: Option<f64>) -> bool {
    if let Some(ratio) = min_mass_ratio {
        if b.mass < a.mass * ratio {
            return true;
        }
    }
    if let Some(limit) = max_distance {
        if a.position.square_distance(&b.position) > limit * limit {
            return true;
        }
    }
    false
}

/// a.velocity += (b.pos - a.pos) * G * m_b / d³, d floored at MIN_GRAVITY_DISTANCE
fn apply_gravity(a: &mut Body, source: &PreTick, g: f64) {
    let offset = source.position.sub(&a.position);
    let distance = offset.magnitude().max(MIN_GRAVITY_DISTANCE);
    let pull = g * source.mass / (distance * distance * distance);
    a.velocity = a.velocity.add(&offset.scale(pull));
}

/// What the interaction pass reads about a body; `None` for bodies inactive at tick start
#[derive(Debug, Clone, Copy)]
struct PreTick {
    position: Vector2,
    mass: f64,
    radius: f64,
}

impl PreTick {
    fn of(body: &Body) -> Option<Self> {
        body.active.then(|| Self {
            position: body.position,
            mass: body.mass,
            radius: body.radius(),
        })
    }

    fn overlaps(&self, other: &PreTick) -> bool {
        let reach = self.radius + other.radius;
        self.position.square_distance(&other.position) < reach * reach
    }
}

// =============================================================================
// TESTS
// =============================================================================
