// Planetary System Generator - Procedural content
// Builds stellar systems (centre + planets + asteroids or the rocket) and decides
// where new systems may appear while exploring

use rand::Rng;

use crate::body::{Body, BodyKind, PLANET_VARIANTS};
use crate::explored_map::ExploredRegionMap;
use crate::orbit::OrbitSolver;
use crate::vector::{Vector2, WorldRect};

/// Max orbit radius for planets around their star
pub const DEFAULT_SYSTEM_ORBIT_RADIUS: f64 = 600.0;

/// Max orbit radius for asteroids (or the rocket) around their planet
pub const DEFAULT_LOCAL_ORBIT_RADIUS: f64 = 60.0;

/// Extra world units around the hidden margin that autonomous spawning may fill
pub const SPAWN_BUFFER: f64 = 1000.0;

/// World area (units²) per autonomous placement attempt
pub const DEFAULT_SPAWN_AREA_PER_ATTEMPT: f64 = 1_000_000.0;

/// Per-axis bound for the drift of autonomously spawned systems
pub const MAX_SYSTEM_DRIFT: f64 = 0.5;

pub const MIN_PLANETS: usize = 2;
pub const MAX_PLANETS: usize = 5;
pub const MAX_ASTEROIDS_PER_PLANET: usize = 5;

/// Orbit samples tried for the rocket before accepting an overlapping spot
pub const MAX_ROCKET_PLACEMENTS: usize = 64;

// =============================================================================
// SYSTEM GENERATION
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct SystemGenerator {
    pub system_orbit_radius: f64,
    pub local_orbit_radius: f64,
    pub solver: OrbitSolver,
}

impl SystemGenerator {
    pub fn new(solver: OrbitSolver) -> Self {
        Self {
            system_orbit_radius: DEFAULT_SYSTEM_ORBIT_RADIUS,
            local_orbit_radius: DEFAULT_LOCAL_ORBIT_RADIUS,
            solver,
        }
    }

    /// Bodies of a new system, ordered centre, planets, then asteroids (or the rocket).
    ///
    /// `central_kind` falls back to a random stellar kind when it is `None` or not
    /// stellar. With `include_rocket` the first planet gets the rocket instead of asteroids.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        center: Vector2,
        drift: Vector2,
        central_kind: Option<BodyKind>,
        include_rocket: bool,
        rng: &mut R,
    ) -> Vec<Body> {
        let kind = match central_kind {
            Some(kind) if kind.is_stellar() => kind,
            _ => BodyKind::random_stellar(rng),
        };
        let central = Body::of_kind(kind).with_position(center).with_velocity(drift);

        let planet_count = rng.gen_range(MIN_PLANETS..=MAX_PLANETS);
        let planets: Vec<Body> = (0..planet_count)
            .map(|_| {
                let mut planet = Body::of_kind(BodyKind::Planet)
                    .with_planet_variant(rng.gen_range(1..=PLANET_VARIANTS));
                self.solver
                    .place(&mut planet, &central, self.system_orbit_radius, rng);
                planet
            })
            .collect();

        let mut satellites = Vec::new();
        for (i, planet) in planets.iter().enumerate() {
            if i == 0 && include_rocket {
                continue;
            }
            let asteroid_count = rng.gen_range(0..=MAX_ASTEROIDS_PER_PLANET);
            for _ in 0..asteroid_count {
                let mut asteroid = Body::of_kind(BodyKind::Asteroid);
                self.solver
                    .place(&mut asteroid, planet, self.local_orbit_radius, rng);
                satellites.push(asteroid);
            }
        }

        if include_rocket {
            let others: Vec<&Body> = std::iter::once(&central)
                .chain(planets.iter())
                .chain(satellites.iter())
                .collect();
            let rocket = self.place_rocket(&planets[0], &others, rng);
            satellites.insert(0, rocket);
        }

        let mut bodies = Vec::with_capacity(1 + planets.len() + satellites.len());
        bodies.push(central);
        bodies.extend(planets);
        bodies.extend(satellites);
        bodies
    }

    /// Rocket in orbit around `planet`, resampled while it starts inside another body
    fn place_rocket<R: Rng + ?Sized>(&self, planet: &Body, others: &[&Body], rng: &mut R) -> Body {
        let mut rocket = Body::of_kind(BodyKind::PlayerRocket);
        for _ in 0..MAX_ROCKET_PLACEMENTS {
            self.solver
                .place(&mut rocket, planet, self.local_orbit_radius, rng);
            if !others.iter().any(|b| b.overlaps(&rocket)) {
                return rocket;
            }
        }
        log::warn!("no clear orbit for the rocket after {} tries", MAX_ROCKET_PLACEMENTS);
        rocket
    }
}

// =============================================================================
// AUTONOMOUS SPAWN PLANNING (exploration)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegions {
    /// Visible viewport grown by one system radius; nothing may appear in here
    pub hidden: WorldRect,
    /// `hidden` grown by the spawn buffer; candidates are drawn from this area
    pub spawnable: WorldRect,
}

impl SpawnRegions {
    pub fn around(visible: &WorldRect, system_orbit_radius: f64) -> Self {
        let hidden = visible.expanded(system_orbit_radius);
        Self {
            hidden,
            spawnable: hidden.expanded(SPAWN_BUFFER),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpawnPlanner {
    pub system_orbit_radius: f64,
    pub area_per_attempt: f64,
}

impl SpawnPlanner {
    pub fn attempts_for(&self, region: &WorldRect) -> usize {
        if self.area_per_attempt <= 0.0 {
            return 0;
        }
        (region.area() / self.area_per_attempt).ceil().max(0.0) as usize
    }

    /// Squared separation below which a new centre is too close to an existing one
    pub fn min_separation_sq(&self) -> f64 {
        2.0 * self.system_orbit_radius * self.system_orbit_radius
    }

    /// Centres for new systems around `visible`.
    ///
    /// Candidates are rejected in already-explored cells, inside the hidden margin,
    /// or too close to any existing (or just accepted) stellar centre.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        visible: &WorldRect,
        explored: &ExploredRegionMap,
        stellar_centres: &[Vector2],
        rng: &mut R,
    ) -> Vec<Vector2> {
        let regions = SpawnRegions::around(visible, self.system_orbit_radius);
        let area = regions.spawnable;
        if !(area.right() > area.x && area.bottom() > area.y) {
            return Vec::new();
        }
        let min_sep_sq = self.min_separation_sq();

        let mut accepted: Vec<Vector2> = Vec::new();
        for _ in 0..self.attempts_for(&area) {
            let candidate = Vector2::new(
                rng.gen_range(area.x..area.right()),
                rng.gen_range(area.y..area.bottom()),
            );

            if explored.is_explored(&candidate) || regions.hidden.contains(&candidate) {
                continue;
            }
            let crowded = stellar_centres
                .iter()
                .chain(accepted.iter())
                .any(|c| c.square_distance(&candidate) < min_sep_sq);
            if crowded {
                continue;
            }
            accepted.push(candidate);
        }
        accepted
    }
}

/// Small random drift for an autonomously spawned system
pub fn random_drift<R: Rng + ?Sized>(rng: &mut R) -> Vector2 {
    Vector2::new(
        rng.gen_range(-MAX_SYSTEM_DRIFT..=MAX_SYSTEM_DRIFT),
        rng.gen_range(-MAX_SYSTEM_DRIFT..=MAX_SYSTEM_DRIFT),
    )
}

// =============================================================================
// TESTS
// =============================================================================
