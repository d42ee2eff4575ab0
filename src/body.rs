// Body - Celestial object record
// Asteroids, planets, stellar remnants and the player rocket share one representation

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rocket::RocketControls;
use crate::vector::Vector2;

/// Stable handle assigned by the simulation on insertion. 0 means "not yet inserted".
pub type BodyId = u64;

/// Diameter gained per unit of absorbed mass, divided by the absorber's current diameter
pub const DIAMETER_GROWTH_FACTOR: f64 = 0.2;

/// Number of cosmetic planet sprites
pub const PLANET_VARIANTS: u8 = 5;

// =============================================================================
// BODY KIND
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Asteroid,
    Planet,
    Star,
    WhiteDwarf,
    BlackHole,
    /// Spawn request for a whole system, resolved to a stellar kind before insertion
    PlanetarySystem,
    PlayerRocket,
}

impl BodyKind {
    /// Kinds that can anchor a planetary system
    pub const STELLAR: [BodyKind; 3] = [BodyKind::Star, BodyKind::WhiteDwarf, BodyKind::BlackHole];

    pub fn is_stellar(self) -> bool {
        matches!(self, BodyKind::Star | BodyKind::WhiteDwarf | BodyKind::BlackHole)
    }

    pub fn random_stellar<R: Rng + ?Sized>(rng: &mut R) -> BodyKind {
        Self::STELLAR[rng.gen_range(0..Self::STELLAR.len())]
    }

    /// (mass, diameter) a freshly spawned body of this kind starts with
    pub fn preset(self) -> (f64, f64) {
        match self {
            BodyKind::Asteroid => (5.0, 5.0),
            BodyKind::Planet => (40.0, 16.0),
            BodyKind::Star => (1000.0, 50.0),
            BodyKind::WhiteDwarf => (1500.0, 24.0),
            BodyKind::BlackHole => (3000.0, 16.0),
            // Resolved to a stellar kind at spawn time; sized like a star for previews
            BodyKind::PlanetarySystem => (1000.0, 50.0),
            BodyKind::PlayerRocket => (5.0, 5.0),
        }
    }
}

// =============================================================================
// BODY
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub mass: f64,
    pub diameter: f64,
    pub position: Vector2,
    pub velocity: Vector2,
    pub kind: BodyKind,
    /// 1..=5 for planets, 0 for everything else
    pub planet_variant: u8,
    /// False once the body has been absorbed; swept at the end of the tick
    pub active: bool,
    /// Present only on the player rocket
    pub rocket: Option<RocketControls>,
}

impl Default for Body {
    /// Uninitialised body: mass and diameter carry the -1 sentinel
    fn default() -> Self {
        Self {
            id: 0,
            mass: -1.0,
            diameter: -1.0,
            position: Vector2::new(-1.0, -1.0),
            velocity: Vector2::new(-1.0, -1.0),
            kind: BodyKind::Asteroid,
            planet_variant: 0,
            active: true,
            rocket: None,
        }
    }
}

impl Body {
    pub fn new(mass: f64, diameter: f64, position: Vector2, velocity: Vector2, kind: BodyKind) -> Self {
        Self {
            id: 0,
            mass,
            diameter,
            position,
            velocity,
            kind,
            planet_variant: if kind == BodyKind::Planet { 1 } else { 0 },
            active: true,
            rocket: if kind == BodyKind::PlayerRocket {
                Some(RocketControls::default())
            } else {
                None
            },
        }
    }

    /// Body with the preset mass and diameter for its kind, at rest at the origin
    pub fn of_kind(kind: BodyKind) -> Self {
        let (mass, diameter) = kind.preset();
        Self::new(mass, diameter, Vector2::zero(), Vector2::zero(), kind)
    }

    pub fn with_position(mut self, position: Vector2) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_planet_variant(mut self, variant: u8) -> Self {
        if self.kind == BodyKind::Planet {
            self.planet_variant = variant.clamp(1, PLANET_VARIANTS);
        }
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.mass > 0.0 && self.diameter > 0.0 && self.mass.is_finite() && self.diameter.is_finite()
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn is_rocket(&self) -> bool {
        self.kind == BodyKind::PlayerRocket
    }

    /// Circle-circle overlap: centres closer than the sum of the radii
    pub fn overlaps(&self, other: &Body) -> bool {
        let reach = self.radius() + other.radius();
        self.position.square_distance(&other.position) < reach * reach
    }

    /// Whether this body wins a merge against `other`.
    /// Heavier body absorbs; equal masses go to the older (lower id) body.
    pub fn absorbs(&self, other: &Body) -> bool {
        if self.mass != other.mass {
            self.mass > other.mass
        } else {
            self.id <= other.id
        }
    }

    /// Absorb `other` into this body. `other` is not modified; the caller deactivates it.
    pub fn combine(&mut self, other: &Body) {
        let total_mass = self.mass + other.mass;

        self.velocity = self
            .velocity
            .scale(self.mass)
            .add(&other.velocity.scale(other.mass))
            .scale(1.0 / total_mass);
        self.diameter += DIAMETER_GROWTH_FACTOR * other.mass / self.diameter;
        self.mass = total_mass;
    }

    /// Advance one tick: position += velocity
    pub fn advance(&mut self) {
        self.position = self.position.add(&self.velocity);
    }
}

// =============================================================================
// TESTS
// =============================================================================
