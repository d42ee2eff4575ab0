// Rocket - Player-controlled body
// Orientation, thrust and explosion state layered on top of a regular Body

use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyKind};
use crate::vector::Vector2;

/// Velocity added per tick while the engines fire
pub const DEFAULT_THRUST: f64 = 0.01;

/// Degrees turned per tick while a rotation flag is held
pub const DEFAULT_ROTATION_STEP: i32 = 3;

/// Explosion animation length, in frames
pub const DEFAULT_EXPLOSION_FRAMES: u32 = 64;

// =============================================================================
// CONTROL STATE
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RocketControls {
    pub firing: bool,
    pub exploding: bool,
    pub explosion_frame: u32,
    rotating_ccw: bool,
    rotating_cw: bool,
    /// 0 = facing up, measured clockwise, always in [0, 360)
    heading_degrees: i32,
}

impl RocketControls {
    pub fn heading_degrees(&self) -> i32 {
        self.heading_degrees
    }

    pub fn set_heading(&mut self, angle: i32) {
        self.heading_degrees = angle.rem_euclid(360);
    }

    pub fn rotate(&mut self, delta: i32) {
        self.set_heading(self.heading_degrees + delta.rem_euclid(360));
    }

    pub fn is_rotating_ccw(&self) -> bool {
        self.rotating_ccw
    }

    pub fn is_rotating_cw(&self) -> bool {
        self.rotating_cw
    }

    pub fn set_rotating_ccw(&mut self, rotating: bool) {
        self.rotating_ccw = rotating;
        if rotating {
            self.rotating_cw = false;
        }
    }

    pub fn set_rotating_cw(&mut self, rotating: bool) {
        self.rotating_cw = rotating;
        if rotating {
            self.rotating_ccw = false;
        }
    }

    /// Thrust vector along the current heading.
    /// Screen y grows downwards, so "up" is negative y.
    pub fn thrust_vector(&self, thrust: f64) -> Vector2 {
        let radians = (self.heading_degrees as f64).to_radians();
        Vector2::new(thrust * radians.sin(), -thrust * radians.cos())
    }

    /// Apply one tick of held rotation
    pub fn step_rotation(&mut self, step: i32) {
        if self.rotating_cw {
            self.rotate(step);
        } else if self.rotating_ccw {
            self.rotate(-step);
        }
    }

    /// Advance the explosion animation. Returns false once it has finished.
    pub fn advance_explosion(&mut self, total_frames: u32) -> bool {
        if !self.exploding || self.explosion_frame >= total_frames {
            return false;
        }
        self.explosion_frame += 1;
        true
    }

    pub fn explosion_finished(&self, total_frames: u32) -> bool {
        self.exploding && self.explosion_frame >= total_frames
    }
}

// =============================================================================
// ROCKET VIEW
// =============================================================================

/// Detached copy of the rocket handed to and accepted from the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rocket {
    pub body: Body,
    pub controls: RocketControls,
}

impl Rocket {
    pub fn new(position: Vector2, velocity: Vector2) -> Self {
        let mut body = Body::of_kind(BodyKind::PlayerRocket)
            .with_position(position)
            .with_velocity(velocity);
        body.rocket = None;
        Self {
            body,
            controls: RocketControls::default(),
        }
    }

    pub fn from_body(body: &Body) -> Option<Self> {
        let controls = body.rocket?;
        let mut body = body.clone();
        body.rocket = None;
        Some(Self { body, controls })
    }

    pub fn into_body(self) -> Body {
        let mut body = self.body;
        body.kind = BodyKind::PlayerRocket;
        body.rocket = Some(self.controls);
        body
    }

    pub fn speed(&self) -> f64 {
        self.body.velocity.magnitude()
    }

    /// Direction of travel in degrees, 0 = +x, clockwise on screen
    pub fn travel_angle_degrees(&self) -> f64 {
        let v = self.body.velocity;
        if v.squared_magnitude() == 0.0 {
            return 0.0;
        }
        v.y.atan2(v.x).to_degrees()
    }
}

// =============================================================================
// TICK INTEGRATION
// =============================================================================

/// Rocket control pass for one tick: thrust first, then held rotation
pub fn integrate_controls(body: &mut Body, thrust: f64, rotation_step: i32) {
    if !body.active {
        return;
    }
    let Some(controls) = body.rocket.as_mut() else {
        return;
    };

    if controls.firing {
        body.velocity = body.velocity.add(&controls.thrust_vector(thrust));
    }
    controls.step_rotation(rotation_step);
}

/// Collision outcome for the rocket: stop dead and start the explosion
pub fn explode(body: &mut Body) {
    body.velocity = Vector2::zero();
    body.active = false;
    if let Some(controls) = body.rocket.as_mut() {
        controls.exploding = true;
        controls.firing = false;
    }
}

// =============================================================================
// TESTS
// =============================================================================
