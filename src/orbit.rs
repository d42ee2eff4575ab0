// Orbit Solver - Circular orbit placement
// Picks a start position around a reference body and the velocity that keeps it in a circular orbit

use rand::Rng;
use std::f64::consts::PI;

use crate::body::Body;
use crate::vector::Vector2;

/// Rejection-sampling budget before falling back to the minimum safe distance
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPlacement {
    pub position: Vector2,
    pub velocity: Vector2,
    /// True when sampling gave up and the body was put at the minimum safe distance
    pub fell_back: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitSolver {
    /// Effective gravitational constant (already scaled by the runtime factor)
    pub gravity: f64,
    pub max_attempts: u32,
}

impl OrbitSolver {
    pub fn new(gravity: f64) -> Self {
        Self {
            gravity,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Position + velocity for a circular orbit around `central`.
    ///
    /// Candidates are drawn uniformly from the square of half-width `max_orbit_radius`
    /// centred on `central` and rejected while they land inside one parent diameter.
    /// The orbital velocity is added to the parent's own velocity so satellites drift with it.
    pub fn compute_orbit<R: Rng + ?Sized>(
        &self,
        central: &Body,
        max_orbit_radius: f64,
        rng: &mut R,
    ) -> OrbitPlacement {
        let min_distance_sq = central.diameter * central.diameter;
        let radius = max_orbit_radius.abs();

        let mut offset = None;
        if radius > 0.0 {
            for _ in 0..self.max_attempts {
                let candidate = Vector2::new(rng.gen_range(-radius..=radius), rng.gen_range(-radius..=radius));
                if candidate.squared_magnitude() >= min_distance_sq && candidate.squared_magnitude() > 0.0 {
                    offset = Some(candidate);
                    break;
                }
            }
        }

        let fell_back = offset.is_none();
        let offset = offset.unwrap_or_else(|| {
            log::warn!(
                "orbit sampling exhausted (radius {:.1} vs parent diameter {:.1}), using minimum safe distance",
                max_orbit_radius,
                central.diameter
            );
            let angle = rng.gen_range(0.0..2.0 * PI);
            let distance = central.diameter.max(1.0);
            Vector2::new(distance * angle.cos(), distance * angle.sin())
        });

        let distance = offset.magnitude();
        let speed = (self.gravity * central.mass / distance).sqrt();

        // Perpendicular to the offset. atan() folds left/right half-planes together,
        // the coin toss restores an unbiased orbital direction.
        let theta = (offset.y / offset.x).atan();
        let mut orbital = Vector2::new(-speed * theta.sin(), speed * theta.cos());
        if rng.gen_bool(0.5) {
            orbital = orbital.scale(-1.0);
        }

        OrbitPlacement {
            position: central.position.add(&offset),
            velocity: central.velocity.add(&orbital),
            fell_back,
        }
    }

    /// Place `body` in orbit around `central`, overwriting its position and velocity
    pub fn place<R: Rng + ?Sized>(&self, body: &mut Body, central: &Body, max_orbit_radius: f64, rng: &mut R) {
        let placement = self.compute_orbit(central, max_orbit_radius, rng);
        body.position = placement.position;
        body.velocity = placement.velocity;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn star_at(x: f64, y: f64) -> Body {
        Body::of_kind(BodyKind::Star).with_position(Vector2::new(x, y))
    }

    #[test]
    fn test_orbit_outside_parent_and_within_square() {
        let solver = OrbitSolver::new(0.05);
        let star = star_at(100.0, -40.0);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let placement = solver.compute_orbit(&star, 600.0, &mut rng);
            let offset = placement.position.sub(&star.position);
            assert!(!placement.fell_back);
            assert!(offset.magnitude() >= star.diameter);
            assert!(offset.x.abs() <= 600.0 && offset.y.abs() <= 600.0);
        }
    }

    #[test]
    fn test_orbit_velocity_is_circular_and_tangential() {
        let solver = OrbitSolver::new(0.05);
        let star = star_at(0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let placement = solver.compute_orbit(&star, 600.0, &mut rng);
            let r = placement.position.magnitude();
            let expected = (0.05 * star.mass / r).sqrt();
            assert!((placement.velocity.magnitude() - expected).abs() < 1e-9);
            let radial = placement.position.normalize().dot(&placement.velocity.normalize());
            assert!(radial.abs() < 1e-9);
        }
    }

    #[test]
    fn test_orbit_inherits_parent_drift() {
        let solver = OrbitSolver::new(0.0);
        let star = star_at(0.0, 0.0).with_velocity(Vector2::new(0.3, -0.2));
        let mut rng = StdRng::seed_from_u64(3);

        let placement = solver.compute_orbit(&star, 400.0, &mut rng);
        assert!((placement.velocity.x - 0.3).abs() < 1e-12);
        assert!((placement.velocity.y + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_orbit_direction_not_biased() {
        let solver = OrbitSolver::new(0.05);
        let star = star_at(0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(99);

        let mut clockwise = 0;
        for _ in 0..400 {
            let p = solver.compute_orbit(&star, 600.0, &mut rng);
            // z of r x v
            if p.position.x * p.velocity.y - p.position.y * p.velocity.x > 0.0 {
                clockwise += 1;
            }
        }
        assert!(clockwise > 120 && clockwise < 280, "clockwise = {}", clockwise);
    }

    #[test]
    fn test_orbit_radius_too_small_falls_back() {
        let solver = OrbitSolver::new(0.05).with_max_attempts(50);
        let star = star_at(10.0, 10.0);
        let mut rng = StdRng::seed_from_u64(1);

        let placement = solver.compute_orbit(&star, 5.0, &mut rng);
        assert!(placement.fell_back);
        let distance = placement.position.distance(&star.position);
        assert!((distance - star.diameter).abs() < 1e-9);
        assert!(placement.velocity.magnitude().is_finite());
    }
}
