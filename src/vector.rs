// Vector - 2D world-space math
// Value types shared by every other module: positions, velocities, viewport rectangles

use serde::{Deserialize, Serialize};

/// Magnitudes below this are treated as zero when normalising
pub const EPSILON: f64 = 1e-10;

// =============================================================================
// 2D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn squared_magnitude(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction. Near-zero vectors are returned unchanged.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > EPSILON {
            Self {
                x: self.x / mag,
                y: self.y / mag,
            }
        } else {
            *self
        }
    }

    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn distance(&self, other: &Vector2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Squared distance, avoids the sqrt for comparisons
    pub fn square_distance(&self, other: &Vector2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

// =============================================================================
// AXIS-ALIGNED WORLD RECTANGLE
// =============================================================================

/// Rectangle in world units, `(x, y)` is the top-left corner (y grows downwards).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct WorldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WorldRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn contains(&self, point: &Vector2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

// =============================================================================
// TESTS
// =============================================================================
