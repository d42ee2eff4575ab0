// Error - Simulation error types
// Physics never fails (distances are clamped, orbit sampling is bounded); only UI
// commands and configuration loading return errors

use std::fmt;

use crate::body::BodyKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Body with non-positive, non-finite or sentinel mass/diameter
    InvalidBody { mass: f64, diameter: f64 },

    /// Gravity factor must be finite and strictly positive
    InvalidGravityFactor(f64),

    /// Viewport with a non-positive extent or scale, a non-finite or out-of-world
    /// origin, or too large for the explored map
    InvalidRegion {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        scale: f64,
    },

    /// Rocket command issued while no rocket is in the simulation
    RocketUnavailable,

    /// A second rocket was added while one already exists
    DuplicateRocket,

    /// Kind cannot be used for the requested operation
    UnsupportedKind(BodyKind),

    /// `start()` called on an engine whose worker is already running
    EngineAlreadyRunning,

    /// Reading, parsing or validating configuration failed
    Config(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidBody { mass, diameter } => write!(
                f,
                "invalid body: mass {} and diameter {} must both be positive",
                mass, diameter
            ),
            SimError::InvalidGravityFactor(factor) => {
                write!(f, "gravity factor {} must be finite and > 0", factor)
            }
            SimError::InvalidRegion {
                x,
                y,
                width,
                height,
                scale,
            } => write!(
                f,
                "invalid visible region {}x{} at ({}, {}) scale {}",
                width, height, x, y, scale
            ),
            SimError::RocketUnavailable => write!(f, "no rocket in the simulation"),
            SimError::DuplicateRocket => write!(f, "simulation already has a rocket"),
            SimError::UnsupportedKind(kind) => {
                write!(f, "body kind {:?} not supported here", kind)
            }
            SimError::EngineAlreadyRunning => write!(f, "simulation thread already running"),
            SimError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;

/// Returns an error unless `factor` is a usable gravity multiplier.
pub fn validate_gravity_factor(factor: f64) -> SimResult<()> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidGravityFactor(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_gravity_factor() {
        assert!(validate_gravity_factor(0.5).is_ok());
        assert_eq!(
            validate_gravity_factor(0.0),
            Err(SimError::InvalidGravityFactor(0.0))
        );
        assert!(validate_gravity_factor(f64::NAN).is_err());
        assert!(validate_gravity_factor(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display_messages() {
        let err = SimError::InvalidBody {
            mass: -1.0,
            diameter: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid body: mass -1 and diameter 5 must both be positive"
        );
        assert_eq!(
            SimError::Config("bad key".into()).to_string(),
            "configuration error: bad key"
        );
    }
}
