// Config - Runtime simulation settings
// Compile-time defaults, overridable from a TOML file or GRAVSIM_* environment
// variables (a .env file is read first if present); missing keys keep their defaults

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{SimError, SimResult};
use crate::explored_map::{DEFAULT_CELL_SIZE, DEFAULT_GROWTH_STEP};
use crate::generator::{
    DEFAULT_LOCAL_ORBIT_RADIUS, DEFAULT_SPAWN_AREA_PER_ATTEMPT, DEFAULT_SYSTEM_ORBIT_RADIUS,
};
use crate::orbit::DEFAULT_MAX_ATTEMPTS;
use crate::physics_engine::{SimulationMode, G_DEFAULT};
use crate::rocket::{DEFAULT_EXPLOSION_FRAMES, DEFAULT_ROTATION_STEP, DEFAULT_THRUST};

/// Target tick cadence
pub const DEFAULT_TICK_RATE_HZ: f64 = 60.0;

/// Ticks between autonomous spawn passes in exploration mode
pub const DEFAULT_SPAWN_INTERVAL_TICKS: u64 = 60;

/// Path checked by `from_env` when `GRAVSIM_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "gravsim.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    // ── Loop ──────────────────────────────────────────────────────────────────
    pub tick_rate_hz: f64,
    pub mode: SimulationMode,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,

    // ── Gravity ───────────────────────────────────────────────────────────────
    pub gravity_constant: f64,
    pub gravity_factor: f64,
    /// Skip pull from bodies lighter than this fraction of the affected body
    pub min_mass_ratio: Option<f64>,
    /// Skip pull between bodies farther apart than this
    pub max_interaction_distance: Option<f64>,

    // ── Procedural generation ─────────────────────────────────────────────────
    pub system_orbit_radius: f64,
    pub local_orbit_radius: f64,
    pub orbit_max_attempts: u32,
    pub spawn_interval_ticks: u64,
    pub spawn_area_per_attempt: f64,
    pub map_cell_size: f64,
    pub map_growth_step: f64,

    // ── Rocket ────────────────────────────────────────────────────────────────
    pub thrust: f64,
    pub rotation_step_degrees: i32,
    pub explosion_frames: u32,

    // ── Headless runner ───────────────────────────────────────────────────────
    pub run_seconds: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            mode: SimulationMode::Sandbox,
            seed: None,

            gravity_constant: G_DEFAULT,
            gravity_factor: 1.0,
            min_mass_ratio: None,
            max_interaction_distance: None,

            system_orbit_radius: DEFAULT_SYSTEM_ORBIT_RADIUS,
            local_orbit_radius: DEFAULT_LOCAL_ORBIT_RADIUS,
            orbit_max_attempts: DEFAULT_MAX_ATTEMPTS,
            spawn_interval_ticks: DEFAULT_SPAWN_INTERVAL_TICKS,
            spawn_area_per_attempt: DEFAULT_SPAWN_AREA_PER_ATTEMPT,
            map_cell_size: DEFAULT_CELL_SIZE,
            map_growth_step: DEFAULT_GROWTH_STEP,

            thrust: DEFAULT_THRUST,
            rotation_step_degrees: DEFAULT_ROTATION_STEP,
            explosion_frames: DEFAULT_EXPLOSION_FRAMES,

            run_seconds: 10.0,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: SimConfig =
            toml::from_str(text).map_err(|e| SimError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the TOML file named by `GRAVSIM_CONFIG` (or `gravsim.toml` if
    /// present), then individual `GRAVSIM_*` overrides.
    pub fn from_env() -> SimResult<Self> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var("GRAVSIM_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `lookup(GRAVSIM_<FIELD>)`. Split out from `from_env` so
    /// tests can feed variables without touching the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> SimResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_field(&lookup, "GRAVSIM_TICK_RATE_HZ", &mut self.tick_rate_hz)?;
        override_field(&lookup, "GRAVSIM_GRAVITY_CONSTANT", &mut self.gravity_constant)?;
        override_field(&lookup, "GRAVSIM_GRAVITY_FACTOR", &mut self.gravity_factor)?;
        override_field(&lookup, "GRAVSIM_SPAWN_INTERVAL_TICKS", &mut self.spawn_interval_ticks)?;
        override_field(&lookup, "GRAVSIM_SYSTEM_ORBIT_RADIUS", &mut self.system_orbit_radius)?;
        override_field(&lookup, "GRAVSIM_LOCAL_ORBIT_RADIUS", &mut self.local_orbit_radius)?;
        override_field(&lookup, "GRAVSIM_THRUST", &mut self.thrust)?;
        override_field(&lookup, "GRAVSIM_RUN_SECONDS", &mut self.run_seconds)?;

        if let Some(seed) = lookup("GRAVSIM_SEED") {
            self.seed = Some(parse_value("GRAVSIM_SEED", &seed)?);
        }
        if let Some(mode) = lookup("GRAVSIM_MODE") {
            self.mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> SimResult<()> {
        let positive = [
            ("tick_rate_hz", self.tick_rate_hz),
            ("gravity_constant", self.gravity_constant),
            ("gravity_factor", self.gravity_factor),
            ("system_orbit_radius", self.system_orbit_radius),
            ("local_orbit_radius", self.local_orbit_radius),
            ("spawn_area_per_attempt", self.spawn_area_per_attempt),
            ("map_cell_size", self.map_cell_size),
            ("map_growth_step", self.map_growth_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::Config(format!("{} must be > 0, got {}", name, value)));
            }
        }
        if self.spawn_interval_ticks == 0 {
            return Err(SimError::Config("spawn_interval_ticks must be >= 1".into()));
        }
        if self.orbit_max_attempts == 0 {
            return Err(SimError::Config("orbit_max_attempts must be >= 1".into()));
        }
        Ok(())
    }

    /// Effective gravitational constant
    pub fn gravity(&self) -> f64 {
        self.gravity_constant * self.gravity_factor
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> SimResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SimError::Config(format!("{} has unparseable value '{}'", key, raw)))
}

fn override_field<T, F>(lookup: &F, key: &str, field: &mut T) -> SimResult<()>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *field = parse_value(key, &raw)?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gravity(), G_DEFAULT);
        assert_eq!(config.mode, SimulationMode::Sandbox);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            tick_rate_hz = 30.0
            mode = "exploration"
            seed = 42
            max_interaction_distance = 5000.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_rate_hz, 30.0);
        assert_eq!(config.mode, SimulationMode::Exploration);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_interaction_distance, Some(5000.0));
        assert_eq!(config.system_orbit_radius, DEFAULT_SYSTEM_ORBIT_RADIUS);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            SimConfig::from_toml_str("tick_rate_hz = \"fast\""),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("gravity_factor = -2.0"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GRAVSIM_GRAVITY_FACTOR", "0.9"),
            ("GRAVSIM_MODE", "background"),
            ("GRAVSIM_SEED", " 7 "),
        ]
        .into_iter()
        .collect();

        let mut config = SimConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.gravity_factor, 0.9);
        assert_eq!(config.mode, SimulationMode::Background);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_env_override_parse_error() {
        let mut config = SimConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "GRAVSIM_TICK_RATE_HZ").then(|| "sixty".to_string())
        });
        assert!(matches!(result, Err(SimError::Config(_))));
    }
}
