// Gravity Sandbox - N-body celestial playground with procedural exploration
// Library entry point and headless runner

pub mod body;
pub mod config;
pub mod error;
pub mod explored_map;
pub mod generator;
pub mod orbit;
pub mod physics_engine;
pub mod rocket;
pub mod state_manager;
pub mod vector;

use std::thread;
use std::time::Duration;

pub use body::{Body, BodyId, BodyKind};
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use physics_engine::{SimulationMode, SimulationState, G_DEFAULT};
pub use rocket::{Rocket, RocketControls};
pub use state_manager::{FrontendState, SimulationEngine, TickStats};
pub use vector::{Vector2, WorldRect};

/// Run the simulation without a UI for `config.run_seconds`, reporting progress once
/// per second. Returns the final frontend snapshot.
pub fn run(config: SimConfig) -> SimResult<FrontendState> {
    config.validate()?;
    let run_seconds = config.run_seconds.max(0.0);

    let mut engine = SimulationEngine::new(config);
    engine.reset();
    engine.start()?;

    let whole_seconds = run_seconds.floor() as u64;
    for second in 1..=whole_seconds {
        thread::sleep(Duration::from_secs(1));
        let frontend = engine.frontend_state();
        let stats = engine.stats();
        log::info!(
            "t={}s ticks={} rate={:.1}Hz bodies={}",
            second,
            frontend.tick_count,
            stats.effective_rate_hz,
            frontend.body_count
        );
    }
    thread::sleep(Duration::from_secs_f64(run_seconds - whole_seconds as f64));

    engine.shutdown();
    Ok(engine.frontend_state())
}
