// Headless runner: loads configuration from the environment and prints the final state

use anyhow::Context;
use env_logger::Env;

use gravity_sandbox_lib::SimConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = SimConfig::from_env().context("failed to load configuration")?;
    log::info!(
        "running {:?} simulation for {}s at {} Hz",
        config.mode,
        config.run_seconds,
        config.tick_rate_hz
    );

    let final_state = gravity_sandbox_lib::run(config).context("simulation failed")?;
    println!("{}", final_state.to_json()?);
    Ok(())
}
