use anyhow::{Context, Result};
use tracing::{info, warn};
use unit_commitment::{
    config::Config, telemetry::init_tracing, DemandProfile, UnitCommitmentOptimizer,
};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let scenario = cfg
        .scenario
        .context("no [scenario] configured; add units and demand_mw to config/default.toml")?;

    let demand = DemandProfile::new(scenario.demand_mw).context("invalid scenario demand")?;
    let optimizer = UnitCommitmentOptimizer::from_config(&cfg.optimizer)?;
    info!(
        strategy = optimizer.strategy_name(),
        units = scenario.units.len(),
        periods = demand.len(),
        "optimizing configured scenario"
    );

    let solution = optimizer
        .optimize(&scenario.units, &demand)
        .context("optimization failed")?;
    if !solution.success {
        warn!(failures = solution.failures.len(), "scenario could not be fully served");
    }

    println!("{}", serde_json::to_string_pretty(&solution)?);
    Ok(())
}
