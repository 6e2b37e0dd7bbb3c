use std::time::Instant;

use tracing::{error, info, warn};

use super::beam::BeamSearchScheduler;
use super::constraints::{resolve_all, startup_band};
use super::cost::{production_cost, transition_cost};
use super::dispatch::{fallback_dispatch, DispatchOutcome, DispatchUnit, SinglePeriodDispatcher};
use super::sequential::SequentialScheduler;
use super::state::{initial_states, Commitment};
use crate::config::{OptimizerConfig, SchedulingMode};
use crate::domain::{
    validate_fleet, DemandProfile, FailureReason, GeneratingUnit, PeriodReport, Solution,
    SolutionSummary,
};
use crate::error::Result;
use crate::validator::SolutionValidator;

/// Decisions for one period, one entry per unit in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPlan {
    pub commitments: Vec<Commitment>,
    /// Set when the period could not be served and `commitments` is a best-effort fallback.
    pub failure: Option<FailureReason>,
}

impl PeriodPlan {
    pub fn feasible(&self) -> bool {
        self.failure.is_none()
    }
}

/// Raw output of a multi-period strategy, before cost accounting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommitmentPlan {
    pub periods: Vec<PeriodPlan>,
}

/// A multi-period scheduling strategy.
///
/// Implementations receive inputs that already passed validation and must return
/// exactly one [`PeriodPlan`] per demand period.
pub trait CommitmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn schedule(&self, units: &[GeneratingUnit], demand: &DemandProfile) -> Result<CommitmentPlan>;
}

/// Entry point for callers: validates inputs, runs the configured strategy and
/// turns its plan into a costed [`Solution`].
pub struct UnitCommitmentOptimizer {
    config: OptimizerConfig,
    strategy: Box<dyn CommitmentStrategy>,
}

impl UnitCommitmentOptimizer {
    pub fn from_config(config: &OptimizerConfig) -> Result<Self> {
        let strategy: Box<dyn CommitmentStrategy> = match config.mode {
            SchedulingMode::Sequential => Box::new(SequentialScheduler::new(config.clone())),
            SchedulingMode::BeamSearch => Box::new(BeamSearchScheduler::new(config.clone())),
        };
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(
        config: &OptimizerConfig,
        strategy: Box<dyn CommitmentStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            strategy,
        })
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Schedule `units` across every period of `demand`.
    pub fn optimize(&self, units: &[GeneratingUnit], demand: &DemandProfile) -> Result<Solution> {
        let started = Instant::now();
        self.check_inputs(units)?;

        let solution = match self.capacity_shortfall(units, demand) {
            Some(failures) => failed_solution(self.strategy.name(), units, demand, failures),
            None => {
                let plan = self.strategy.schedule(units, demand)?;
                build_solution(self.strategy.name(), units, demand, &plan)?
            }
        };

        self.finish(units, demand, solution, started)
    }

    /// Single-period economic dispatch from the units' initial status.
    pub fn dispatch_single(&self, units: &[GeneratingUnit], demand_mw: f64) -> Result<Solution> {
        let started = Instant::now();
        self.check_inputs(units)?;
        let demand = DemandProfile::single(demand_mw)?;

        let solution = match self.capacity_shortfall(units, &demand) {
            Some(failures) => failed_solution(SINGLE_PERIOD, units, &demand, failures),
            None => {
                let states = initial_states(units);
                let statuses = resolve_all(units, &states);
                let inputs: Vec<DispatchUnit<'_>> = units
                    .iter()
                    .zip(statuses)
                    .zip(&states)
                    .map(|((unit, status), state)| DispatchUnit {
                        unit,
                        status,
                        was_on: state.is_on,
                    })
                    .collect();

                let dispatcher = SinglePeriodDispatcher::new(&self.config);
                let period = match dispatcher.dispatch(0, &inputs, demand_mw) {
                    DispatchOutcome::Dispatched(dispatch) => PeriodPlan {
                        commitments: dispatch.commitments,
                        failure: None,
                    },
                    DispatchOutcome::Infeasible(reason) => {
                        warn!(%reason, "single-period dispatch infeasible");
                        PeriodPlan {
                            commitments: fallback_dispatch(&inputs, demand_mw).commitments,
                            failure: Some(reason),
                        }
                    }
                };
                let plan = CommitmentPlan { periods: vec![period] };
                build_solution(SINGLE_PERIOD, units, &demand, &plan)?
            }
        };

        self.finish(units, &demand, solution, started)
    }

    fn check_inputs(&self, units: &[GeneratingUnit]) -> Result<()> {
        validate_fleet(units)?;
        for unit in units {
            if startup_band(unit).is_empty() {
                warn!(
                    unit = %unit.id,
                    ramp_up_mw = unit.ramp_up_mw,
                    min_power_mw = unit.min_power_mw,
                    "ramp-up limit below minimum output; unit cannot start from off"
                );
            }
        }
        Ok(())
    }

    /// Periods whose demand exceeds the whole fleet's capacity, ignoring temporal limits.
    fn capacity_shortfall(
        &self,
        units: &[GeneratingUnit],
        demand: &DemandProfile,
    ) -> Option<Vec<FailureReason>> {
        let available_mw: f64 = units.iter().map(|u| u.max_power_mw).sum();
        let failures: Vec<FailureReason> = demand
            .values()
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > available_mw + self.config.tolerance_for(d))
            .map(|(period, &required_mw)| FailureReason::InsufficientCapacity {
                period,
                required_mw,
                available_mw,
            })
            .collect();
        (!failures.is_empty()).then_some(failures)
    }

    fn finish(
        &self,
        units: &[GeneratingUnit],
        demand: &DemandProfile,
        solution: Solution,
        started: Instant,
    ) -> Result<Solution> {
        if self.config.validate_output {
            let validator = SolutionValidator::from_config(&self.config);
            if let Err(violation) = validator.validate(units, demand, &solution) {
                error!(
                    %violation,
                    strategy = %solution.strategy,
                    "produced schedule violates constraints"
                );
                return Err(violation.into());
            }
        }

        info!(
            strategy = %solution.strategy,
            units = units.len(),
            periods = demand.len(),
            success = solution.success,
            total_cost = solution.total_cost,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "unit commitment solved"
        );
        if let Some(reason) = solution.failure_reason() {
            warn!(%reason, "schedule incomplete");
        }
        Ok(solution)
    }
}

const SINGLE_PERIOD: &str = "single_period";

/// Cost a plan and derive the per-period reports and summary.
pub(crate) fn build_solution(
    strategy: &str,
    units: &[GeneratingUnit],
    demand: &DemandProfile,
    plan: &CommitmentPlan,
) -> Result<Solution> {
    let n = units.len();
    let horizon = demand.len();
    let mut commitment = vec![Vec::with_capacity(horizon); n];
    let mut power_mw = vec![Vec::with_capacity(horizon); n];
    let mut periods = Vec::with_capacity(horizon);
    let mut failures = Vec::new();
    let mut startups = 0;
    let mut shutdowns = 0;

    let mut was_on: Vec<bool> = units.iter().map(|u| u.initial_on).collect();
    for (t, (period, &demand_mw)) in plan.periods.iter().zip(demand.values()).enumerate() {
        let mut report = PeriodReport {
            period: t,
            demand_mw,
            generation_mw: 0.0,
            production_cost: 0.0,
            startup_cost: 0.0,
            shutdown_cost: 0.0,
            units_committed: 0,
            feasible: period.feasible(),
        };

        for (i, (unit, decision)) in units.iter().zip(&period.commitments).enumerate() {
            let is_on = decision.is_on();
            let power = decision.power_mw();
            let transition = transition_cost(unit, was_on[i], is_on);
            match (was_on[i], is_on) {
                (false, true) => {
                    startups += 1;
                    report.startup_cost += transition;
                }
                (true, false) => {
                    shutdowns += 1;
                    report.shutdown_cost += transition;
                }
                _ => {}
            }
            if is_on {
                report.units_committed += 1;
                report.production_cost += production_cost(unit, power)?;
            }
            report.generation_mw += power;
            commitment[i].push(is_on);
            power_mw[i].push(power);
            was_on[i] = is_on;
        }

        if let Some(reason) = &period.failure {
            failures.push(reason.clone());
        }
        periods.push(report);
    }

    let total_cost = periods.iter().map(PeriodReport::total_cost).sum();
    let summary = summarize(units, demand, &commitment, &periods, startups, shutdowns);
    Ok(Solution {
        success: failures.is_empty(),
        strategy: strategy.to_string(),
        unit_ids: units.iter().map(|u| u.id.clone()).collect(),
        commitment,
        power_mw,
        total_cost,
        periods,
        summary,
        failures,
    })
}

/// All-off schedule reported when the fleet cannot cover demand at all.
fn failed_solution(
    strategy: &str,
    units: &[GeneratingUnit],
    demand: &DemandProfile,
    failures: Vec<FailureReason>,
) -> Solution {
    let n = units.len();
    let horizon = demand.len();
    let periods: Vec<PeriodReport> = demand
        .values()
        .iter()
        .enumerate()
        .map(|(period, &demand_mw)| PeriodReport {
            period,
            demand_mw,
            generation_mw: 0.0,
            production_cost: 0.0,
            startup_cost: 0.0,
            shutdown_cost: 0.0,
            units_committed: 0,
            feasible: false,
        })
        .collect();
    let commitment = vec![vec![false; horizon]; n];
    let summary = summarize(units, demand, &commitment, &periods, 0, 0);

    Solution {
        success: false,
        strategy: strategy.to_string(),
        unit_ids: units.iter().map(|u| u.id.clone()).collect(),
        commitment,
        power_mw: vec![vec![0.0; horizon]; n],
        total_cost: 0.0,
        periods,
        summary,
        failures,
    }
}

fn summarize(
    units: &[GeneratingUnit],
    demand: &DemandProfile,
    commitment: &[Vec<bool>],
    periods: &[PeriodReport],
    total_startups: usize,
    total_shutdowns: usize,
) -> SolutionSummary {
    let online: usize = periods.iter().map(|p| p.units_committed).sum();
    SolutionSummary {
        num_units: units.len(),
        num_periods: demand.len(),
        units_ever_committed: commitment.iter().filter(|row| row.iter().any(|&on| on)).count(),
        total_startups,
        total_shutdowns,
        average_units_online: online as f64 / demand.len() as f64,
        peak_demand_mw: demand.peak(),
        total_demand_mw: demand.total(),
    }
}
