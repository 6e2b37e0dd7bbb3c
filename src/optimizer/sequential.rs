use tracing::{debug, warn};

use super::constraints::resolve_all;
use super::dispatch::{fallback_dispatch, DispatchOutcome, DispatchUnit, SinglePeriodDispatcher};
use super::state::{advance_all, initial_states};
use super::types::{CommitmentPlan, CommitmentStrategy, PeriodPlan};
use crate::config::OptimizerConfig;
use crate::domain::{DemandProfile, GeneratingUnit};
use crate::error::Result;

/// Myopic baseline: one state vector carried forward, each period dispatched in
/// isolation.
///
/// Fast, but it cannot trade an early startup cost against cheaper operation in
/// later periods, so it is not cost-optimal across the horizon.
pub struct SequentialScheduler {
    config: OptimizerConfig,
}

impl SequentialScheduler {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }
}

impl CommitmentStrategy for SequentialScheduler {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn schedule(&self, units: &[GeneratingUnit], demand: &DemandProfile) -> Result<CommitmentPlan> {
        let dispatcher = SinglePeriodDispatcher::new(&self.config);
        let mut states = initial_states(units);
        let mut plan = CommitmentPlan::default();

        for (period, &demand_mw) in demand.values().iter().enumerate() {
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

            let period_plan = match dispatcher.dispatch(period, &inputs, demand_mw) {
                DispatchOutcome::Dispatched(dispatch) => {
                    debug!(period, demand_mw, cost = dispatch.cost, "period dispatched");
                    PeriodPlan {
                        commitments: dispatch.commitments,
                        failure: None,
                    }
                }
                DispatchOutcome::Infeasible(reason) => {
                    warn!(period, %reason, "period infeasible, committing all available units");
                    PeriodPlan {
                        commitments: fallback_dispatch(&inputs, demand_mw).commitments,
                        failure: Some(reason),
                    }
                }
            };

            states = advance_all(&states, &period_plan.commitments);
            plan.periods.push(period_plan);
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CostCurve, FailureReason};
    use crate::optimizer::state::Commitment;

    #[test]
    fn test_min_uptime_keeps_unit_on() {
        let units = vec![
            GeneratingUnit::new("cheap", 0.0, 60.0, CostCurve::new(0.0, 1.0, 0.0))
                .initially_on(50.0),
            GeneratingUnit::new("peaker", 10.0, 100.0, CostCurve::new(0.0, 20.0, 0.0))
                .with_min_times(2, 1),
        ];
        let demand = DemandProfile::new(vec![100.0, 30.0, 30.0]).unwrap();
        let plan = SequentialScheduler::new(OptimizerConfig::default())
            .schedule(&units, &demand)
            .unwrap();

        let peaker: Vec<bool> = plan.periods.iter().map(|p| p.commitments[1].is_on()).collect();
        assert_eq!(peaker, vec![true, true, false]);
        assert!(plan.periods.iter().all(PeriodPlan::feasible));
    }

    #[test]
    fn test_ramp_limit_reported_per_period() {
        let units = vec![GeneratingUnit::new("slow", 0.0, 100.0, CostCurve::new(0.0, 1.0, 0.0))
            .with_ramp_rates(20.0, 20.0)
            .initially_on(10.0)];
        let demand = DemandProfile::new(vec![20.0, 90.0, 40.0]).unwrap();
        let plan = SequentialScheduler::new(OptimizerConfig::default())
            .schedule(&units, &demand)
            .unwrap();

        assert!(plan.periods[0].feasible());
        match &plan.periods[1].failure {
            Some(FailureReason::InfeasiblePeriod {
                period,
                achievable_max_mw,
                ..
            }) => {
                assert_eq!(*period, 1);
                assert_eq!(*achievable_max_mw, 40.0);
            }
            other => panic!("expected infeasible period, got {other:?}"),
        }
        // fallback pushes as close to demand as the ramp allows
        assert_eq!(plan.periods[1].commitments[0], Commitment::On { power_mw: 40.0 });
        assert!(plan.periods[2].feasible());
    }
}
