use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a period (or a whole run) could not be served.
///
/// This is returned as data inside [`Solution`], never raised.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    #[error(
        "period {period}: demand {required_mw:.2} MW exceeds total fleet capacity {available_mw:.2} MW"
    )]
    InsufficientCapacity {
        period: usize,
        required_mw: f64,
        available_mw: f64,
    },

    #[error(
        "period {period}: required {required_mw:.2} MW, achievable [{achievable_min_mw:.2}, {achievable_max_mw:.2}] MW under ramp and up/down-time limits"
    )]
    InfeasiblePeriod {
        period: usize,
        required_mw: f64,
        achievable_min_mw: f64,
        achievable_max_mw: f64,
    },
}

impl FailureReason {
    pub fn period(&self) -> usize {
        match self {
            FailureReason::InsufficientCapacity { period, .. } => *period,
            FailureReason::InfeasiblePeriod { period, .. } => *period,
        }
    }
}

/// Cost and balance breakdown for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: usize,
    pub demand_mw: f64,
    pub generation_mw: f64,
    pub production_cost: f64,
    pub startup_cost: f64,
    pub shutdown_cost: f64,
    pub units_committed: usize,
    pub feasible: bool,
}

impl PeriodReport {
    pub fn total_cost(&self) -> f64 {
        self.production_cost + self.startup_cost + self.shutdown_cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub num_units: usize,
    pub num_periods: usize,
    /// Units committed in at least one period.
    pub units_ever_committed: usize,
    pub total_startups: usize,
    pub total_shutdowns: usize,
    pub average_units_online: f64,
    pub peak_demand_mw: f64,
    pub total_demand_mw: f64,
}

/// Full commitment and dispatch schedule produced by one optimize call.
///
/// Matrices are indexed `[unit][period]` in unit declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub success: bool,
    /// Name of the strategy that produced the schedule.
    pub strategy: String,
    pub unit_ids: Vec<String>,
    pub commitment: Vec<Vec<bool>>,
    pub power_mw: Vec<Vec<f64>>,
    pub total_cost: f64,
    pub periods: Vec<PeriodReport>,
    pub summary: SolutionSummary,
    pub failures: Vec<FailureReason>,
}

impl Solution {
    pub fn num_units(&self) -> usize {
        self.commitment.len()
    }

    pub fn num_periods(&self) -> usize {
        self.periods.len()
    }

    /// Commitment of `unit` in `period`, or `None` when either index is out of range.
    pub fn is_committed(&self, unit: usize, period: usize) -> Option<bool> {
        self.commitment.get(unit)?.get(period).copied()
    }

    /// Output of `unit` in `period`, or `None` when either index is out of range.
    pub fn power(&self, unit: usize, period: usize) -> Option<f64> {
        self.power_mw.get(unit)?.get(period).copied()
    }

    /// Fleet output in `period`; zero past the horizon.
    pub fn total_generation(&self, period: usize) -> f64 {
        self.power_mw.iter().filter_map(|row| row.get(period)).sum()
    }

    /// Index of the unit with `id`, if it is part of this solution.
    pub fn unit_index(&self, id: &str) -> Option<usize> {
        self.unit_ids.iter().position(|u| u == id)
    }

    /// First failure, which is what a UI should surface.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.failures.first()
    }

    pub fn infeasible_periods(&self) -> impl Iterator<Item = usize> + '_ {
        self.periods.iter().filter(|p| !p.feasible).map(|p| p.period)
    }
}
