//! Post-hoc certification of a produced [`Solution`].
//!
//! A violation found here means the scheduler is wrong, not the input.

use itertools::Itertools;

use crate::config::OptimizerConfig;
use crate::domain::{DemandProfile, GeneratingUnit, Solution};
use crate::error::{ConstraintViolation, ViolationKind};

/// Slack for bound and ramp comparisons, absorbing float round-off in allocation.
const LIMIT_EPSILON_MW: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct SolutionValidator {
    absolute_tolerance_mw: f64,
    relative_tolerance: f64,
}

impl Default for SolutionValidator {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default())
    }
}

impl SolutionValidator {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            absolute_tolerance_mw: config.absolute_tolerance_mw,
            relative_tolerance: config.relative_tolerance,
        }
    }

    /// Check balance, capacity, ramp and minimum up/down times.
    ///
    /// Power balance is only enforced for periods the solution marks feasible;
    /// best-effort fallback periods are expected to miss demand.
    pub fn validate(
        &self,
        units: &[GeneratingUnit],
        demand: &DemandProfile,
        solution: &Solution,
    ) -> Result<(), ConstraintViolation> {
        self.check_shape(units, demand, solution)?;
        self.check_balance(demand, solution)?;
        for (i, unit) in units.iter().enumerate() {
            check_capacity(unit, &solution.commitment[i], &solution.power_mw[i])?;
            check_ramps(unit, &solution.commitment[i], &solution.power_mw[i])?;
            check_min_times(unit, &solution.commitment[i])?;
        }
        Ok(())
    }

    fn check_shape(
        &self,
        units: &[GeneratingUnit],
        demand: &DemandProfile,
        solution: &Solution,
    ) -> Result<(), ConstraintViolation> {
        let horizon = demand.len();
        let mismatch = |detail: String| ConstraintViolation {
            unit: None,
            period: 0,
            kind: ViolationKind::ShapeMismatch,
            detail,
        };

        if solution.commitment.len() != units.len() || solution.power_mw.len() != units.len() {
            return Err(mismatch(format!(
                "expected {} unit rows, got {} commitment and {} power rows",
                units.len(),
                solution.commitment.len(),
                solution.power_mw.len()
            )));
        }
        if solution.periods.len() != horizon {
            return Err(mismatch(format!(
                "expected {horizon} period reports, got {}",
                solution.periods.len()
            )));
        }
        let short_row = solution
            .commitment
            .iter()
            .zip(&solution.power_mw)
            .position(|(c, p)| c.len() != horizon || p.len() != horizon);
        if let Some(i) = short_row {
            return Err(mismatch(format!("unit {} does not cover {horizon} periods", units[i].id)));
        }
        Ok(())
    }

    fn check_balance(
        &self,
        demand: &DemandProfile,
        solution: &Solution,
    ) -> Result<(), ConstraintViolation> {
        for (t, &required) in demand.values().iter().enumerate() {
            if !solution.periods[t].feasible {
                continue;
            }
            let generated = solution.total_generation(t);
            let tolerance = self.absolute_tolerance_mw.max(self.relative_tolerance * required);
            if (generated - required).abs() > tolerance {
                return Err(ConstraintViolation {
                    unit: None,
                    period: t,
                    kind: ViolationKind::PowerBalance,
                    detail: format!("generated {generated:.4} MW, required {required:.4} MW"),
                });
            }
        }
        Ok(())
    }
}

fn violation(
    unit: &GeneratingUnit,
    period: usize,
    kind: ViolationKind,
    detail: String,
) -> ConstraintViolation {
    ConstraintViolation {
        unit: Some(unit.id.clone()),
        period,
        kind,
        detail,
    }
}

fn check_capacity(
    unit: &GeneratingUnit,
    on: &[bool],
    power: &[f64],
) -> Result<(), ConstraintViolation> {
    for (t, (&is_on, &p)) in on.iter().zip(power).enumerate() {
        if is_on {
            if !p.is_finite()
                || p < unit.min_power_mw - LIMIT_EPSILON_MW
                || p > unit.max_power_mw + LIMIT_EPSILON_MW
            {
                return Err(violation(
                    unit,
                    t,
                    ViolationKind::CapacityLimit,
                    format!("{p:.4} MW outside [{}, {}]", unit.min_power_mw, unit.max_power_mw),
                ));
            }
        } else if p.abs() > LIMIT_EPSILON_MW {
            return Err(violation(
                unit,
                t,
                ViolationKind::OffUnitProducing,
                format!("unit is off but produces {p:.4} MW"),
            ));
        }
    }
    Ok(())
}

/// Ramp limits apply between consecutive periods the unit spends running,
/// including the step from its initial output into period 0.
fn check_ramps(
    unit: &GeneratingUnit,
    on: &[bool],
    power: &[f64],
) -> Result<(), ConstraintViolation> {
    let mut prev = unit.initial_on.then_some(unit.initial_power_mw);
    for (t, (&is_on, &p)) in on.iter().zip(power).enumerate() {
        if let (true, Some(last)) = (is_on, prev) {
            let delta = p - last;
            if delta > unit.ramp_up_mw + LIMIT_EPSILON_MW {
                return Err(violation(
                    unit,
                    t,
                    ViolationKind::RampUp,
                    format!("increase {delta:.4} MW exceeds {} MW", unit.ramp_up_mw),
                ));
            }
            if -delta > unit.ramp_down_mw + LIMIT_EPSILON_MW {
                return Err(violation(
                    unit,
                    t,
                    ViolationKind::RampDown,
                    format!("decrease {:.4} MW exceeds {} MW", -delta, unit.ramp_down_mw),
                ));
            }
        }
        prev = is_on.then_some(p);
    }
    Ok(())
}

/// Every on/off run must last the unit's minimum. A run continuing the initial
/// status, or cut off by the end of the horizon, is exempt.
fn check_min_times(unit: &GeneratingUnit, on: &[bool]) -> Result<(), ConstraintViolation> {
    let horizon = on.len();
    let mut start = 0;
    for (state, run) in &on.iter().chunk_by(|&&s| s) {
        let length = run.count();
        let end = start + length;

        let inherited = start == 0 && state == unit.initial_on;
        let truncated = end == horizon;
        if !inherited && !truncated {
            let (required, kind) = if state {
                (unit.min_uptime, ViolationKind::MinUptime)
            } else {
                (unit.min_downtime, ViolationKind::MinDowntime)
            };
            if (length as u32) < required {
                return Err(violation(
                    unit,
                    start,
                    kind,
                    format!("ran {length} periods, minimum is {required}"),
                ));
            }
        }
        start = end;
    }
    Ok(())
}
