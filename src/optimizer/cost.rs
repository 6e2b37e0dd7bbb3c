//! Production and transition cost accounting.

use ordered_float::OrderedFloat;

use crate::domain::GeneratingUnit;
use crate::error::{Result, UnitCommitmentError};

/// Slack allowed when checking that a dispatched power lies inside the unit range.
pub(crate) const POWER_EPSILON: f64 = 1e-9;

/// Fuel cost of running `unit` at `power_mw` for one period.
///
/// Zero output means the unit is off and costs nothing. Positive output must lie
/// inside `[min_power_mw, max_power_mw]`.
pub fn production_cost(unit: &GeneratingUnit, power_mw: f64) -> Result<f64> {
    let invalid = || UnitCommitmentError::InvalidPower {
        unit: unit.id.clone(),
        power_mw,
    };

    if !power_mw.is_finite() || power_mw < 0.0 {
        return Err(invalid());
    }
    if power_mw == 0.0 {
        return Ok(0.0);
    }
    if power_mw < unit.min_power_mw - POWER_EPSILON
        || power_mw > unit.max_power_mw + POWER_EPSILON
    {
        return Err(invalid());
    }
    Ok(running_cost(unit, power_mw))
}

/// Unchecked variant used inside the search, where powers come from feasible bands.
pub(crate) fn running_cost(unit: &GeneratingUnit, power_mw: f64) -> f64 {
    if power_mw > 0.0 {
        unit.cost.evaluate(power_mw)
    } else {
        0.0
    }
}

/// Startup cost on off→on, shutdown cost on on→off, nothing otherwise.
pub fn transition_cost(unit: &GeneratingUnit, was_on: bool, is_on: bool) -> f64 {
    match (was_on, is_on) {
        (false, true) => unit.startup_cost,
        (true, false) => unit.shutdown_cost,
        _ => 0.0,
    }
}

/// Full-load average cost: lower ranks as more economical.
pub fn merit_order_key(unit: &GeneratingUnit) -> f64 {
    let c = &unit.cost;
    let amortized_fixed = if unit.max_power_mw > 0.0 {
        c.fixed / unit.max_power_mw
    } else {
        c.fixed
    };
    amortized_fixed + c.linear + c.quadratic * unit.max_power_mw
}

/// Unit indices from most to least economical; ties keep declaration order.
pub fn merit_order(units: &[GeneratingUnit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by_key(|&i| (OrderedFloat(merit_order_key(&units[i])), i));
    order
}
