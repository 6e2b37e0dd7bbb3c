//! Per-unit temporal feasibility for a single period.
//!
//! The engine turns a unit's static limits plus its [`UnitState`] into one of three
//! statuses that the dispatcher and the schedulers consume uniformly:
//!
//! - `LockedOn(band)`: must run, inside `band`
//! - `LockedOff`: must stay off
//! - `Free(band)`: may stay off, or run inside `band`

use serde::{Deserialize, Serialize};

use super::cost::POWER_EPSILON;
use super::state::UnitState;
use crate::domain::GeneratingUnit;

/// Closed interval of feasible output in MW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerBand {
    pub min_mw: f64,
    pub max_mw: f64,
}

impl PowerBand {
    pub fn new(min_mw: f64, max_mw: f64) -> Self {
        Self { min_mw, max_mw }
    }

    pub fn is_empty(&self) -> bool {
        self.min_mw > self.max_mw + POWER_EPSILON
    }

    pub fn contains(&self, power_mw: f64) -> bool {
        power_mw >= self.min_mw - POWER_EPSILON && power_mw <= self.max_mw + POWER_EPSILON
    }

    pub fn clamp(&self, power_mw: f64) -> f64 {
        power_mw.max(self.min_mw).min(self.max_mw)
    }

    pub fn width(&self) -> f64 {
        (self.max_mw - self.min_mw).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UnitStatus {
    LockedOn(PowerBand),
    LockedOff,
    Free(PowerBand),
}

impl UnitStatus {
    /// Band the unit would run in if committed.
    pub fn on_band(&self) -> Option<PowerBand> {
        match self {
            UnitStatus::LockedOn(band) | UnitStatus::Free(band) => Some(*band),
            UnitStatus::LockedOff => None,
        }
    }

    pub fn can_be_on(&self) -> bool {
        !matches!(self, UnitStatus::LockedOff)
    }

    pub fn can_be_off(&self) -> bool {
        !matches!(self, UnitStatus::LockedOn(_))
    }

    /// Lowest output this unit is forced to contribute.
    pub fn forced_min_mw(&self) -> f64 {
        match self {
            UnitStatus::LockedOn(band) => band.min_mw,
            _ => 0.0,
        }
    }

    /// Highest output this unit could contribute.
    pub fn possible_max_mw(&self) -> f64 {
        self.on_band().map(|b| b.max_mw).unwrap_or(0.0)
    }
}

/// Ramp-limited band for a unit that stays on.
pub fn ramp_band(unit: &GeneratingUnit, last_power_mw: f64) -> PowerBand {
    PowerBand::new(
        unit.min_power_mw.max(last_power_mw - unit.ramp_down_mw),
        unit.max_power_mw.min(last_power_mw + unit.ramp_up_mw),
    )
}

/// Band for a unit starting up from off: capped by one ramp-up step.
pub fn startup_band(unit: &GeneratingUnit) -> PowerBand {
    PowerBand::new(unit.min_power_mw, unit.max_power_mw.min(unit.ramp_up_mw))
}

/// A running unit may only shut down if one ramp-down step reaches zero.
pub fn can_shut_down(unit: &GeneratingUnit, state: &UnitState) -> bool {
    state.last_power_mw <= unit.ramp_down_mw + POWER_EPSILON
}

/// Resolve the status of `unit` for the next period given its previous `state`.
pub fn resolve(unit: &GeneratingUnit, state: &UnitState) -> UnitStatus {
    if state.is_on {
        let band = ramp_band(unit, state.last_power_mw);
        let must_stay_on = state.consecutive_on < unit.min_uptime || !can_shut_down(unit, state);
        if must_stay_on {
            // an empty band here means the period is infeasible; the dispatcher reports it
            UnitStatus::LockedOn(band)
        } else if band.is_empty() {
            UnitStatus::LockedOff
        } else {
            UnitStatus::Free(band)
        }
    } else if state.consecutive_off < unit.min_downtime {
        UnitStatus::LockedOff
    } else {
        let band = startup_band(unit);
        if band.is_empty() {
            UnitStatus::LockedOff
        } else {
            UnitStatus::Free(band)
        }
    }
}

/// Resolve every unit of the fleet.
pub fn resolve_all(units: &[GeneratingUnit], states: &[UnitState]) -> Vec<UnitStatus> {
    units
        .iter()
        .zip(states)
        .map(|(unit, state)| resolve(unit, state))
        .collect()
}

/// Achievable output range of a fleet, respecting locks, as `(min, max)`.
pub fn achievable_range(statuses: &[UnitStatus]) -> (f64, f64) {
    statuses.iter().fold((0.0, 0.0), |(lo, hi), s| {
        (lo + s.forced_min_mw(), hi + s.possible_max_mw())
    })
}
