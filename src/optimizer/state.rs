use serde::{Deserialize, Serialize};

use crate::domain::GeneratingUnit;

/// What a unit does in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Commitment {
    Off,
    On { power_mw: f64 },
}

impl Commitment {
    pub fn is_on(&self) -> bool {
        matches!(self, Commitment::On { .. })
    }

    pub fn power_mw(&self) -> f64 {
        match self {
            Commitment::On { power_mw } => *power_mw,
            Commitment::Off => 0.0,
        }
    }
}

/// Temporal history of one unit at the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub is_on: bool,
    pub consecutive_on: u32,
    pub consecutive_off: u32,
    pub last_power_mw: f64,
}

impl UnitState {
    /// State before period 0.
    ///
    /// Without `initial_status_periods` the initial status counts as settled, so
    /// neither the uptime nor the downtime lock applies at period 0.
    pub fn initial(unit: &GeneratingUnit) -> Self {
        if unit.initial_on {
            Self {
                is_on: true,
                consecutive_on: unit.initial_status_periods.unwrap_or(unit.min_uptime),
                consecutive_off: 0,
                last_power_mw: unit.initial_power_mw,
            }
        } else {
            Self {
                is_on: false,
                consecutive_on: 0,
                consecutive_off: unit.initial_status_periods.unwrap_or(unit.min_downtime),
                last_power_mw: 0.0,
            }
        }
    }

    /// Successor state after `decision`. `self` is left untouched so several
    /// branches can be expanded from the same predecessor.
    pub fn advance(&self, decision: Commitment) -> Self {
        match decision {
            Commitment::On { power_mw } => Self {
                is_on: true,
                consecutive_on: if self.is_on {
                    self.consecutive_on.saturating_add(1)
                } else {
                    1
                },
                consecutive_off: 0,
                last_power_mw: power_mw,
            },
            Commitment::Off => Self {
                is_on: false,
                consecutive_on: 0,
                consecutive_off: if self.is_on {
                    1
                } else {
                    self.consecutive_off.saturating_add(1)
                },
                last_power_mw: 0.0,
            },
        }
    }

    /// Counts clamped at the unit's thresholds; longer runs are equivalent.
    pub fn signature(&self, unit: &GeneratingUnit) -> (bool, u32, u32) {
        (
            self.is_on,
            self.consecutive_on.min(unit.min_uptime),
            self.consecutive_off.min(unit.min_downtime),
        )
    }
}

/// Initial state vector for a fleet.
pub fn initial_states(units: &[GeneratingUnit]) -> Vec<UnitState> {
    units.iter().map(UnitState::initial).collect()
}

/// Advance every unit of a fleet by one period.
pub fn advance_all(states: &[UnitState], decisions: &[Commitment]) -> Vec<UnitState> {
    states
        .iter()
        .zip(decisions)
        .map(|(state, decision)| state.advance(*decision))
        .collect()
}
