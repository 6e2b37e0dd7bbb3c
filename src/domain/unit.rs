use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Result, UnitCommitmentError};

/// Quadratic fuel-cost curve: `fixed + linear·P + quadratic·P²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct CostCurve {
    #[validate(range(min = 0.0))]
    pub fixed: f64,
    #[validate(range(min = 0.0))]
    pub linear: f64,
    #[validate(range(min = 0.0))]
    pub quadratic: f64,
}

impl CostCurve {
    pub fn new(fixed: f64, linear: f64, quadratic: f64) -> Self {
        Self {
            fixed,
            linear,
            quadratic,
        }
    }

    /// Raw curve value. Callers decide whether the unit is running.
    pub fn evaluate(&self, power_mw: f64) -> f64 {
        self.fixed + self.linear * power_mw + self.quadratic * power_mw * power_mw
    }

    /// dC/dP at `power_mw`.
    pub fn marginal_cost(&self, power_mw: f64) -> f64 {
        self.linear + 2.0 * self.quadratic * power_mw
    }
}

/// A thermal generating unit as supplied by the caller.
///
/// Immutable for the duration of an optimize call. Ramp rates are MW per period,
/// minimum up/down times are in periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeneratingUnit {
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[validate(range(min = 0.0))]
    pub min_power_mw: f64,

    #[validate(range(min = 0.0))]
    pub max_power_mw: f64,

    pub cost: CostCurve,

    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub startup_cost: f64,

    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub shutdown_cost: f64,

    #[validate(range(min = 0.0))]
    pub ramp_up_mw: f64,

    #[validate(range(min = 0.0))]
    pub ramp_down_mw: f64,

    #[validate(range(min = 1))]
    #[serde(default = "one_period")]
    pub min_uptime: u32,

    #[validate(range(min = 1))]
    #[serde(default = "one_period")]
    pub min_downtime: u32,

    #[serde(default)]
    pub initial_on: bool,

    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub initial_power_mw: f64,

    /// Periods already spent in the initial status before period 0.
    /// `None` means the status is settled and imposes no lock.
    #[serde(default)]
    pub initial_status_periods: Option<u32>,
}

fn one_period() -> u32 {
    1
}

impl GeneratingUnit {
    /// Unit that starts off, with no startup/shutdown costs and unconstrained ramping.
    pub fn new(
        id: impl Into<String>,
        min_power_mw: f64,
        max_power_mw: f64,
        cost: CostCurve,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            min_power_mw,
            max_power_mw,
            cost,
            startup_cost: 0.0,
            shutdown_cost: 0.0,
            ramp_up_mw: max_power_mw,
            ramp_down_mw: max_power_mw,
            min_uptime: 1,
            min_downtime: 1,
            initial_on: false,
            initial_power_mw: 0.0,
            initial_status_periods: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_transition_costs(mut self, startup_cost: f64, shutdown_cost: f64) -> Self {
        self.startup_cost = startup_cost;
        self.shutdown_cost = shutdown_cost;
        self
    }

    pub fn with_ramp_rates(mut self, ramp_up_mw: f64, ramp_down_mw: f64) -> Self {
        self.ramp_up_mw = ramp_up_mw;
        self.ramp_down_mw = ramp_down_mw;
        self
    }

    pub fn with_min_times(mut self, min_uptime: u32, min_downtime: u32) -> Self {
        self.min_uptime = min_uptime;
        self.min_downtime = min_downtime;
        self
    }

    /// Start the horizon running at `power_mw`.
    pub fn initially_on(mut self, power_mw: f64) -> Self {
        self.initial_on = true;
        self.initial_power_mw = power_mw;
        self
    }

    pub fn with_initial_status_periods(mut self, periods: u32) -> Self {
        self.initial_status_periods = Some(periods);
        self
    }

    /// Whether `power_mw` lies inside the static operating range.
    pub fn can_produce(&self, power_mw: f64) -> bool {
        (self.min_power_mw..=self.max_power_mw).contains(&power_mw)
    }

    /// Check the physical consistency of the unit.
    pub fn validate_parameters(&self) -> Result<()> {
        let invalid = |reason: String| UnitCommitmentError::InvalidUnit {
            unit: self.id.clone(),
            reason,
        };

        let numeric = [
            ("min_power_mw", self.min_power_mw),
            ("max_power_mw", self.max_power_mw),
            ("cost.fixed", self.cost.fixed),
            ("cost.linear", self.cost.linear),
            ("cost.quadratic", self.cost.quadratic),
            ("startup_cost", self.startup_cost),
            ("shutdown_cost", self.shutdown_cost),
            ("ramp_up_mw", self.ramp_up_mw),
            ("ramp_down_mw", self.ramp_down_mw),
            ("initial_power_mw", self.initial_power_mw),
        ];
        // range validators let NaN through
        if let Some((field, value)) = numeric.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{field} is not finite: {value}")));
        }

        self.validate().map_err(|e| invalid(e.to_string()))?;
        self.cost.validate().map_err(|e| invalid(e.to_string()))?;

        if self.max_power_mw < self.min_power_mw {
            return Err(invalid(format!(
                "max_power_mw ({}) must be >= min_power_mw ({})",
                self.max_power_mw, self.min_power_mw
            )));
        }

        if self.initial_on && !self.can_produce(self.initial_power_mw) {
            return Err(invalid(format!(
                "initial_power_mw ({}) outside [{}, {}] for a unit that starts on",
                self.initial_power_mw, self.min_power_mw, self.max_power_mw
            )));
        }

        if !self.initial_on && self.initial_power_mw != 0.0 {
            return Err(invalid(format!(
                "initial_power_mw must be 0 for a unit that starts off, got {}",
                self.initial_power_mw
            )));
        }

        Ok(())
    }
}

/// Validate a whole fleet: every unit individually plus id uniqueness.
pub fn validate_fleet(units: &[GeneratingUnit]) -> Result<()> {
    if units.is_empty() {
        return Err(UnitCommitmentError::InvalidUnit {
            unit: "<fleet>".to_string(),
            reason: "no units provided".to_string(),
        });
    }

    for (i, unit) in units.iter().enumerate() {
        unit.validate_parameters()?;
        if units[..i].iter().any(|u| u.id == unit.id) {
            return Err(UnitCommitmentError::InvalidUnit {
                unit: unit.id.clone(),
                reason: "duplicate unit id".to_string(),
            });
        }
    }

    Ok(())
}
