use serde::Serialize;
use thiserror::Error;

/// Structural errors raised before any search begins.
///
/// Business infeasibility is never reported through this type; see
/// [`crate::domain::FailureReason`].
#[derive(Debug, Error)]
pub enum UnitCommitmentError {
    #[error("Invalid unit {unit}: {reason}")]
    InvalidUnit { unit: String, reason: String },

    #[error("Invalid demand: {0}")]
    InvalidDemand(String),

    #[error("Invalid power for unit {unit}: {power_mw} MW")]
    InvalidPower { unit: String, power_mw: f64 },

    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfig(String),

    /// The produced schedule breaks a physical constraint. This is a scheduler
    /// defect, not something a caller can fix by changing inputs.
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),
}

pub type Result<T> = std::result::Result<T, UnitCommitmentError>;

/// Which invariant a [`ConstraintViolation`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ViolationKind {
    PowerBalance,
    CapacityLimit,
    OffUnitProducing,
    RampUp,
    RampDown,
    MinUptime,
    MinDowntime,
    ShapeMismatch,
}

#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind} violated in period {period}{}: {detail}", unit_suffix(.unit))]
pub struct ConstraintViolation {
    /// `None` for fleet-wide checks such as power balance.
    pub unit: Option<String>,
    pub period: usize,
    pub kind: ViolationKind,
    pub detail: String,
}

fn unit_suffix(unit: &Option<String>) -> String {
    unit.as_ref()
        .map(|u| format!(" (unit {u})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_names_unit_and_period() {
        let v = ConstraintViolation {
            unit: Some("coal-1".to_string()),
            period: 4,
            kind: ViolationKind::RampUp,
            detail: "change 60.00 MW exceeds 50.00 MW".to_string(),
        };
        assert_eq!(
            v.to_string(),
            "ramp_up violated in period 4 (unit coal-1): change 60.00 MW exceeds 50.00 MW"
        );
    }

    #[test]
    fn test_fleet_violation_has_no_unit_suffix() {
        let v = ConstraintViolation {
            unit: None,
            period: 0,
            kind: ViolationKind::PowerBalance,
            detail: "generated 90.00 MW, required 100.00 MW".to_string(),
        };
        assert!(v.to_string().starts_with("power_balance violated in period 0:"));

        let err: UnitCommitmentError = v.into();
        assert!(matches!(err, UnitCommitmentError::ConstraintViolation(_)));
    }
}
