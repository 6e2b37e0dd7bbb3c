use serde::{Deserialize, Serialize};

use crate::error::{Result, UnitCommitmentError};

/// Demand to be met, one value (MW) per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct DemandProfile {
    values: Vec<f64>,
}

impl DemandProfile {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(UnitCommitmentError::InvalidDemand(
                "demand profile must contain at least one period".to_string(),
            ));
        }
        for (period, value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(UnitCommitmentError::InvalidDemand(format!(
                    "period {period}: demand is not finite ({value})"
                )));
            }
            if *value < 0.0 {
                return Err(UnitCommitmentError::InvalidDemand(format!(
                    "period {period}: demand must be non-negative, got {value}"
                )));
            }
        }
        Ok(Self { values })
    }

    /// Single-period profile.
    pub fn single(demand_mw: f64) -> Result<Self> {
        Self::new(vec![demand_mw])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, period: usize) -> Option<f64> {
        self.values.get(period).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl TryFrom<Vec<f64>> for DemandProfile {
    type Error = UnitCommitmentError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<DemandProfile> for Vec<f64> {
    fn from(profile: DemandProfile) -> Self {
        profile.values
    }
}
