use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::domain::GeneratingUnit;
use crate::error::{Result, UnitCommitmentError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Fleet and demand the runner binary optimizes. Library callers pass their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioConfig>,
}

/// Which multi-period strategy to run.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SchedulingMode {
    /// One state vector carried forward; each period solved in isolation.
    Sequential,
    /// Bounded state-space search across periods with backtracking.
    #[default]
    BeamSearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub mode: SchedulingMode,
    /// States retained per period by the beam search.
    pub beam_width: usize,
    /// Discretization step for candidate power levels in the single-period search.
    pub power_step_mw: f64,
    pub absolute_tolerance_mw: f64,
    /// Fraction of demand accepted as balance error when larger than the absolute tolerance.
    pub relative_tolerance: f64,
    /// Rounding applied to residual demand in memoization keys. Grid levels already
    /// keep residuals on multiples of `power_step_mw`; this only absorbs float noise
    /// and must stay well below the step.
    pub memo_resolution_mw: f64,
    /// Commitment combinations evaluated per retained state before enumeration stops.
    pub max_expansions_per_state: usize,
    /// Run the validator on every produced solution.
    pub validate_output: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::BeamSearch,
            beam_width: 64,
            power_step_mw: 1.0,
            absolute_tolerance_mw: 1e-3,
            relative_tolerance: 1e-4,
            memo_resolution_mw: 1e-6,
            max_expansions_per_state: 4096,
            validate_output: true,
        }
    }
}

impl OptimizerConfig {
    /// Accepted power-balance error for a period with `demand_mw`.
    pub fn tolerance_for(&self, demand_mw: f64) -> f64 {
        self.absolute_tolerance_mw.max(self.relative_tolerance * demand_mw)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(UnitCommitmentError::InvalidConfig(msg));

        if self.beam_width == 0 {
            return invalid("beam_width must be at least 1".to_string());
        }
        if self.max_expansions_per_state == 0 {
            return invalid("max_expansions_per_state must be at least 1".to_string());
        }
        if !self.power_step_mw.is_finite() || self.power_step_mw <= 0.0 {
            return invalid(format!("power_step_mw must be positive, got {}", self.power_step_mw));
        }
        if !self.memo_resolution_mw.is_finite() || self.memo_resolution_mw <= 0.0 {
            return invalid(format!(
                "memo_resolution_mw must be positive, got {}",
                self.memo_resolution_mw
            ));
        }
        if self.memo_resolution_mw * 10.0 > self.power_step_mw {
            return invalid(format!(
                "memo_resolution_mw ({}) must be at most a tenth of power_step_mw ({})",
                self.memo_resolution_mw, self.power_step_mw
            ));
        }
        for (name, value) in [
            ("absolute_tolerance_mw", self.absolute_tolerance_mw),
            ("relative_tolerance", self.relative_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub units: Vec<GeneratingUnit>,
    pub demand_mw: Vec<f64>,
}

impl Config {
    /// Defaults, then `config/default.toml`, then `UC__SECTION__KEY` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("UC__").split("__"));
        Self::extract(figment)
    }

    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let figment =
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> anyhow::Result<Self> {
        let cfg: Config = figment.extract()?;
        cfg.optimizer.validate()?;
        Ok(cfg)
    }
}
