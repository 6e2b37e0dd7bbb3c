pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod telemetry;
pub mod validator;

pub use config::{Config, OptimizerConfig, SchedulingMode};
pub use domain::{CostCurve, DemandProfile, FailureReason, GeneratingUnit, Solution};
pub use error::{ConstraintViolation, Result, UnitCommitmentError, ViolationKind};
pub use optimizer::UnitCommitmentOptimizer;
pub use validator::SolutionValidator;
