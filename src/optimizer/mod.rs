pub mod beam;
pub mod constraints;
pub mod cost;
pub mod dispatch;
pub mod sequential;
pub mod state;
pub mod types;

pub use beam::BeamSearchScheduler;
pub use constraints::{achievable_range, resolve, resolve_all, PowerBand, UnitStatus};
pub use cost::{merit_order, merit_order_key, production_cost, transition_cost};
pub use dispatch::{allocate, Dispatch, DispatchOutcome, DispatchUnit, SinglePeriodDispatcher};
pub use sequential::SequentialScheduler;
pub use state::{Commitment, UnitState};
pub use types::*;
