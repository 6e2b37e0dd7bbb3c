pub mod demand;
pub mod solution;
pub mod unit;

pub use demand::*;
pub use solution::*;
pub use unit::*;
