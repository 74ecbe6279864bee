//! Sensitivity and breakeven analysis over uncertain model parameters

mod breakeven;
mod parameters;
mod tornado;

pub use breakeven::{BreakevenResult, SolvableParameter, run_breakeven, solvable_parameters};
pub use parameters::{UncertainParameter, uncertain_parameters};
pub use tornado::{MAX_TORNADO_PARAMETERS, TornadoEntry, TornadoResult, run_tornado};
