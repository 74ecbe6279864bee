//! Discounted cash flow valuation engine
//!
//! A model is a graph of revenue and cost streams driven by probability
//! distributions over time. The engine produces:
//! - Deterministic valuations (NPV with Gordon-Growth terminal value, or
//!   IRR via bracketed root finding), with payback periods
//! - Monte Carlo outcome distributions over independent stochastic passes
//! - Tornado sensitivity rankings (P10/P90 one-at-a-time swings)
//! - Per-parameter breakeven solutions
//!
//! Streams may derive from a parent: each non-zero parent month spawns
//! child events after a trigger delay, optionally renewing periodically.
//! Evaluation always walks streams in topological order, so a child sees
//! its parent's cashflows from the same pass.
//!
//! How distributions resolve (expected value, fresh draw, or a fixed
//! override of one slot) is an explicit [`sampling::SamplingPolicy`]
//! parameter rather than ambient state; sensitivity scans never mutate the
//! model.

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod cashflow;
pub mod error;
pub mod optimization;
pub mod persistence;
pub mod sampling;
pub mod simulation;
pub mod stats;
pub mod valuation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use model::{
    CalculationMode, DeterministicResult, Distribution, FinancialModel, ModelDocument,
    ModelSettings, MonteCarloConfig, MonteCarloResult, Stream, StreamId, StreamKind,
};
pub use sampling::{ParameterRef, SamplingPolicy};
pub use simulation::{run_deterministic, run_monte_carlo};
