//! Integration tests for the valuation engine
//!
//! Tests are organized by topic:
//! - `streams` - Cashflow construction: windows, signs, child derivation
//! - `valuation` - NPV, terminal value, IRR and payback scenarios
//! - `monte_carlo` - Stochastic driver behavior and reproducibility
//! - `analysis` - Sensitivity rankings and breakeven solving
//! - `document` - Document round-trips, persistence and templates

mod document;
mod monte_carlo;
