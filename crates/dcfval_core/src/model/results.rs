//! Result records produced by the calculation drivers

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::stats;

use super::ids::StreamId;
use super::settings::CalculationMode;

/// Output of a single deterministic pass.
///
/// In NPV mode `npv` includes the terminal value and `irr` is informational;
/// in IRR mode `npv` is 0 and `terminal_value` / `discount_rate` /
/// `payback_months` are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicResult {
    pub calculation_mode: CalculationMode,
    pub npv: f64,
    pub irr: Option<f64>,
    pub irr_error: Option<String>,
    pub terminal_value: Option<f64>,
    pub discount_rate: Option<f64>,
    pub payback_months: Option<f64>,
    /// Aggregate monthly cashflow vector
    pub cashflows: Vec<f64>,
    /// Per-stream monthly cashflow vectors
    pub stream_cashflows: FxHashMap<StreamId, Vec<f64>>,
}

/// Summary statistics over a sample array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

impl SummaryStats {
    /// `None` when the sample set is empty.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some(Self {
            mean: stats::mean(&sorted),
            median: stats::percentile(&sorted, 0.50),
            std_dev: stats::std_dev(&sorted),
            p10: stats::percentile(&sorted, 0.10),
            p25: stats::percentile(&sorted, 0.25),
            p75: stats::percentile(&sorted, 0.75),
            p90: stats::percentile(&sorted, 0.90),
        })
    }
}

/// Per-month cashflow distribution across Monte Carlo iterations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflowStats {
    pub month: usize,
    pub mean: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

fn default_n_simulations() -> usize {
    10_000
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_n_simulations")]
    pub n_simulations: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
        }
    }
}

/// Aggregated output of a Monte Carlo run.
///
/// NPV mode fills `npv`/`npv_samples` and the payback fields; IRR mode
/// fills `irr`/`irr_samples` and `irr_failed_count`. The raw sample arrays
/// feed downstream histograms; their order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub calculation_mode: CalculationMode,
    pub n_simulations: usize,
    pub npv: Option<SummaryStats>,
    pub npv_samples: Vec<f64>,
    pub irr: Option<SummaryStats>,
    pub irr_samples: Vec<f64>,
    /// Iterations whose IRR could not be solved (IRR mode)
    pub irr_failed_count: usize,
    pub payback: Option<SummaryStats>,
    /// Iterations whose cumulative cashflow ever crossed zero (NPV mode)
    pub payback_achieved_count: usize,
    /// Iterations where the sampled discount rate was at or below the
    /// terminal growth rate and was clamped to `growth + 0.001` to keep the
    /// perpetuity finite
    pub clamped_discount_samples: usize,
    pub cashflow_distributions: Vec<MonthlyCashflowStats>,
}
