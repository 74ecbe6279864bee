//! Tornado sensitivity analysis
//!
//! Each uncertain parameter is swung from its P10 to its P90 while
//! everything else stays at expected values, and parameters are ranked by
//! the induced NPV swing. The overrides are expressed through the sampling
//! policy, so the model is bit-identical before and after a run.

use serde::Serialize;

use crate::error::EngineError;
use crate::model::FinancialModel;
use crate::sampling::SamplingPolicy;
use crate::simulation::{run_deterministic, run_with_policy};

use super::parameters::uncertain_parameters;

/// The ranking keeps only the largest swings.
pub const MAX_TORNADO_PARAMETERS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoEntry {
    pub parameter_name: String,
    pub stream_name: String,
    /// `|npv_high - npv_low|`
    pub swing: f64,
    pub npv_low: f64,
    pub npv_high: f64,
    pub p10_value: f64,
    pub p90_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoResult {
    pub baseline_npv: f64,
    /// Entries sorted by swing, largest first, at most
    /// [`MAX_TORNADO_PARAMETERS`]
    pub parameters: Vec<TornadoEntry>,
}

pub fn run_tornado(model: &FinancialModel) -> Result<TornadoResult, EngineError> {
    let parameters = uncertain_parameters(model)?;
    if parameters.is_empty() {
        return Ok(TornadoResult {
            baseline_npv: 0.0,
            parameters: Vec::new(),
        });
    }

    tracing::info!(parameter_count = parameters.len(), "running tornado analysis");
    let baseline_npv = run_deterministic(model)?.npv;

    let mut entries = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let low_policy = SamplingPolicy::fixed_override(parameter.target.clone(), parameter.p10);
        let npv_low = run_with_policy(model, &low_policy)?.npv;

        let high_policy = SamplingPolicy::fixed_override(parameter.target.clone(), parameter.p90);
        let npv_high = run_with_policy(model, &high_policy)?.npv;

        entries.push(TornadoEntry {
            parameter_name: parameter.parameter_name,
            stream_name: parameter.stream_name,
            swing: (npv_high - npv_low).abs(),
            npv_low: npv_low.min(npv_high),
            npv_high: npv_low.max(npv_high),
            p10_value: parameter.p10,
            p90_value: parameter.p90,
        });
    }

    entries.sort_by(|a, b| {
        b.swing
            .partial_cmp(&a.swing)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(MAX_TORNADO_PARAMETERS);

    Ok(TornadoResult {
        baseline_npv,
        parameters: entries,
    })
}
