//! Calculation drivers
//!
//! The deterministic driver is one pass with expected values; the Monte
//! Carlo driver reruns the whole model with fresh draws per iteration.
//! Iterations are independent: each batch owns its own RNG stream derived
//! from the caller's seed, and nothing leaks between passes.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::cashflow::run_pass;
use crate::error::EngineError;
use crate::model::{
    CalculationMode, DeterministicResult, FinancialModel, MonteCarloConfig, MonteCarloResult,
    MonthlyCashflowStats, StreamId, SummaryStats,
};
use crate::sampling::{ParameterRef, SamplingPolicy};
use crate::stats;
use crate::valuation::{irr, irr_fields, npv, payback_period, perpetual_stream_ids, terminal_value};

/// Iterations per rayon work unit.
const MAX_BATCH_SIZE: usize = 100;

/// Margin added to a clamped Monte Carlo discount draw so the perpetuity
/// stays finite.
const DISCOUNT_CLAMP_MARGIN: f64 = 0.001;

/// One pass with expected values everywhere.
pub fn run_deterministic(model: &FinancialModel) -> Result<DeterministicResult, EngineError> {
    run_with_policy(model, &SamplingPolicy::Deterministic)
}

/// One non-stochastic pass under the given policy. Shared by the
/// deterministic driver and the sensitivity/breakeven override runs.
pub(crate) fn run_with_policy(
    model: &FinancialModel,
    policy: &SamplingPolicy,
) -> Result<DeterministicResult, EngineError> {
    // Deterministic and override policies never consult the RNG
    let mut rng = SmallRng::seed_from_u64(0);
    let pass = run_pass(model, policy, &mut rng)?;

    match model.settings.calculation_mode {
        CalculationMode::Npv => {
            let discount_rate = policy.resolve(
                &ParameterRef::DiscountRate,
                &model.settings.discount_rate,
                None,
                &mut rng,
            )?;
            let mut total = npv(&pass.totals, discount_rate);

            let growth = model.settings.terminal_growth_rate;
            let n_months = model.settings.forecast_months;
            let mut terminal_total = 0.0;
            for id in perpetual_stream_ids(model) {
                let final_cf = final_month_cashflow(&pass.stream_cashflows, &id);
                terminal_total += terminal_value(final_cf, growth, discount_rate, n_months);
            }
            total += terminal_total;

            let (irr_value, irr_error) = irr_fields(irr(&pass.totals));
            Ok(DeterministicResult {
                calculation_mode: CalculationMode::Npv,
                npv: total,
                irr: irr_value,
                irr_error,
                terminal_value: Some(terminal_total),
                discount_rate: Some(discount_rate),
                payback_months: payback_period(&pass.totals),
                cashflows: pass.totals,
                stream_cashflows: pass.stream_cashflows,
            })
        }
        CalculationMode::Irr => {
            let (irr_value, irr_error) = irr_fields(irr(&pass.totals));
            Ok(DeterministicResult {
                calculation_mode: CalculationMode::Irr,
                npv: 0.0,
                irr: irr_value,
                irr_error,
                terminal_value: None,
                discount_rate: None,
                payback_months: None,
                cashflows: pass.totals,
                stream_cashflows: pass.stream_cashflows,
            })
        }
    }
}

fn final_month_cashflow(
    stream_cashflows: &rustc_hash::FxHashMap<StreamId, Vec<f64>>,
    id: &StreamId,
) -> f64 {
    stream_cashflows
        .get(id)
        .and_then(|cfs| cfs.last())
        .copied()
        .unwrap_or(0.0)
}

struct IterationOutcome {
    npv: Option<f64>,
    irr: Option<f64>,
    payback: Option<f64>,
    clamped_discount: bool,
    cashflows: Vec<f64>,
}

fn run_iteration<R: Rng + ?Sized>(
    model: &FinancialModel,
    perpetual: &[StreamId],
    rng: &mut R,
) -> Result<IterationOutcome, EngineError> {
    let pass = run_pass(model, &SamplingPolicy::Stochastic, rng)?;

    match model.settings.calculation_mode {
        CalculationMode::Npv => {
            let growth = model.settings.terminal_growth_rate;
            let mut discount_rate = model.settings.discount_rate.sample(rng, None)?;
            let clamped = discount_rate <= growth;
            if clamped {
                discount_rate = growth + DISCOUNT_CLAMP_MARGIN;
            }

            let mut total = npv(&pass.totals, discount_rate);
            let n_months = model.settings.forecast_months;
            for id in perpetual {
                let final_cf = final_month_cashflow(&pass.stream_cashflows, id);
                total += terminal_value(final_cf, growth, discount_rate, n_months);
            }

            Ok(IterationOutcome {
                npv: Some(total),
                irr: None,
                payback: payback_period(&pass.totals),
                clamped_discount: clamped,
                cashflows: pass.totals,
            })
        }
        CalculationMode::Irr => Ok(IterationOutcome {
            npv: None,
            irr: irr(&pass.totals).ok(),
            payback: None,
            clamped_discount: false,
            cashflows: pass.totals,
        }),
    }
}

/// Run `config.n_simulations` independent stochastic passes and aggregate.
///
/// Batches execute in parallel; each batch derives its own `SmallRng` from
/// the caller's seed, so a given `(model, config, seed)` triple reproduces
/// its sample arrays exactly. Only aggregates and percentiles are
/// meaningful — the sample order is an artifact of batching.
pub fn run_monte_carlo(
    model: &FinancialModel,
    config: &MonteCarloConfig,
    seed: u64,
) -> Result<MonteCarloResult, EngineError> {
    let n_simulations = config.n_simulations;
    let mode = model.settings.calculation_mode;
    tracing::info!(n_simulations, ?mode, seed, "starting Monte Carlo run");

    let perpetual = perpetual_stream_ids(model);
    let num_batches = n_simulations.div_ceil(MAX_BATCH_SIZE);

    let batches: Result<Vec<Vec<IterationOutcome>>, EngineError> = (0..num_batches)
        .into_par_iter()
        .map(|batch_idx| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(batch_idx as u64));
            let batch_size = if batch_idx == num_batches - 1 {
                n_simulations - batch_idx * MAX_BATCH_SIZE
            } else {
                MAX_BATCH_SIZE
            };
            (0..batch_size)
                .map(|_| run_iteration(model, &perpetual, &mut rng))
                .collect()
        })
        .collect();
    let iterations: Vec<IterationOutcome> = batches?.into_iter().flatten().collect();

    let n_months = model.settings.forecast_months;
    let mut cashflow_distributions = Vec::with_capacity(n_months);
    for month in 0..n_months {
        let mut month_samples: Vec<f64> = iterations
            .iter()
            .map(|it| it.cashflows.get(month).copied().unwrap_or(0.0))
            .collect();
        month_samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        cashflow_distributions.push(MonthlyCashflowStats {
            month,
            mean: stats::mean(&month_samples),
            median: stats::percentile(&month_samples, 0.50),
            p10: stats::percentile(&month_samples, 0.10),
            p90: stats::percentile(&month_samples, 0.90),
        });
    }

    let npv_samples: Vec<f64> = iterations.iter().filter_map(|it| it.npv).collect();
    let irr_samples: Vec<f64> = iterations.iter().filter_map(|it| it.irr).collect();
    let payback_samples: Vec<f64> = iterations.iter().filter_map(|it| it.payback).collect();
    let clamped_discount_samples = iterations.iter().filter(|it| it.clamped_discount).count();
    let irr_failed_count = match mode {
        CalculationMode::Irr => iterations.len() - irr_samples.len(),
        CalculationMode::Npv => 0,
    };

    if clamped_discount_samples > 0 {
        tracing::warn!(
            clamped_discount_samples,
            "sampled discount rates at or below terminal growth were clamped"
        );
    }

    Ok(MonteCarloResult {
        calculation_mode: mode,
        n_simulations,
        npv: SummaryStats::from_samples(&npv_samples),
        irr: SummaryStats::from_samples(&irr_samples),
        payback: SummaryStats::from_samples(&payback_samples),
        payback_achieved_count: payback_samples.len(),
        npv_samples,
        irr_samples,
        irr_failed_count,
        clamped_discount_samples,
        cashflow_distributions,
    })
}
