//! Cashflow construction
//!
//! Turns one stream plus a sampling policy into a monthly cashflow vector,
//! and evaluates a whole model in topological order. A pass keeps a working
//! map `id -> vector` so that every child finds its parent's vector from
//! the same pass, never a cached one.

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::{ConfigError, EngineError};
use crate::model::{FinancialModel, ModelSettings, Stream, StreamId, StreamKind};
use crate::sampling::{ParameterRef, SamplingPolicy};

/// All cashflow vectors produced by one evaluation pass.
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Per-stream vectors, keyed by stream id
    pub stream_cashflows: FxHashMap<StreamId, Vec<f64>>,
    /// Element-wise sum across streams
    pub totals: Vec<f64>,
}

/// Build the monthly cashflow vector for one stream.
///
/// `parent_cashflows` must be the parent's vector from the same pass when
/// the stream has a parent; `annual_escalation` is the pass-level
/// escalation draw (resolved once, constant across months).
pub fn build_cashflows<R: Rng + ?Sized>(
    stream: &Stream,
    policy: &SamplingPolicy,
    parent_cashflows: Option<&[f64]>,
    settings: &ModelSettings,
    annual_escalation: Option<f64>,
    rng: &mut R,
) -> Result<Vec<f64>, ConfigError> {
    match parent_cashflows {
        Some(parent) if stream.parent_stream_id.is_some() => {
            build_child_cashflows(stream, parent, policy, settings, annual_escalation, rng)
        }
        _ => build_root_cashflows(stream, policy, settings, annual_escalation, rng),
    }
}

fn escalation_factor(annual_rate: f64, months_elapsed: usize) -> f64 {
    (1.0 + annual_rate / 12.0).powi(months_elapsed as i32)
}

fn build_root_cashflows<R: Rng + ?Sized>(
    stream: &Stream,
    policy: &SamplingPolicy,
    settings: &ModelSettings,
    annual_escalation: Option<f64>,
    rng: &mut R,
) -> Result<Vec<f64>, ConfigError> {
    let n_months = settings.forecast_months;
    let mut cashflows = vec![0.0; n_months];

    let amount_ref = ParameterRef::Amount(stream.id.clone());
    let unit_value_ref = ParameterRef::UnitValue(stream.id.clone());
    let market_units_ref = ParameterRef::MarketUnits(stream.id.clone());
    let adoption_ref = ParameterRef::AdoptionCurve(stream.id.clone());

    for m in stream.start_month..stream.active_end(n_months) {
        let months_elapsed = m - stream.start_month;

        // Base: the unit economics pair wins over the plain amount
        let mut amount = match (&stream.unit_value, &stream.market_units) {
            (Some(unit_value), Some(market_units)) => {
                let uv = policy.resolve(&unit_value_ref, unit_value, Some(m), rng)?;
                let mu = policy.resolve(&market_units_ref, market_units, Some(m), rng)?;
                uv * mu
            }
            _ => policy.resolve(&amount_ref, &stream.amount, Some(m), rng)?,
        };

        if let Some(rate) = annual_escalation {
            amount *= escalation_factor(rate, months_elapsed);
        }

        if let Some(curve) = &stream.adoption_curve {
            amount *= policy.resolve(&adoption_ref, curve, Some(m), rng)?;
        }

        cashflows[m] = amount;
    }

    // A positive cost entry still yields a negative cashflow
    if stream.kind == StreamKind::Cost {
        for value in &mut cashflows {
            *value = -value.abs();
        }
    }

    Ok(cashflows)
}

/// Child cashflows are a sparse, delayed, optionally periodic echo of the
/// parent's non-zero months. The child amount is drawn once for the whole
/// build so that all child events within one stochastic pass are coupled.
fn build_child_cashflows<R: Rng + ?Sized>(
    stream: &Stream,
    parent_cashflows: &[f64],
    policy: &SamplingPolicy,
    settings: &ModelSettings,
    annual_escalation: Option<f64>,
    rng: &mut R,
) -> Result<Vec<f64>, ConfigError> {
    let n_months = settings.forecast_months;
    let mut cashflows = vec![0.0; n_months];
    let child_end = stream.active_end(n_months);

    let amount_ref = ParameterRef::Amount(stream.id.clone());
    let child_amount = policy.resolve(&amount_ref, &stream.amount, None, rng)?;

    let place = |cashflows: &mut Vec<f64>, event_month: usize, event_value: f64| {
        if event_month < stream.start_month || event_month >= child_end {
            return;
        }
        let mut value = event_value;
        if let Some(rate) = annual_escalation {
            let months_elapsed = event_month - stream.start_month;
            if months_elapsed > 0 {
                value *= escalation_factor(rate, months_elapsed);
            }
        }
        cashflows[event_month] += value;
    };

    for (parent_month, &parent_value) in parent_cashflows.iter().enumerate().take(n_months) {
        if parent_value == 0.0 {
            continue;
        }

        // The event value is locked to the parent's original magnitude
        let event_value = if stream.amount_is_ratio {
            parent_value.abs() * child_amount * stream.conversion_rate
        } else {
            child_amount * stream.conversion_rate
        };

        let first_event = parent_month + stream.trigger_delay_months;
        match stream.periodicity_months {
            None => place(&mut cashflows, first_event, event_value),
            Some(period) => {
                let period = period.max(1);
                let mut event_month = first_event;
                while event_month < child_end {
                    place(&mut cashflows, event_month, event_value);
                    event_month += period;
                }
            }
        }
    }

    if stream.kind == StreamKind::Cost {
        for value in &mut cashflows {
            *value = -value.abs();
        }
    }

    Ok(cashflows)
}

/// Evaluate every stream of the model under one policy, in topological
/// order. The escalation rate is resolved once for the whole pass.
pub fn run_pass<R: Rng + ?Sized>(
    model: &FinancialModel,
    policy: &SamplingPolicy,
    rng: &mut R,
) -> Result<PassResult, EngineError> {
    let n_months = model.settings.forecast_months;
    let order = model.execution_order()?;

    let annual_escalation = match &model.settings.escalation_rate {
        Some(dist) => Some(policy.resolve(&ParameterRef::EscalationRate, dist, None, rng)?),
        None => None,
    };

    let mut stream_cashflows: FxHashMap<StreamId, Vec<f64>> = FxHashMap::default();
    stream_cashflows.reserve(order.len());

    for id in &order {
        let Some(stream) = model.stream(id) else {
            continue;
        };
        let parent = stream
            .parent_stream_id
            .as_ref()
            .and_then(|pid| stream_cashflows.get(pid));
        let cashflows = match (stream.parent_stream_id.as_ref(), parent) {
            (Some(_), Some(parent)) => build_child_cashflows(
                stream,
                parent,
                policy,
                &model.settings,
                annual_escalation,
                rng,
            )?,
            // A dangling parent yields an empty vector rather than a failed pass
            (Some(_), None) => vec![0.0; n_months],
            (None, _) => {
                build_root_cashflows(stream, policy, &model.settings, annual_escalation, rng)?
            }
        };
        stream_cashflows.insert(id.clone(), cashflows);
    }

    let mut totals = vec![0.0; n_months];
    for cashflows in stream_cashflows.values() {
        for (total, value) in totals.iter_mut().zip(cashflows) {
            *total += value;
        }
    }

    Ok(PassResult {
        stream_cashflows,
        totals,
    })
}
