//! Breakeven solving
//!
//! Finds the scalar value of one parameter at which the deterministic NPV
//! hits a target. The search bracket depends on the parameter kind: rates
//! get rate-shaped brackets, amounts search an order of magnitude around
//! their current value.

use serde::Serialize;

use crate::error::{ConfigError, EngineError, RootFindError};
use crate::model::{Distribution, FinancialModel, StreamId};
use crate::optimization::find_root;
use crate::sampling::{ParameterRef, SamplingPolicy};
use crate::simulation::run_with_policy;

use super::parameters::{SETTINGS_STREAM_NAME, amount_label, uncertain_parameters};

const BREAKEVEN_XTOL: f64 = 1e-6;
const BREAKEVEN_MAX_ITER: usize = 200;

/// Fallback magnitude for the amount bracket when the current value is 0.
const ZERO_AMOUNT_MAGNITUDE: f64 = 10_000.0;

/// A parameter that breakeven can solve for. Unlike the tornado scan this
/// includes FIXED slots: any numeric parameter is solvable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvableParameter {
    pub stream_id: Option<StreamId>,
    pub stream_name: String,
    pub parameter_name: String,
    pub target: ParameterRef,
    pub current_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakevenResult {
    pub found: bool,
    pub parameter_name: String,
    pub stream_name: Option<String>,
    pub stream_id: Option<StreamId>,
    /// The solving value when `found`
    pub value: Option<f64>,
    pub original_value: Option<f64>,
    pub target_npv: f64,
    /// The bracket the solver searched
    pub bracket: Option<(f64, f64)>,
    pub reason: Option<String>,
}

/// Parameters eligible for breakeven solving: every uncertain parameter
/// plus the FIXED amount-like slots and a FIXED discount rate.
pub fn solvable_parameters(
    model: &FinancialModel,
) -> Result<Vec<SolvableParameter>, ConfigError> {
    let mut parameters: Vec<SolvableParameter> = uncertain_parameters(model)?
        .into_iter()
        .map(|p| SolvableParameter {
            current_value: distribution_for(model, &p.target)
                .map(|d| d.deterministic(None))
                .unwrap_or(p.p50),
            stream_id: p.stream_id,
            stream_name: p.stream_name,
            parameter_name: p.parameter_name,
            target: p.target,
        })
        .collect();

    for stream in model.streams() {
        if stream.uses_unit_economics() {
            for (dist, label, target) in [
                (
                    stream.unit_value.as_ref(),
                    format!("{} - Unit Value", stream.name),
                    ParameterRef::UnitValue(stream.id.clone()),
                ),
                (
                    stream.market_units.as_ref(),
                    format!("{} - Market Units", stream.name),
                    ParameterRef::MarketUnits(stream.id.clone()),
                ),
            ] {
                if let Some(dist @ Distribution::Fixed { .. }) = dist {
                    parameters.push(SolvableParameter {
                        stream_id: Some(stream.id.clone()),
                        stream_name: stream.name.clone(),
                        parameter_name: label,
                        target,
                        current_value: dist.deterministic(None),
                    });
                }
            }
        } else if matches!(stream.amount, Distribution::Fixed { .. }) {
            parameters.push(SolvableParameter {
                stream_id: Some(stream.id.clone()),
                stream_name: stream.name.clone(),
                parameter_name: amount_label(stream),
                target: ParameterRef::Amount(stream.id.clone()),
                current_value: stream.amount.deterministic(None),
            });
        }
    }

    if matches!(model.settings.discount_rate, Distribution::Fixed { .. }) {
        parameters.push(SolvableParameter {
            stream_id: None,
            stream_name: SETTINGS_STREAM_NAME.to_string(),
            parameter_name: "Discount Rate".to_string(),
            target: ParameterRef::DiscountRate,
            current_value: model.settings.discount_rate.deterministic(None),
        });
    }

    // Deduplicate by (stream, name); the uncertain entries come first and win
    let mut seen: Vec<(Option<StreamId>, String)> = Vec::new();
    parameters.retain(|p| {
        let key = (p.stream_id.clone(), p.parameter_name.clone());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });

    Ok(parameters)
}

fn distribution_for<'a>(
    model: &'a FinancialModel,
    target: &ParameterRef,
) -> Option<&'a Distribution> {
    match target {
        ParameterRef::DiscountRate => Some(&model.settings.discount_rate),
        ParameterRef::EscalationRate => model.settings.escalation_rate.as_ref(),
        ParameterRef::Amount(id) => model.stream(id).map(|s| &s.amount),
        ParameterRef::UnitValue(id) => model.stream(id).and_then(|s| s.unit_value.as_ref()),
        ParameterRef::MarketUnits(id) => model.stream(id).and_then(|s| s.market_units.as_ref()),
        ParameterRef::AdoptionCurve(id) => {
            model.stream(id).and_then(|s| s.adoption_curve.as_ref())
        }
    }
}

/// Search bracket per parameter kind: rates are bounded ranges, amounts
/// search from zero to an order of magnitude above the current value.
fn bracket_for(target: &ParameterRef, current_value: f64) -> (f64, f64) {
    match target {
        ParameterRef::DiscountRate => (0.001, 1.0),
        ParameterRef::EscalationRate => (-0.5, 1.0),
        _ => {
            let magnitude = if current_value != 0.0 {
                current_value.abs()
            } else {
                ZERO_AMOUNT_MAGNITUDE
            };
            (0.0, magnitude * 10.0)
        }
    }
}

/// Solve for the value of `parameter_name` (scoped to `stream_id`, `None`
/// for model settings) at which the deterministic NPV equals `target_npv`.
pub fn run_breakeven(
    model: &FinancialModel,
    stream_id: Option<&StreamId>,
    parameter_name: &str,
    target_npv: f64,
) -> Result<BreakevenResult, EngineError> {
    let parameters = solvable_parameters(model)?;
    let Some(parameter) = parameters
        .into_iter()
        .find(|p| p.stream_id.as_ref() == stream_id && p.parameter_name == parameter_name)
    else {
        return Ok(BreakevenResult {
            found: false,
            parameter_name: parameter_name.to_string(),
            stream_name: None,
            stream_id: stream_id.cloned(),
            value: None,
            original_value: None,
            target_npv,
            bracket: None,
            reason: Some(format!(
                "parameter '{parameter_name}' not found{}",
                stream_id
                    .map(|id| format!(" for stream '{id}'"))
                    .unwrap_or_default()
            )),
        });
    };

    let (lo, hi) = bracket_for(&parameter.target, parameter.current_value);
    tracing::debug!(
        parameter = %parameter.parameter_name,
        lo,
        hi,
        target_npv,
        "solving breakeven"
    );

    let evaluate = |value: f64| -> Result<f64, EngineError> {
        let policy = SamplingPolicy::fixed_override(parameter.target.clone(), value);
        Ok(run_with_policy(model, &policy)?.npv - target_npv)
    };
    // Surface configuration errors before handing the closure to the
    // solver; inside it they would be indistinguishable from non-bracketing
    evaluate(lo)?;

    let outcome = find_root(
        |value| evaluate(value).unwrap_or(f64::NAN),
        lo,
        hi,
        BREAKEVEN_XTOL,
        BREAKEVEN_MAX_ITER,
    );

    let result = match outcome {
        Ok(value) => BreakevenResult {
            found: true,
            parameter_name: parameter.parameter_name,
            stream_name: Some(parameter.stream_name),
            stream_id: parameter.stream_id,
            value: Some(value),
            original_value: Some(parameter.current_value),
            target_npv,
            bracket: Some((lo, hi)),
            reason: None,
        },
        Err(RootFindError::NoSignChange { .. }) => BreakevenResult {
            found: false,
            parameter_name: parameter.parameter_name,
            stream_name: Some(parameter.stream_name),
            stream_id: parameter.stream_id,
            value: None,
            original_value: Some(parameter.current_value),
            target_npv,
            bracket: Some((lo, hi)),
            reason: Some(
                "no breakeven found in search range; NPV does not cross the target".to_string(),
            ),
        },
        Err(RootFindError::MaxIterations { .. }) => BreakevenResult {
            found: false,
            parameter_name: parameter.parameter_name,
            stream_name: Some(parameter.stream_name),
            stream_id: parameter.stream_id,
            value: None,
            original_value: Some(parameter.current_value),
            target_npv,
            bracket: Some((lo, hi)),
            reason: Some("breakeven solver did not converge".to_string()),
        },
    };
    Ok(result)
}
