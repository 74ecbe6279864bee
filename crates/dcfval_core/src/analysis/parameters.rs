//! Enumeration of uncertain model parameters
//!
//! An uncertain parameter is any distribution slot whose kind is genuinely
//! stochastic. The time-dependent kinds are deterministic month-indexed
//! functions: their P10 equals their P90 equals their value, so they are
//! not treated as random variables here.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::error::ConfigError;
use crate::model::{Distribution, FinancialModel, Stream, StreamId};
use crate::sampling::ParameterRef;

/// Seed for the empirical percentile draws, fixed so that repeated
/// enumerations of the same model agree.
const PERCENTILE_SEED: u64 = 0x9e3779b9;

pub(crate) const SETTINGS_STREAM_NAME: &str = "Model Settings";

/// One uncertain distribution slot with its current quantiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertainParameter {
    /// `None` for model-settings slots
    pub stream_id: Option<StreamId>,
    pub stream_name: String,
    pub parameter_name: String,
    pub target: ParameterRef,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

/// Display label for a stream's amount slot: child ratio amounts read as
/// price ratios.
pub(crate) fn amount_label(stream: &Stream) -> String {
    if stream.parent_stream_id.is_some() && stream.amount_is_ratio {
        format!("{} - Price Ratio", stream.name)
    } else {
        format!("{} - Amount", stream.name)
    }
}

fn quantiles(
    dist: &Distribution,
    rng: &mut SmallRng,
) -> Result<(f64, f64, f64), ConfigError> {
    Ok((
        dist.percentile(rng, 0.10)?,
        dist.percentile(rng, 0.50)?,
        dist.percentile(rng, 0.90)?,
    ))
}

/// Every stochastic distribution slot in the model, in a stable order:
/// settings first, then streams in their user-visible order.
pub fn uncertain_parameters(
    model: &FinancialModel,
) -> Result<Vec<UncertainParameter>, ConfigError> {
    let mut rng = SmallRng::seed_from_u64(PERCENTILE_SEED);
    let mut parameters = Vec::new();

    let push = |parameters: &mut Vec<UncertainParameter>,
                    stream_id: Option<StreamId>,
                    stream_name: &str,
                    parameter_name: String,
                    target: ParameterRef,
                    dist: &Distribution,
                    rng: &mut SmallRng|
     -> Result<(), ConfigError> {
        if !dist.is_stochastic() {
            return Ok(());
        }
        let (p10, p50, p90) = quantiles(dist, rng)?;
        parameters.push(UncertainParameter {
            stream_id,
            stream_name: stream_name.to_string(),
            parameter_name,
            target,
            p10,
            p50,
            p90,
        });
        Ok(())
    };

    push(
        &mut parameters,
        None,
        SETTINGS_STREAM_NAME,
        "Discount Rate".to_string(),
        ParameterRef::DiscountRate,
        &model.settings.discount_rate,
        &mut rng,
    )?;
    if let Some(escalation) = &model.settings.escalation_rate {
        push(
            &mut parameters,
            None,
            SETTINGS_STREAM_NAME,
            "Escalation Rate".to_string(),
            ParameterRef::EscalationRate,
            escalation,
            &mut rng,
        )?;
    }

    for stream in model.streams() {
        if stream.uses_unit_economics() {
            // Unit-economics mode: the plain amount is a placeholder
            if let Some(unit_value) = &stream.unit_value {
                push(
                    &mut parameters,
                    Some(stream.id.clone()),
                    &stream.name,
                    format!("{} - Unit Value", stream.name),
                    ParameterRef::UnitValue(stream.id.clone()),
                    unit_value,
                    &mut rng,
                )?;
            }
            if let Some(market_units) = &stream.market_units {
                push(
                    &mut parameters,
                    Some(stream.id.clone()),
                    &stream.name,
                    format!("{} - Market Units", stream.name),
                    ParameterRef::MarketUnits(stream.id.clone()),
                    market_units,
                    &mut rng,
                )?;
            }
        } else {
            push(
                &mut parameters,
                Some(stream.id.clone()),
                &stream.name,
                amount_label(stream),
                ParameterRef::Amount(stream.id.clone()),
                &stream.amount,
                &mut rng,
            )?;
        }
        if let Some(curve) = &stream.adoption_curve {
            push(
                &mut parameters,
                Some(stream.id.clone()),
                &stream.name,
                format!("{} - Adoption Curve", stream.name),
                ParameterRef::AdoptionCurve(stream.id.clone()),
                curve,
                &mut rng,
            )?;
        }
    }

    Ok(parameters)
}
