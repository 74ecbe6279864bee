//! Sampling policies
//!
//! The builder never consults global state to decide how a distribution
//! resolves: the policy is an explicit parameter. This is what makes the
//! tornado's override/restore pattern and Monte Carlo's iteration
//! independence expressible — an override run is just a pass with a
//! different policy, and the model itself is never touched.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Distribution, StreamId};

/// Identifies one distribution slot in a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterRef {
    DiscountRate,
    EscalationRate,
    Amount(StreamId),
    UnitValue(StreamId),
    MarketUnits(StreamId),
    AdoptionCurve(StreamId),
}

/// How distribution draws resolve during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingPolicy {
    /// Every slot resolves to its expected value
    Deterministic,
    /// Every slot draws fresh randomness
    Stochastic,
    /// One slot resolves to a fixed scalar; every other slot resolves
    /// deterministically
    FixedOverride { target: ParameterRef, value: f64 },
}

impl SamplingPolicy {
    pub fn fixed_override(target: ParameterRef, value: f64) -> Self {
        SamplingPolicy::FixedOverride { target, value }
    }

    /// Resolve the distribution sitting in `slot` under this policy.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        slot: &ParameterRef,
        dist: &Distribution,
        month: Option<usize>,
        rng: &mut R,
    ) -> Result<f64, ConfigError> {
        match self {
            SamplingPolicy::Deterministic => Ok(dist.deterministic(month)),
            SamplingPolicy::Stochastic => dist.sample(rng, month),
            SamplingPolicy::FixedOverride { target, value } if target == slot => Ok(*value),
            SamplingPolicy::FixedOverride { .. } => Ok(dist.deterministic(month)),
        }
    }
}
