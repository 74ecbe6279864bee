//! Probability distributions driving stream amounts and rates
//!
//! Five kinds are genuinely stochastic (`FIXED` degenerately so); the two
//! time-dependent kinds (`LOGISTIC`, `LINEAR`) are deterministic
//! month-indexed functions that share the distribution interface so that
//! adoption curves can live in the same slots as amounts. Their "sample"
//! never draws randomness.
//!
//! The serialized form is `{"type": "<KIND>", "params": {...}}`; the
//! uppercase kind names and parameter keys are part of the document
//! contract.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stats;

/// Number of draws behind an empirical percentile estimate.
const PERCENTILE_DRAWS: usize = 10_000;

/// Number of draws per month behind a stochastic preview band.
const PREVIEW_DRAWS: usize = 500;

fn default_amplitude() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Distribution {
    #[serde(rename = "FIXED")]
    Fixed { value: f64 },
    #[serde(rename = "NORMAL")]
    Normal { mean: f64, std: f64 },
    /// Parameters are in log space: a draw is `exp(Normal(mean, std))`.
    #[serde(rename = "LOGNORMAL")]
    LogNormal { mean: f64, std: f64 },
    #[serde(rename = "UNIFORM")]
    Uniform { min: f64, max: f64 },
    #[serde(rename = "TRIANGULAR")]
    Triangular { min: f64, likely: f64, max: f64 },
    /// Incremental adoption: the derivative of the logistic S-curve at the
    /// given month, scaled by `amplitude`.
    #[serde(rename = "LOGISTIC")]
    Logistic {
        midpoint: f64,
        steepness: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
    #[serde(rename = "LINEAR")]
    Linear {
        rate: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
}

impl Distribution {
    pub fn fixed(value: f64) -> Self {
        Distribution::Fixed { value }
    }

    /// The uppercase wire name of this kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Distribution::Fixed { .. } => "FIXED",
            Distribution::Normal { .. } => "NORMAL",
            Distribution::LogNormal { .. } => "LOGNORMAL",
            Distribution::Uniform { .. } => "UNIFORM",
            Distribution::Triangular { .. } => "TRIANGULAR",
            Distribution::Logistic { .. } => "LOGISTIC",
            Distribution::Linear { .. } => "LINEAR",
        }
    }

    /// True for kinds where a draw is genuinely random.
    pub fn is_stochastic(&self) -> bool {
        matches!(
            self,
            Distribution::Normal { .. }
                | Distribution::LogNormal { .. }
                | Distribution::Uniform { .. }
                | Distribution::Triangular { .. }
        )
    }

    /// True for the month-indexed deterministic kinds.
    pub fn is_time_dependent(&self) -> bool {
        matches!(self, Distribution::Logistic { .. } | Distribution::Linear { .. })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidDistribution {
            kind: self.kind(),
            reason,
        };
        match *self {
            Distribution::Fixed { value } => {
                if !value.is_finite() {
                    return Err(invalid("value must be finite"));
                }
            }
            Distribution::Normal { mean, std } | Distribution::LogNormal { mean, std } => {
                if !mean.is_finite() || !std.is_finite() {
                    return Err(invalid("mean and std must be finite"));
                }
                if std < 0.0 {
                    return Err(invalid("std must be non-negative"));
                }
            }
            Distribution::Uniform { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(invalid("min and max must be finite"));
                }
                if min > max {
                    return Err(invalid("min must not exceed max"));
                }
            }
            Distribution::Triangular { min, likely, max } => {
                if !min.is_finite() || !likely.is_finite() || !max.is_finite() {
                    return Err(invalid("min, likely and max must be finite"));
                }
                if !(min <= likely && likely <= max) {
                    return Err(invalid("parameters must satisfy min <= likely <= max"));
                }
            }
            Distribution::Logistic {
                midpoint,
                steepness,
                amplitude,
            } => {
                if !midpoint.is_finite() || !steepness.is_finite() || !amplitude.is_finite() {
                    return Err(invalid("parameters must be finite"));
                }
            }
            Distribution::Linear { rate, amplitude } => {
                if !rate.is_finite() || !amplitude.is_finite() {
                    return Err(invalid("parameters must be finite"));
                }
            }
        }
        Ok(())
    }

    /// Draw a value. Stochastic kinds ignore `month`; the time-dependent
    /// kinds use it and expose no randomness. Callers that need a
    /// time-indexed value must always pass `month`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        month: Option<usize>,
    ) -> Result<f64, ConfigError> {
        match *self {
            Distribution::Fixed { value } => Ok(value),
            Distribution::Normal { mean, std } => rand_distr::Normal::new(mean, std)
                .map(|d| d.sample(rng))
                .map_err(|_| ConfigError::InvalidDistribution {
                    kind: "NORMAL",
                    reason: "std must be non-negative and finite",
                }),
            Distribution::LogNormal { mean, std } => rand_distr::LogNormal::new(mean, std)
                .map(|d| d.sample(rng))
                .map_err(|_| ConfigError::InvalidDistribution {
                    kind: "LOGNORMAL",
                    reason: "std must be non-negative and finite",
                }),
            Distribution::Uniform { min, max } => {
                if !(min <= max) {
                    return Err(ConfigError::InvalidDistribution {
                        kind: "UNIFORM",
                        reason: "min must not exceed max",
                    });
                }
                if min == max {
                    Ok(min)
                } else {
                    Ok(rng.random_range(min..=max))
                }
            }
            Distribution::Triangular { min, likely, max } => {
                if min == max {
                    return Ok(min);
                }
                rand_distr::Triangular::new(min, max, likely)
                    .map(|d| d.sample(rng))
                    .map_err(|_| ConfigError::InvalidDistribution {
                        kind: "TRIANGULAR",
                        reason: "parameters must satisfy min <= likely <= max",
                    })
            }
            Distribution::Logistic { .. } | Distribution::Linear { .. } => {
                Ok(self.deterministic(month))
            }
        }
    }

    /// The expected (or defining) value, as used by deterministic passes.
    pub fn deterministic(&self, month: Option<usize>) -> f64 {
        match *self {
            Distribution::Fixed { value } => value,
            Distribution::Normal { mean, .. } => mean,
            Distribution::LogNormal { mean, std } => (mean + std * std / 2.0).exp(),
            Distribution::Uniform { min, max } => (min + max) / 2.0,
            Distribution::Triangular { min, likely, max } => (min + likely + max) / 3.0,
            Distribution::Logistic {
                midpoint,
                steepness,
                amplitude,
            } => match month {
                Some(m) => {
                    let s = 1.0 / (1.0 + (-steepness * (m as f64 - midpoint)).exp());
                    amplitude * steepness * s * (1.0 - s)
                }
                None => 0.0,
            },
            Distribution::Linear { rate, amplitude } => amplitude * rate,
        }
    }

    /// Quantile at `p` in `[0, 1]`. Deterministic kinds return their
    /// defining value; stochastic kinds report the empirical quantile of
    /// 10 000 draws.
    pub fn percentile<R: Rng + ?Sized>(&self, rng: &mut R, p: f64) -> Result<f64, ConfigError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::PercentileOutOfRange(p));
        }
        if !self.is_stochastic() {
            return Ok(self.deterministic(None));
        }
        let mut samples = Vec::with_capacity(PERCENTILE_DRAWS);
        for _ in 0..PERCENTILE_DRAWS {
            samples.push(self.sample(rng, None)?);
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(stats::percentile(&samples, p))
    }

    /// Lazy month-by-month preview over `[0, horizon)`. Months outside
    /// `[start_month, end_month]` yield zero. The iterator is restartable:
    /// cloning it before consumption replays the identical sequence.
    pub fn preview(
        &self,
        start_month: usize,
        end_month: Option<usize>,
        horizon: usize,
        seed: u64,
    ) -> Result<Preview, ConfigError> {
        self.validate()?;
        // end_month is inclusive; absent means through the horizon
        let active_end = end_month.map(|e| e + 1).unwrap_or(horizon);
        Ok(Preview {
            distribution: self.clone(),
            start_month,
            active_end,
            horizon,
            month: 0,
            rng: SmallRng::seed_from_u64(seed),
        })
    }
}

/// One point of a distribution preview
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreviewPoint {
    Value {
        month: usize,
        value: f64,
    },
    Band {
        month: usize,
        mean: f64,
        p10: f64,
        p90: f64,
    },
}

/// Finite, restartable preview sequence produced by [`Distribution::preview`]
#[derive(Debug, Clone)]
pub struct Preview {
    distribution: Distribution,
    start_month: usize,
    active_end: usize,
    horizon: usize,
    month: usize,
    rng: SmallRng,
}

impl Preview {
    fn band(&mut self, month: usize) -> PreviewPoint {
        let mut samples = Vec::with_capacity(PREVIEW_DRAWS);
        for _ in 0..PREVIEW_DRAWS {
            // params were validated when the preview was created
            samples.push(self.distribution.sample(&mut self.rng, None).unwrap_or(0.0));
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        PreviewPoint::Band {
            month,
            mean: stats::mean(&samples),
            p10: stats::percentile(&samples, 0.10),
            p90: stats::percentile(&samples, 0.90),
        }
    }
}

impl Iterator for Preview {
    type Item = PreviewPoint;

    fn next(&mut self) -> Option<PreviewPoint> {
        if self.month >= self.horizon {
            return None;
        }
        let m = self.month;
        self.month += 1;
        let active = m >= self.start_month && m < self.active_end;

        let point = if self.distribution.is_stochastic() {
            if active {
                self.band(m)
            } else {
                PreviewPoint::Band {
                    month: m,
                    mean: 0.0,
                    p10: 0.0,
                    p90: 0.0,
                }
            }
        } else {
            let value = if active {
                self.distribution.deterministic(Some(m))
            } else {
                0.0
            };
            PreviewPoint::Value { month: m, value }
        };
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.horizon - self.month;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Preview {}
