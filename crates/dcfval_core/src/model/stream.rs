use serde::{Deserialize, Serialize};

use super::Distribution;
use super::ids::StreamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    #[serde(rename = "REVENUE")]
    Revenue,
    #[serde(rename = "COST")]
    Cost,
}

fn default_conversion_rate() -> f64 {
    1.0
}

fn default_amount_is_ratio() -> bool {
    true
}

/// One revenue or cost item of a model.
///
/// Root streams derive their monthly base from `amount`, or from
/// `unit_value * market_units` when both are present (the pair wins and
/// `amount` may be a `FIXED 0` placeholder). Child streams echo their
/// parent's non-zero months through `conversion_rate`, `trigger_delay_months`
/// and `periodicity_months`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    #[serde(rename = "stream_type")]
    pub kind: StreamKind,
    /// First active month, 0-indexed inclusive
    pub start_month: usize,
    /// Last active month, inclusive; absent means perpetual
    #[serde(default)]
    pub end_month: Option<usize>,
    pub amount: Distribution,
    #[serde(default)]
    pub adoption_curve: Option<Distribution>,
    #[serde(default)]
    pub parent_stream_id: Option<StreamId>,
    #[serde(default = "default_conversion_rate")]
    pub conversion_rate: f64,
    #[serde(default)]
    pub trigger_delay_months: usize,
    #[serde(default)]
    pub periodicity_months: Option<usize>,
    /// When set, the child amount scales the parent's cashflow instead of
    /// being an absolute event value.
    #[serde(default = "default_amount_is_ratio")]
    pub amount_is_ratio: bool,
    #[serde(default)]
    pub unit_value: Option<Distribution>,
    #[serde(default)]
    pub market_units: Option<Distribution>,
}

impl Stream {
    pub fn is_root(&self) -> bool {
        self.parent_stream_id.is_none()
    }

    /// Whether the stream contributes a terminal value: active through the
    /// end of the forecast horizon.
    pub fn is_perpetual(&self, forecast_months: usize) -> bool {
        match self.end_month {
            None => true,
            Some(end) => end >= forecast_months,
        }
    }

    /// Exclusive end of the active window, clipped to the horizon.
    pub fn active_end(&self, forecast_months: usize) -> usize {
        self.end_month
            .map(|e| e + 1)
            .unwrap_or(forecast_months)
            .min(forecast_months)
    }

    /// True when the base is defined by the `unit_value * market_units` pair.
    pub fn uses_unit_economics(&self) -> bool {
        self.unit_value.is_some() && self.market_units.is_some()
    }
}
