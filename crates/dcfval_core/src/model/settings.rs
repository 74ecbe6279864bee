use serde::{Deserialize, Serialize};

use super::Distribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMode {
    #[serde(rename = "NPV")]
    Npv,
    #[serde(rename = "IRR")]
    Irr,
}

fn default_forecast_months() -> usize {
    60
}

fn default_discount_rate() -> Distribution {
    Distribution::fixed(0.10)
}

fn default_terminal_growth_rate() -> f64 {
    0.025
}

fn default_calculation_mode() -> CalculationMode {
    CalculationMode::Npv
}

/// Model-wide valuation settings. Rates are annual; the engine compounds
/// monthly at `rate / 12`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_forecast_months")]
    pub forecast_months: usize,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Distribution,
    #[serde(default = "default_terminal_growth_rate")]
    pub terminal_growth_rate: f64,
    /// Optional global escalation, compounded monthly from each stream's
    /// start; drawn once per pass in stochastic mode.
    #[serde(default)]
    pub escalation_rate: Option<Distribution>,
    #[serde(default = "default_calculation_mode")]
    pub calculation_mode: CalculationMode,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            forecast_months: default_forecast_months(),
            discount_rate: default_discount_rate(),
            terminal_growth_rate: default_terminal_growth_rate(),
            escalation_rate: None,
            calculation_mode: default_calculation_mode(),
        }
    }
}
