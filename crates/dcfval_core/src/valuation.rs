//! Valuation math: NPV, terminal value, IRR, payback
//!
//! All rates are annual; discounting compounds monthly at `rate / 12`.

use crate::error::IrrError;
use crate::model::{FinancialModel, StreamId};
use crate::optimization::find_root;

/// Monthly-rate bracket searched for the IRR.
const IRR_BRACKET: (f64, f64) = (-0.5, 10.0);
const IRR_XTOL: f64 = 1e-10;
const IRR_MAX_ITER: usize = 1000;

/// Net present value of a monthly cashflow vector at an annual rate.
pub fn npv(cashflows: &[f64], annual_rate: f64) -> f64 {
    npv_at_monthly_rate(cashflows, annual_rate / 12.0)
}

fn npv_at_monthly_rate(cashflows: &[f64], monthly_rate: f64) -> f64 {
    cashflows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + monthly_rate).powi(t as i32))
        .sum()
}

/// Streams that contribute a terminal value: active through the end of the
/// forecast horizon. Returned in the user-visible order.
pub fn perpetual_stream_ids(model: &FinancialModel) -> Vec<StreamId> {
    model
        .streams()
        .filter(|s| s.is_perpetual(model.settings.forecast_months))
        .map(|s| s.id.clone())
        .collect()
}

/// Present value of the Gordon-Growth perpetuity beyond the horizon:
/// `TV = cf * (1 + g) / (d - g)`, discounted back over the full forecast.
/// Contributes nothing when the discount rate does not clear the growth
/// rate, which would make the perpetuity divergent.
pub fn terminal_value(
    final_month_cashflow: f64,
    terminal_growth_rate: f64,
    discount_rate: f64,
    forecast_months: usize,
) -> f64 {
    if discount_rate <= terminal_growth_rate {
        return 0.0;
    }
    let tv = final_month_cashflow * (1.0 + terminal_growth_rate)
        / (discount_rate - terminal_growth_rate);
    let monthly_rate = discount_rate / 12.0;
    tv / (1.0 + monthly_rate).powi(forecast_months as i32)
}

/// Annualized internal rate of return: the rate at which the NPV of the
/// vector is zero. Solved on the monthly rate over `[-0.5, 10.0]` and
/// annualized by a factor of 12.
pub fn irr(cashflows: &[f64]) -> Result<f64, IrrError> {
    let has_positive = cashflows.iter().any(|cf| *cf > 0.0);
    let has_negative = cashflows.iter().any(|cf| *cf < 0.0);
    if !(has_positive && has_negative) {
        return Err(IrrError::NoSignChange);
    }

    find_root(
        |monthly| npv_at_monthly_rate(cashflows, monthly),
        IRR_BRACKET.0,
        IRR_BRACKET.1,
        IRR_XTOL,
        IRR_MAX_ITER,
    )
    .map(|monthly| monthly * 12.0)
    .map_err(IrrError::SolverFailed)
}

/// Split an IRR result into the `(value, reason)` pair carried on result
/// records.
pub fn irr_fields(result: Result<f64, IrrError>) -> (Option<f64>, Option<String>) {
    match result {
        Ok(rate) => (Some(rate), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

/// Smallest month at which the cumulative cashflow reaches zero, linearly
/// interpolated within the crossing month. `None` when the cumulative sum
/// never recovers.
pub fn payback_period(cashflows: &[f64]) -> Option<f64> {
    let mut cumulative = 0.0;
    for (month, cf) in cashflows.iter().enumerate() {
        let before = cumulative;
        cumulative += cf;
        if cumulative >= 0.0 {
            if before >= 0.0 {
                return Some(month as f64);
            }
            let fraction = -before / cf;
            return Some(month as f64 - 1.0 + fraction);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let cashflows = [100.0, 200.0, -50.0];
        assert!((npv(&cashflows, 0.0) - 250.0).abs() < 1e-12);
    }

    #[test]
    fn test_npv_discounts_monthly() {
        let cashflows = [0.0, 1010.0];
        // One month at 12% annual = 1% monthly
        assert!((npv(&cashflows, 0.12) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_value_gordon_growth() {
        // TV = 100 * 1.02 / 0.10 = 1020, discounted 60 months at 1%
        let pv = terminal_value(100.0, 0.02, 0.12, 60);
        let expected = 1020.0 / 1.01f64.powi(60);
        assert!((pv - expected).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_value_degenerate_rates() {
        assert_eq!(terminal_value(100.0, 0.05, 0.05, 60), 0.0);
        assert_eq!(terminal_value(100.0, 0.08, 0.05, 60), 0.0);
    }

    #[test]
    fn test_irr_consistency_with_npv() {
        let cashflows = [-1000.0, 300.0, 400.0, 500.0, 600.0];
        let rate = irr(&cashflows).unwrap();
        assert!(rate > 0.0);
        // The defining property: NPV at the IRR is zero
        assert!(
            npv(&cashflows, rate).abs() < 1e-4,
            "NPV at IRR was {}",
            npv(&cashflows, rate)
        );
    }

    #[test]
    fn test_irr_requires_sign_change() {
        assert_eq!(irr(&[100.0, 200.0, 300.0]), Err(IrrError::NoSignChange));
        assert_eq!(irr(&[-100.0, -200.0]), Err(IrrError::NoSignChange));
        assert_eq!(irr(&[0.0, 0.0]), Err(IrrError::NoSignChange));
    }

    #[test]
    fn test_payback_interpolates_crossing_month() {
        // Cumulative: -1000, -400, +200 -> crosses 2/3 into month 2
        let payback = payback_period(&[-1000.0, 600.0, 600.0]).unwrap();
        assert!((payback - (1.0 + 400.0 / 600.0)).abs() < 1e-12);

        // Positive from the start
        assert_eq!(payback_period(&[50.0, 50.0]), Some(0.0));

        // Never recovers
        assert_eq!(payback_period(&[-100.0, 10.0, 10.0]), None);
    }
}
