//! Monte Carlo driver behavior: aggregation, reproducibility, failure
//! counting and the discount-rate clamp

use crate::model::{
    CalculationMode, Distribution, FinancialModel, ModelSettings, MonteCarloConfig, Stream,
    StreamId, StreamKind,
};
use crate::simulation::{run_deterministic, run_monte_carlo};

fn stream(id: &str, kind: StreamKind, amount: Distribution) -> Stream {
    Stream {
        id: StreamId::from(id),
        name: id.to_string(),
        kind,
        start_month: 0,
        end_month: None,
        amount,
        adoption_curve: None,
        parent_stream_id: None,
        conversion_rate: 1.0,
        trigger_delay_months: 0,
        periodicity_months: None,
        amount_is_ratio: true,
        unit_value: None,
        market_units: None,
    }
}

fn npv_settings(forecast_months: usize) -> ModelSettings {
    ModelSettings {
        forecast_months,
        discount_rate: Distribution::fixed(0.12),
        terminal_growth_rate: 0.0,
        escalation_rate: None,
        calculation_mode: CalculationMode::Npv,
    }
}

fn config(n_simulations: usize) -> MonteCarloConfig {
    MonteCarloConfig { n_simulations }
}

#[test]
fn test_fully_fixed_model_collapses_to_deterministic() {
    let mut model = FinancialModel::new("fixed", npv_settings(12));
    let mut r = stream("r", StreamKind::Revenue, Distribution::fixed(1000.0));
    r.end_month = Some(11);
    model.add_stream(r).unwrap();

    let deterministic = run_deterministic(&model).unwrap();
    let mc = run_monte_carlo(&model, &config(250), 7).unwrap();

    assert_eq!(mc.n_simulations, 250);
    assert_eq!(mc.npv_samples.len(), 250);
    let stats = mc.npv.unwrap();
    assert!((stats.mean - deterministic.npv).abs() < 1e-9);
    assert!(stats.std_dev < 1e-9);
    assert_eq!(stats.p10, stats.p90);

    assert_eq!(mc.cashflow_distributions.len(), 12);
    for month in &mc.cashflow_distributions {
        assert_eq!(month.p10, month.p90);
        assert!((month.mean - 1000.0).abs() < 1e-9);
    }
}

#[test]
fn test_same_seed_reproduces_samples() {
    let mut model = FinancialModel::new("seeded", npv_settings(24));
    let mut r = stream(
        "r",
        StreamKind::Revenue,
        Distribution::Normal {
            mean: 1000.0,
            std: 100.0,
        },
    );
    r.end_month = Some(23);
    model.add_stream(r).unwrap();

    let first = run_monte_carlo(&model, &config(300), 1234).unwrap();
    let second = run_monte_carlo(&model, &config(300), 1234).unwrap();
    assert_eq!(first.npv_samples, second.npv_samples);

    let other_seed = run_monte_carlo(&model, &config(300), 4321).unwrap();
    assert_ne!(first.npv_samples, other_seed.npv_samples);
}

#[test]
fn test_stochastic_mean_tracks_deterministic() {
    let mut model = FinancialModel::new("tracking", npv_settings(12));
    let mut r = stream(
        "r",
        StreamKind::Revenue,
        Distribution::Normal {
            mean: 1000.0,
            std: 100.0,
        },
    );
    r.end_month = Some(11);
    model.add_stream(r).unwrap();

    let deterministic = run_deterministic(&model).unwrap();
    let mc = run_monte_carlo(&model, &config(2000), 42).unwrap();
    let stats = mc.npv.unwrap();

    // The amount is symmetric around its mean, so the sample mean should
    // sit near the deterministic NPV (7+ sigma margin on the mean)
    assert!(
        (stats.mean - deterministic.npv).abs() < 50.0,
        "mean {} strayed from {}",
        stats.mean,
        deterministic.npv
    );
    assert!(stats.std_dev > 0.0);
    assert!(stats.p10 < stats.median && stats.median < stats.p90);
}

#[test]
fn test_irr_mode_aggregates_and_counts_failures() {
    let mut settings = npv_settings(12);
    settings.calculation_mode = CalculationMode::Irr;
    let mut model = FinancialModel::new("irr-mc", settings);
    let mut invest = stream("invest", StreamKind::Cost, Distribution::fixed(1000.0));
    invest.end_month = Some(0);
    model.add_stream(invest).unwrap();
    let mut returns = stream(
        "returns",
        StreamKind::Revenue,
        Distribution::Normal {
            mean: 300.0,
            std: 30.0,
        },
    );
    returns.start_month = 1;
    returns.end_month = Some(11);
    model.add_stream(returns).unwrap();

    let mc = run_monte_carlo(&model, &config(200), 5).unwrap();
    assert_eq!(mc.calculation_mode, CalculationMode::Irr);
    assert_eq!(mc.irr_failed_count, 0);
    assert_eq!(mc.irr_samples.len(), 200);
    assert!(mc.npv.is_none());
    let stats = mc.irr.unwrap();
    assert!(stats.mean > 0.0);
}

#[test]
fn test_irr_mode_all_failures() {
    let mut settings = npv_settings(12);
    settings.calculation_mode = CalculationMode::Irr;
    let mut model = FinancialModel::new("no-irr", settings);
    let mut r = stream("r", StreamKind::Revenue, Distribution::fixed(1000.0));
    r.end_month = Some(11);
    model.add_stream(r).unwrap();

    // All-positive cashflows have no IRR; the run still completes
    let mc = run_monte_carlo(&model, &config(150), 3).unwrap();
    assert_eq!(mc.irr_failed_count, 150);
    assert!(mc.irr_samples.is_empty());
    assert!(mc.irr.is_none());
}

#[test]
fn test_discount_clamp_is_counted() {
    let mut settings = npv_settings(24);
    // Roughly 2% of draws land at or below the growth rate
    settings.discount_rate = Distribution::Normal {
        mean: 0.021,
        std: 0.0005,
    };
    settings.terminal_growth_rate = 0.02;
    let mut model = FinancialModel::new("clamped", settings);
    model
        .add_stream(stream("r", StreamKind::Revenue, Distribution::fixed(100.0)))
        .unwrap();

    let mc = run_monte_carlo(&model, &config(1000), 9).unwrap();
    assert!(
        mc.clamped_discount_samples > 0,
        "expected at least one clamped draw"
    );
    // Clamping keeps every NPV finite despite the divergent-perpetuity zone
    assert!(mc.npv_samples.iter().all(|v| v.is_finite()));
}

#[test]
fn test_payback_aggregation() {
    let mut model = FinancialModel::new("payback-mc", npv_settings(12));
    let mut invest = stream("invest", StreamKind::Cost, Distribution::fixed(1000.0));
    invest.end_month = Some(0);
    model.add_stream(invest).unwrap();
    let mut returns = stream(
        "returns",
        StreamKind::Revenue,
        Distribution::Normal {
            mean: 600.0,
            std: 20.0,
        },
    );
    returns.start_month = 1;
    returns.end_month = Some(11);
    model.add_stream(returns).unwrap();

    let mc = run_monte_carlo(&model, &config(200), 6).unwrap();
    assert_eq!(mc.payback_achieved_count, 200);
    let stats = mc.payback.unwrap();
    assert!((stats.mean - 1.67).abs() < 0.2, "payback mean {}", stats.mean);
}
