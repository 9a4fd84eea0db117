//! Single-tuple backtest: state machine fold, return composition, scoring.
//!
//! Each run is a pure function of (prepared series, EMA, profile, parameters),
//! so the optimizer can evaluate tuples on any thread.

use crate::domain::compositor::compose_returns;
use crate::domain::market_frame::PreparedSeries;
use crate::domain::metrics::{cumulative_multiple, Metrics};
use crate::domain::position::{next_position, DayInputs, Decision, TransitionRules};
use crate::domain::strategy::{StrategyParameters, StrategyProfile};

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub parameters: StrategyParameters,
    pub cumulative_multiple: f64,
    pub decisions: Vec<Decision>,
    pub positions: Vec<f64>,
    pub returns: Vec<f64>,
}

impl BacktestResult {
    pub fn final_decision(&self) -> Option<Decision> {
        self.decisions.last().copied()
    }

    pub fn metrics(&self, series: &PreparedSeries, leverage: f64) -> Metrics {
        let n = self.positions.len();
        Metrics::compute(
            &series.dates[..n],
            &self.positions,
            &self.returns,
            &series.underlying_return[..n],
            leverage,
        )
    }
}

/// Inputs seen by the state machine on row `t`.
pub fn day_inputs(
    series: &PreparedSeries,
    ema: &[f64],
    profile: &StrategyProfile,
    params: &StrategyParameters,
    t: usize,
) -> DayInputs {
    let macro_breached = match (&profile.macro_overlay, &series.macro_readings) {
        (Some(overlay), Some(readings)) => {
            let threshold = params.macro_threshold.unwrap_or(overlay.threshold);
            overlay.is_breached(readings[t], threshold)
        }
        _ => false,
    };
    DayInputs {
        price: series.close[t],
        ema: ema[t],
        rsi: series.rsi[t],
        volatility: series.volatility.as_ref().map(|v| v[t]),
        macro_breached,
    }
}

/// Fold the state machine over every row. Row 0 is seeded at 0.
pub fn decide_positions(
    series: &PreparedSeries,
    ema: &[f64],
    profile: &StrategyProfile,
    params: &StrategyParameters,
) -> Vec<Decision> {
    let n = series.len().min(ema.len());
    if n == 0 {
        return Vec::new();
    }
    let rules = TransitionRules::resolve(profile, params);

    let mut decisions = Vec::with_capacity(n);
    decisions.push(Decision::seed());
    decisions.extend((1..n).scan(0.0, |previous, t| {
        let inputs = day_inputs(series, ema, profile, params, t);
        let decision = next_position(&rules, &inputs, *previous);
        *previous = decision.position;
        Some(decision)
    }));
    decisions
}

pub fn run_backtest(
    series: &PreparedSeries,
    ema: &[f64],
    profile: &StrategyProfile,
    params: &StrategyParameters,
) -> BacktestResult {
    let decisions = decide_positions(series, ema, profile, params);
    let positions: Vec<f64> = decisions.iter().map(|d| d.position).collect();
    let returns = compose_returns(
        &decisions,
        &profile.ladder,
        &series.underlying_return,
        &series.cash_return,
        profile.leverage,
    );

    BacktestResult {
        parameters: *params,
        cumulative_multiple: cumulative_multiple(&returns),
        decisions,
        positions,
        returns,
    }
}
