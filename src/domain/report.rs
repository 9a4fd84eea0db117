//! Report model for the winning configuration. Rendering belongs to a
//! `ReportPort` adapter.

use crate::domain::backtest::BacktestResult;
use crate::domain::market_frame::PreparedSeries;
use crate::domain::metrics::Metrics;
use crate::domain::overlay::{MacroReading, VolatilityReading};
use crate::domain::position::{AssetMode, Decision, Reason, TransitionRules};
use crate::domain::strategy::{Ladder, StrategyParameters, StrategyProfile};
use chrono::NaiveDate;

/// What the final-day position means to a reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionLabel {
    /// Flat. The reason distinguishes a trend exit from an overlay veto.
    Cash { reason: Reason },
    /// Holding between the bottom and the top rung. `held_by_rsi` marks a
    /// rung that would have climbed but for the RSI or calm gate.
    Partial { fraction: f64, held_by_rsi: bool },
    Full,
    Capped { fraction: f64 },
    /// Hybrid ladder size and the leg it sits in for the next session.
    Hybrid { fraction: f64, leveraged: bool },
    Mode(AssetMode),
}

impl PositionLabel {
    pub fn from_decision(decision: Decision, ladder: &Ladder) -> Self {
        let position = decision.position;
        if let Ladder::ModeSwitch = ladder {
            return PositionLabel::Mode(AssetMode::from_level(position));
        }
        if decision.reason == Reason::MacroCap {
            return PositionLabel::Capped { fraction: position };
        }
        if position <= 0.0 {
            return PositionLabel::Cash {
                reason: decision.reason,
            };
        }
        if let Ladder::Hybrid { .. } = ladder {
            return PositionLabel::Hybrid {
                fraction: position,
                leveraged: !decision.spot,
            };
        }
        if position >= ladder.top() {
            return PositionLabel::Full;
        }
        PositionLabel::Partial {
            fraction: position,
            held_by_rsi: matches!(
                decision.reason,
                Reason::TopBlocked | Reason::OverheatRetreat
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityState {
    pub reading: VolatilityReading,
    pub panic_line: f64,
    pub panic: bool,
    pub calm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroState {
    pub reading: MacroReading,
    pub threshold: f64,
    pub breached: bool,
}

/// Final-day detail behind the recommended position.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub date: NaiveDate,
    pub price: f64,
    pub ema: f64,
    pub sell_line: f64,
    pub rsi: f64,
    pub position: f64,
    pub label: PositionLabel,
    pub volatility: Option<VolatilityState>,
    pub macro_state: Option<MacroState>,
}

#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub strategy_name: String,
    pub symbol: String,
    pub leverage: f64,
    pub ladder: Ladder,
    pub parameters: StrategyParameters,
    pub evaluated: usize,
    pub metrics: Metrics,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub positions: Vec<f64>,
    pub recommendation: Recommendation,
}

impl OptimizationReport {
    /// Returns `None` if the result holds no rows.
    pub fn build(
        profile: &StrategyProfile,
        series: &PreparedSeries,
        ema: &[f64],
        result: &BacktestResult,
        evaluated: usize,
    ) -> Option<Self> {
        let decision = result.final_decision()?;
        let n = result.positions.len();
        let last = n - 1;
        let params = result.parameters;

        let rules = TransitionRules::resolve(profile, &params);
        let volatility = match (rules.volatility, &series.volatility) {
            (Some(overlay), Some(readings)) => {
                let reading = readings[last];
                Some(VolatilityState {
                    reading,
                    panic_line: rules.panic_line,
                    panic: overlay.is_panic(reading, rules.panic_line),
                    calm: overlay.is_calm(reading),
                })
            }
            _ => None,
        };
        let macro_state = match (&profile.macro_overlay, &series.macro_readings) {
            (Some(overlay), Some(readings)) => {
                let reading = readings[last];
                let threshold = params.macro_threshold.unwrap_or(overlay.threshold);
                Some(MacroState {
                    reading,
                    threshold,
                    breached: overlay.is_breached(reading, threshold),
                })
            }
            _ => None,
        };

        let recommendation = Recommendation {
            date: series.dates[last],
            price: series.close[last],
            ema: ema[last],
            sell_line: ema[last] * (1.0 - params.sell_buffer),
            rsi: series.rsi[last],
            position: decision.position,
            label: PositionLabel::from_decision(decision, &profile.ladder),
            volatility,
            macro_state,
        };

        Some(Self {
            strategy_name: profile.name.clone(),
            symbol: profile.symbol.clone(),
            leverage: profile.leverage,
            ladder: profile.ladder.clone(),
            parameters: params,
            evaluated,
            metrics: result.metrics(series, profile.leverage),
            first_date: series.dates[0],
            last_date: series.dates[last],
            dates: series.dates[..n].to_vec(),
            positions: result.positions.clone(),
            recommendation,
        })
    }
}
