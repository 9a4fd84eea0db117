//! Scoring and performance metrics.
//!
//! The optimizer scores by cumulative multiple only. CAGR, drawdown and the
//! exposure figures are computed once for the winning tuple.

use chrono::NaiveDate;
use std::fmt;

const DAYS_PER_YEAR: f64 = 365.25;

/// Value substituted for an undefined CAGR when a number is needed.
pub const INVALID_CAGR_FALLBACK: f64 = -0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cagr {
    Valid(f64),
    /// Non-positive multiple or an empty date span.
    Invalid,
}

impl Cagr {
    pub fn value(self) -> f64 {
        match self {
            Cagr::Valid(v) => v,
            Cagr::Invalid => INVALID_CAGR_FALLBACK,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Cagr::Valid(_))
    }
}

impl fmt::Display for Cagr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cagr::Valid(v) => write!(f, "{:.2}%", v * 100.0),
            Cagr::Invalid => write!(f, "{:.2}% (invalid)", INVALID_CAGR_FALLBACK * 100.0),
        }
    }
}

/// Product of `1 + r` over every day.
pub fn cumulative_multiple(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r))
}

/// Running product of `1 + r`.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

pub fn compute_cagr(multiple: f64, first: NaiveDate, last: NaiveDate) -> Cagr {
    let years = (last - first).num_days() as f64 / DAYS_PER_YEAR;
    if years <= 0.0 || !multiple.is_finite() || multiple <= 0.0 {
        return Cagr::Invalid;
    }
    Cagr::Valid(multiple.powf(1.0 / years) - 1.0)
}

/// Worst peak-to-trough decline of the equity curve, as a non-positive
/// fraction. A non-positive running max counts as a total loss (-1.0).
pub fn compute_max_drawdown(returns: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for equity in equity_curve(returns) {
        peak = peak.max(equity);
        let dd = if peak > 0.0 {
            (equity - peak) / peak
        } else {
            -1.0
        };
        worst = worst.min(dd);
    }
    worst
}

/// Multiple of holding the leveraged proxy for the whole span. Row 0 is
/// excluded to match the strategy's first-day lag.
pub fn buy_and_hold_multiple(underlying: &[f64], leverage: f64) -> f64 {
    underlying
        .iter()
        .skip(1)
        .fold(1.0, |acc, r| acc * (1.0 + r * leverage))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub cumulative_multiple: f64,
    pub cagr: Cagr,
    pub max_drawdown: f64,
    pub years: f64,
    /// Fraction of days with a non-zero position.
    pub exposure: f64,
    pub position_changes: usize,
    pub benchmark_multiple: f64,
}

impl Metrics {
    pub fn compute(
        dates: &[NaiveDate],
        positions: &[f64],
        returns: &[f64],
        underlying: &[f64],
        leverage: f64,
    ) -> Self {
        let cumulative_multiple = cumulative_multiple(returns);
        let (cagr, years) = match (dates.first(), dates.last()) {
            (Some(&first), Some(&last)) => (
                compute_cagr(cumulative_multiple, first, last),
                (last - first).num_days() as f64 / DAYS_PER_YEAR,
            ),
            _ => (Cagr::Invalid, 0.0),
        };

        let exposure = if positions.is_empty() {
            0.0
        } else {
            positions.iter().filter(|&&p| p > 0.0).count() as f64 / positions.len() as f64
        };
        let position_changes = positions.windows(2).filter(|w| w[0] != w[1]).count();

        Self {
            cumulative_multiple,
            cagr,
            max_drawdown: compute_max_drawdown(returns),
            years,
            exposure,
            position_changes,
            benchmark_multiple: buy_and_hold_multiple(underlying, leverage),
        }
    }
}
