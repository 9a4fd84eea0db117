//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first observation (no SMA warm-up),
//! then EMA[i] = EMA[i-1] + k*(C[i] - EMA[i-1]). Every row is valid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_ema(values: &[f64], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: ema_values(values, period).into_iter().map(Some).collect(),
    }
}

/// Raw EMA values; used directly by the grid search where every row is valid.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &value in &values[1..] {
        ema += k * (value - ema);
        out.push(ema);
    }

    out
}
