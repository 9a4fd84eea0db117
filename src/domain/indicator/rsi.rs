//! RSI (Relative Strength Index) with plain rolling-mean smoothing.
//!
//! gain = max(C[i] - C[i-1], 0), loss = max(C[i-1] - C[i], 0), each averaged
//! with a simple n-period rolling mean rather than Wilder's recursive
//! smoothing. RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//!
//! Degenerate windows: avg_loss == 0 with gains gives 100; a flat window
//! (no gains, no losses) gives 50.
//!
//! Warmup: first n rows are invalid (row 0 has no price change).

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 || closes.len() < 2 {
        return IndicatorSeries {
            indicator_type,
            values: vec![None; closes.len()],
        };
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(None);
    losses.push(None);
    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(Some(change.max(0.0)));
        losses.push(Some((-change).max(0.0)));
    }

    let avg_gain = rolling_mean(&gains, period, indicator_type);
    let avg_loss = rolling_mean(&losses, period, indicator_type);

    let values = avg_gain
        .values
        .iter()
        .zip(&avg_loss.values)
        .map(|(gain, loss)| Some(rsi_from_averages((*gain)?, (*loss)?)))
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
