//! Simple rolling mean.
//!
//! Warmup: first (n-1) rows are invalid. Rows whose window contains an
//! undefined input stay invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_sma(values: &[f64], period: usize) -> IndicatorSeries {
    let optional: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    rolling_mean(&optional, period, IndicatorType::Sma(period))
}

pub(crate) fn rolling_mean(
    values: &[Option<f64>],
    period: usize,
    indicator_type: IndicatorType,
) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: vec![None; values.len()],
        };
    }

    let out = (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let sum = window.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x))?;
            Some(sum / period as f64)
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values: out,
    }
}
