//! Daily close series for one instrument, plus sparse dated observations.

use crate::domain::error::LevtraderError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// A single dated value from a macro series. Values may be negative
/// (yield-curve spreads invert).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Cleaned close history: non-empty, strictly increasing dates, finite
/// positive prices. Construction is the precondition gate for the core.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, LevtraderError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(LevtraderError::NoData { symbol });
        }

        for (row, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(LevtraderError::MalformedSeries {
                    symbol,
                    row,
                    reason: format!("close must be finite and positive, got {}", bar.close),
                });
            }
            if row > 0 && bar.date <= bars[row - 1].date {
                return Err(LevtraderError::MalformedSeries {
                    symbol,
                    row,
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        bar.date,
                        bars[row - 1].date
                    ),
                });
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// Simple daily return `v[t] / v[t-1] - 1`; undefined on the first row.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i == 0 {
                None
            } else {
                Some(v / values[i - 1] - 1.0)
            }
        })
        .collect()
}
