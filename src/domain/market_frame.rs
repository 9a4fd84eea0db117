//! Date-aligned market frame and the indicator-augmented series the
//! backtest consumes.
//!
//! `MarketFrame::join` inner-joins the instrument with its auxiliary series on
//! the trading-day index. `MarketFrame::prepare` derives returns and
//! indicators, then drops every row where any of them is still warming up.

use crate::domain::error::LevtraderError;
use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::IndicatorType;
use crate::domain::overlay::{MacroReading, MacroSignal, VolatilityReading};
use crate::domain::price_series::{pct_change, Observation, PriceSeries};
use crate::domain::strategy::StrategyProfile;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Fewest prepared rows that still yield one realized return.
pub const MIN_PREPARED_ROWS: usize = 2;

#[derive(Debug, Clone)]
pub struct MarketFrame {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub cash_close: Option<Vec<f64>>,
    pub volatility: Option<Vec<f64>>,
    /// Forward-filled macro level; `None` before the first observation.
    pub macro_values: Option<Vec<Option<f64>>>,
}

impl MarketFrame {
    pub fn join(
        instrument: &PriceSeries,
        cash: Option<&PriceSeries>,
        volatility: Option<&PriceSeries>,
        macro_observations: Option<&[Observation]>,
    ) -> Result<Self, LevtraderError> {
        let cash_index = cash.map(date_index);
        let vol_index = volatility.map(date_index);

        let mut dates = Vec::with_capacity(instrument.len());
        let mut close = Vec::with_capacity(instrument.len());
        let mut cash_close = cash.map(|_| Vec::with_capacity(instrument.len()));
        let mut vol_close = volatility.map(|_| Vec::with_capacity(instrument.len()));

        for bar in instrument.bars() {
            let cash_value = match &cash_index {
                Some(index) => match index.get(&bar.date) {
                    Some(&v) => Some(v),
                    None => continue,
                },
                None => None,
            };
            let vol_value = match &vol_index {
                Some(index) => match index.get(&bar.date) {
                    Some(&v) => Some(v),
                    None => continue,
                },
                None => None,
            };

            dates.push(bar.date);
            close.push(bar.close);
            if let (Some(column), Some(v)) = (cash_close.as_mut(), cash_value) {
                column.push(v);
            }
            if let (Some(column), Some(v)) = (vol_close.as_mut(), vol_value) {
                column.push(v);
            }
        }

        if dates.is_empty() {
            return Err(LevtraderError::NoData {
                symbol: format!("{} (no dates shared with auxiliary series)", instrument.symbol()),
            });
        }

        let dropped = instrument.len() - dates.len();
        if dropped > 0 {
            log::warn!(
                "{}: {} trading days missing from auxiliary series were dropped",
                instrument.symbol(),
                dropped
            );
        }

        let macro_values = macro_observations.map(|obs| forward_fill(&dates, obs));

        Ok(Self {
            symbol: instrument.symbol().to_string(),
            dates,
            close,
            cash_close,
            volatility: vol_close,
            macro_values,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Derive returns and indicators for `profile`, keeping only rows where
    /// every derived value is defined.
    pub fn prepare(&self, profile: &StrategyProfile) -> Result<PreparedSeries, LevtraderError> {
        let n = self.len();
        let underlying_return = pct_change(&self.close);
        let cash_return = match &self.cash_close {
            Some(column) => pct_change(column),
            None => vec![Some(0.0); n],
        };
        let rsi = calculate_rsi(&self.close, profile.rsi_period);

        let volatility: Option<Vec<Option<VolatilityReading>>> = match &profile.volatility {
            Some(overlay) => {
                let column = self.volatility.as_ref().ok_or_else(|| LevtraderError::NoData {
                    symbol: overlay.symbol.clone(),
                })?;
                let average = ema_values(column, overlay.ma_span);
                Some(
                    column
                        .iter()
                        .enumerate()
                        .map(|(i, &value)| {
                            average
                                .get(i)
                                .map(|&average| VolatilityReading { value, average })
                        })
                        .collect(),
                )
            }
            None => None,
        };

        let macro_readings: Option<Vec<Option<MacroReading>>> = match &profile.macro_overlay {
            Some(overlay) => {
                let column = self.macro_values.as_ref().ok_or_else(|| LevtraderError::NoData {
                    symbol: overlay.series.clone(),
                })?;
                let readings = macro_readings(column, overlay.signal);
                Some(shift(&readings, overlay.lag))
            }
            None => None,
        };

        let mut prepared = PreparedSeries {
            symbol: self.symbol.clone(),
            dates: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            underlying_return: Vec::with_capacity(n),
            cash_return: Vec::with_capacity(n),
            rsi: Vec::with_capacity(n),
            volatility: volatility.as_ref().map(|_| Vec::with_capacity(n)),
            macro_readings: macro_readings.as_ref().map(|_| Vec::with_capacity(n)),
        };

        for i in 0..n {
            let (Some(ret), Some(cash), Some(rsi_value)) =
                (underlying_return[i], cash_return[i], rsi.get(i))
            else {
                continue;
            };
            let vol = match &volatility {
                Some(column) => match column[i] {
                    Some(reading) => Some(reading),
                    None => continue,
                },
                None => None,
            };
            let mac = match &macro_readings {
                Some(column) => match column[i] {
                    Some(reading) => Some(reading),
                    None => continue,
                },
                None => None,
            };

            prepared.dates.push(self.dates[i]);
            prepared.close.push(self.close[i]);
            prepared.underlying_return.push(ret);
            prepared.cash_return.push(cash);
            prepared.rsi.push(rsi_value);
            if let (Some(out), Some(reading)) = (prepared.volatility.as_mut(), vol) {
                out.push(reading);
            }
            if let (Some(out), Some(reading)) = (prepared.macro_readings.as_mut(), mac) {
                out.push(reading);
            }
        }

        if prepared.len() < MIN_PREPARED_ROWS {
            return Err(LevtraderError::InsufficientData {
                symbol: self.symbol.clone(),
                rows: prepared.len(),
                minimum: MIN_PREPARED_ROWS,
            });
        }

        log::debug!(
            "{}: prepared {} of {} rows ({} to {})",
            self.symbol,
            prepared.len(),
            n,
            prepared.dates[0],
            prepared.dates[prepared.len() - 1]
        );

        Ok(prepared)
    }
}

/// Fully defined, date-aligned inputs for the backtest. Read-only once built.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub underlying_return: Vec<f64>,
    pub cash_return: Vec<f64>,
    pub rsi: Vec<f64>,
    pub volatility: Option<Vec<VolatilityReading>>,
    pub macro_readings: Option<Vec<MacroReading>>,
}

impl PreparedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// EMA of the prepared closes. Seeded at the first prepared row.
    pub fn ema(&self, period: usize) -> Vec<f64> {
        ema_values(&self.close, period)
    }
}

fn date_index(series: &PriceSeries) -> HashMap<NaiveDate, f64> {
    series.bars().iter().map(|b| (b.date, b.close)).collect()
}

/// Latest observation dated on or before each trading day.
fn forward_fill(dates: &[NaiveDate], observations: &[Observation]) -> Vec<Option<f64>> {
    let mut sorted: Vec<Observation> = observations
        .iter()
        .copied()
        .filter(|o| o.value.is_finite())
        .collect();
    sorted.sort_by_key(|o| o.date);

    let mut out = Vec::with_capacity(dates.len());
    let mut cursor = 0;
    let mut current = None;
    for date in dates {
        while cursor < sorted.len() && sorted[cursor].date <= *date {
            current = Some(sorted[cursor].value);
            cursor += 1;
        }
        out.push(current);
    }
    out
}

fn macro_readings(values: &[Option<f64>], signal: MacroSignal) -> Vec<Option<MacroReading>> {
    match signal {
        MacroSignal::Level => values
            .iter()
            .map(|v| v.map(|value| MacroReading { value, baseline: 1.0 }))
            .collect(),
        MacroSignal::RatioToAverage { window } => {
            let average = rolling_mean(values, window, IndicatorType::Sma(window));
            values
                .iter()
                .zip(&average.values)
                .map(|(value, baseline)| {
                    Some(MacroReading {
                        value: (*value)?,
                        baseline: (*baseline)?,
                    })
                })
                .collect()
        }
    }
}

/// Move every value `lag` rows later; the first `lag` rows become undefined.
fn shift<T: Copy>(values: &[Option<T>], lag: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| if i < lag { None } else { values[i - lag] })
        .collect()
}
