#![allow(dead_code)]

use chrono::NaiveDate;
use levtrader::domain::error::LevtraderError;
use levtrader::domain::market_frame::{MarketFrame, PreparedSeries};
pub use levtrader::domain::price_series::{Observation, PriceBar, PriceSeries};
use levtrader::domain::strategy::StrategyProfile;
use levtrader::ports::data_port::{MacroDataPort, MarketDataPort};
use std::collections::HashMap;

pub struct MockMarketDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_closes(self, symbol: &str, closes: &[f64]) -> Self {
        self.with_bars(symbol, make_bars(start_date(), closes))
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, LevtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(LevtraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .copied()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .collect()
            })
            .unwrap_or_default();
        PriceSeries::new(symbol, bars)
    }
}

pub struct MockMacroDataPort {
    pub data: HashMap<String, Vec<Observation>>,
}

impl MockMacroDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_observations(mut self, series: &str, observations: Vec<Observation>) -> Self {
        self.data.insert(series.to_string(), observations);
        self
    }
}

impl MacroDataPort for MockMacroDataPort {
    fn fetch_observations(
        &self,
        series: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<Observation>, LevtraderError> {
        match self.data.get(series) {
            Some(obs) if !obs.is_empty() => Ok(obs.clone()),
            _ => Err(LevtraderError::NoData {
                symbol: series.to_string(),
            }),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_date() -> NaiveDate {
    date(2020, 1, 1)
}

/// One bar per calendar day from `start`.
pub fn make_bars(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(symbol, make_bars(start_date(), closes)).unwrap()
}

/// One observation per calendar day from the common start date.
pub fn make_observations(values: &[f64]) -> Vec<Observation> {
    make_bars(start_date(), values)
        .into_iter()
        .map(|b| Observation {
            date: b.date,
            value: b.close,
        })
        .collect()
}

pub fn prepare(closes: &[f64], profile: &StrategyProfile) -> PreparedSeries {
    let series = make_series(&profile.symbol, closes);
    MarketFrame::join(&series, None, None, None)
        .unwrap()
        .prepare(profile)
        .unwrap()
}

/// Uptrend of +2, +2, -1.5 steps. RSI(14) stays between 70 and 77, so the
/// top rung is reachable with an RSI limit of 80.
pub fn zigzag_rise(days: usize, start: f64) -> Vec<f64> {
    let steps = [2.0, 2.0, -1.5];
    let mut closes = Vec::with_capacity(days);
    closes.push(start);
    for i in 1..days {
        let last = closes[i - 1];
        closes.push(last + steps[(i - 1) % 3]);
    }
    closes
}

/// 300 days: a 200-day rise, a 30% fall over 10 days, then 90 flat days.
pub fn rise_crash_flat() -> Vec<f64> {
    let mut closes = zigzag_rise(200, 100.0);
    let daily = 0.7_f64.powf(0.1);
    for _ in 0..10 {
        let last = closes[closes.len() - 1];
        closes.push(last * daily);
    }
    let bottom = closes[closes.len() - 1];
    closes.extend(std::iter::repeat_n(bottom, 90));
    closes
}

/// Index in the prepared series of the first falling day of [`rise_crash_flat`].
pub const CRASH_START: usize = 200 - 14;

/// Deterministic pseudo-random walk (LCG), floored at 10.
pub fn random_walk(days: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut price = 100.0;
    (0..days)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = ((state >> 33) % 200) as f64 / 100.0 - 0.97;
            price = (price * (1.0 + change / 50.0)).max(10.0);
            price
        })
        .collect()
}
