//! Data access port traits.
//!
//! Implementations return cleaned series: errors for a missing symbol or an
//! empty window surface here, before the core runs.

use crate::domain::error::LevtraderError;
use crate::domain::price_series::{Observation, PriceSeries};
use chrono::NaiveDate;

/// Daily closes for tradable instruments, cash proxies and volatility indices.
pub trait MarketDataPort {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, LevtraderError>;
}

/// Sparse economic series (credit spreads, yield curves).
pub trait MacroDataPort {
    fn fetch_observations(
        &self,
        series: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, LevtraderError>;
}
