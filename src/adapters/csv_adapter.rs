//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`. Column layout varies by
//! provider, so the header is inspected: the date column is `date`/`Date`,
//! the value column the first of [`VALUE_COLUMNS`] or the symbol itself
//! (FRED exports name the column after the series). Blank, `.` and `NaN`
//! values are skipped.

use crate::domain::error::LevtraderError;
use crate::domain::price_series::{Observation, PriceBar, PriceSeries};
use crate::ports::data_port::{MacroDataPort, MarketDataPort};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_COLUMNS: &[&str] = &["date", "Date", "DATE", "observation_date"];
const VALUE_COLUMNS: &[&str] = &["close", "Close", "Adj Close", "adj_close", "value"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Dated values within `[start_date, end_date]`, sorted by date.
    fn read_values(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, LevtraderError> {
        let path = self.csv_path(symbol);
        let fetch_error = |reason: String| LevtraderError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| fetch_error(format!("failed to read {}: {}", path.display(), e)))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| fetch_error(format!("CSV header error: {}", e)))?
            .clone();
        let column = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        };
        let date_col = column(DATE_COLUMNS)
            .ok_or_else(|| fetch_error("missing date column".into()))?;
        let value_col = column(VALUE_COLUMNS)
            .or_else(|| column(&[symbol][..]))
            .ok_or_else(|| fetch_error("missing close/value column".into()))?;

        let mut values = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| fetch_error(format!("CSV parse error: {}", e)))?;

            let date_str = record.get(date_col).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                fetch_error(format!("invalid date '{}' on row {}: {}", date_str, row + 1, e))
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let raw = record.get(value_col).unwrap_or("").trim();
            match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => values.push((date, value)),
                _ if raw.is_empty() || raw == "." || raw.eq_ignore_ascii_case("nan") => {
                    skipped += 1;
                }
                _ => {
                    return Err(fetch_error(format!(
                        "invalid value '{}' on row {}",
                        raw,
                        row + 1
                    )));
                }
            }
        }

        if skipped > 0 {
            log::warn!("{}: skipped {} rows without a value", symbol, skipped);
        }

        values.sort_by_key(|(date, _)| *date);
        Ok(values)
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, LevtraderError> {
        let bars = self
            .read_values(symbol, start_date, end_date)?
            .into_iter()
            .map(|(date, close)| PriceBar { date, close })
            .collect();
        PriceSeries::new(symbol, bars)
    }
}

impl MacroDataPort for CsvAdapter {
    fn fetch_observations(
        &self,
        series: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, LevtraderError> {
        let observations: Vec<Observation> = self
            .read_values(series, start_date, end_date)?
            .into_iter()
            .map(|(date, value)| Observation { date, value })
            .collect();
        if observations.is_empty() {
            return Err(LevtraderError::NoData {
                symbol: series.to_string(),
            });
        }
        Ok(observations)
    }
}
