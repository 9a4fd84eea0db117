//! Core domain types and logic.

pub mod backtest;
pub mod compositor;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod market_frame;
pub mod metrics;
pub mod optimizer;
pub mod overlay;
pub mod position;
pub mod price_series;
pub mod report;
pub mod strategy;
