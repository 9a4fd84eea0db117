//! Strategy profile (the capability set) and the grid-search parameter tuple.

use crate::domain::overlay::{MacroOverlay, VolatilityOverlay};
use std::fmt;

/// Shape of the position ladder.
#[derive(Debug, Clone, PartialEq)]
pub enum Ladder {
    /// Fractions of capital in the leveraged proxy, climbed one rung per
    /// uptrend day. The top rung is RSI-gated.
    Pyramid { rungs: Vec<f64> },
    /// Discrete asset modes: 0 = cash, 1 = spot, 2 = leveraged.
    ModeSwitch,
    /// Size climbs the rungs with no RSI gate; RSI picks each uptrend day
    /// whether that size sits in the leveraged proxy or the underlying.
    Hybrid { rungs: Vec<f64> },
}

impl Ladder {
    pub fn pyramid_default() -> Self {
        Ladder::Pyramid {
            rungs: vec![0.3, 0.7, 1.0],
        }
    }

    pub fn hybrid_default() -> Self {
        Ladder::Hybrid {
            rungs: vec![0.3, 0.7, 1.0],
        }
    }

    /// Largest position value the ladder can produce.
    pub fn top(&self) -> f64 {
        match self {
            Ladder::Pyramid { rungs } | Ladder::Hybrid { rungs } => {
                rungs.last().copied().unwrap_or(0.0)
            }
            Ladder::ModeSwitch => 2.0,
        }
    }
}

/// Everything that distinguishes one instrument's strategy from another,
/// apart from the searched parameters.
#[derive(Debug, Clone)]
pub struct StrategyProfile {
    pub name: String,
    pub symbol: String,
    pub cash_symbol: Option<String>,
    /// Multiplier applied to the underlying's daily return.
    pub leverage: f64,
    pub ladder: Ladder,
    pub rsi_period: usize,
    pub volatility: Option<VolatilityOverlay>,
    pub macro_overlay: Option<MacroOverlay>,
}

impl StrategyProfile {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            cash_symbol: None,
            leverage: 3.0,
            ladder: Ladder::pyramid_default(),
            rsi_period: 14,
            volatility: None,
            macro_overlay: None,
        }
    }
}

/// One grid point. Optional fields override the overlay defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParameters {
    pub ma_period: usize,
    pub rsi_limit: f64,
    pub sell_buffer: f64,
    pub vix_panic_line: Option<f64>,
    pub macro_threshold: Option<f64>,
}

impl StrategyParameters {
    pub fn new(ma_period: usize, rsi_limit: f64, sell_buffer: f64) -> Self {
        Self {
            ma_period,
            rsi_limit,
            sell_buffer,
            vix_panic_line: None,
            macro_threshold: None,
        }
    }
}

impl fmt::Display for StrategyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EMA {} / RSI {} / buffer {:.1}%",
            self.ma_period,
            self.rsi_limit,
            self.sell_buffer * 100.0
        )?;
        if let Some(line) = self.vix_panic_line {
            write!(f, " / VIX {}", line)?;
        }
        if let Some(threshold) = self.macro_threshold {
            write!(f, " / macro {}", threshold)?;
        }
        Ok(())
    }
}
