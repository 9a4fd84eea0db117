//! Risk overlays layered on top of the trend state machine.
//!
//! Overlays never advance a position; they either force it to zero or cap it.

/// Volatility-index panic filter.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityOverlay {
    pub symbol: String,
    /// EMA span of the volatility index's own moving average.
    pub ma_span: usize,
    /// Panic when the reading exceeds its moving average by this multiple.
    pub ma_multiple: f64,
    /// Absolute panic level used when the parameter tuple carries none.
    pub panic_line: f64,
    /// The top rung is only taken while the reading is below this level.
    pub calm_ceiling: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityReading {
    pub value: f64,
    pub average: f64,
}

impl VolatilityOverlay {
    pub fn is_panic(&self, reading: VolatilityReading, panic_line: f64) -> bool {
        reading.value > reading.average * self.ma_multiple || reading.value > panic_line
    }

    pub fn is_calm(&self, reading: VolatilityReading) -> bool {
        match self.calm_ceiling {
            Some(ceiling) => reading.value < ceiling,
            None => true,
        }
    }
}

/// How the macro series is turned into a comparable signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MacroSignal {
    /// The raw level, compared against the threshold directly.
    Level,
    /// The level relative to its own rolling mean; the threshold is a multiple.
    RatioToAverage { window: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MacroPolicy {
    /// Force the position to zero while breached.
    Veto,
    /// Limit the position to at most this value while breached.
    Cap(f64),
}

/// Credit-spread / yield-curve filter.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroOverlay {
    pub series: String,
    pub signal: MacroSignal,
    pub breach: Breach,
    /// Default threshold used when the parameter tuple carries none.
    pub threshold: f64,
    /// Trading days between observation and use.
    pub lag: usize,
    pub policy: MacroPolicy,
}

/// One row of the macro signal: the value and what the threshold scales.
/// `baseline` is 1.0 for [`MacroSignal::Level`] and the rolling mean otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroReading {
    pub value: f64,
    pub baseline: f64,
}

impl MacroOverlay {
    pub fn is_breached(&self, reading: MacroReading, threshold: f64) -> bool {
        let line = reading.baseline * threshold;
        match self.breach {
            Breach::Above => reading.value > line,
            Breach::Below => reading.value < line,
        }
    }
}
