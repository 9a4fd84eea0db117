//! Plain-text console report.
//!
//! Sections:
//! - winning parameters and search size
//! - performance against the leveraged buy-and-hold benchmark
//! - yearly average position
//! - final-day recommendation

use crate::domain::error::LevtraderError;
use crate::domain::position::{AssetMode, Reason};
use crate::domain::report::{OptimizationReport, PositionLabel, Recommendation};
use crate::domain::strategy::Ladder;
use crate::ports::report_port::ReportPort;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::io::Write;

const RULE: &str = "------------------------------------------------------------";

#[derive(Debug, Default)]
pub struct ConsoleReportAdapter;

impl ConsoleReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &OptimizationReport) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", RULE));
        out.push_str(&format!(
            "{} ({} x{}) {} to {}\n",
            report.strategy_name,
            report.symbol,
            report.leverage,
            report.first_date,
            report.last_date
        ));
        out.push_str(&format!("{}\n", RULE));

        out.push_str(&format!("Best parameters:   {}\n", report.parameters));
        out.push_str(&format!("Tuples evaluated:  {}\n\n", report.evaluated));

        let m = &report.metrics;
        out.push_str(&format!(
            "Cumulative multiple: {:>10.2}x\n",
            m.cumulative_multiple
        ));
        out.push_str(&format!(
            "Buy & hold (x{}):    {:>10.2}x\n",
            report.leverage, m.benchmark_multiple
        ));
        out.push_str(&format!("CAGR:                {:>11}\n", m.cagr.to_string()));
        out.push_str(&format!(
            "Max drawdown:        {:>10.2}%\n",
            m.max_drawdown * 100.0
        ));
        out.push_str(&format!("Years:               {:>11.2}\n", m.years));
        out.push_str(&format!("Days invested:       {:>10.1}%\n", m.exposure * 100.0));
        out.push_str(&format!("Position changes:    {:>11}\n\n", m.position_changes));

        out.push_str(&render_yearly_positions(&report.dates, &report.positions));
        out.push('\n');
        out.push_str(&render_recommendation(&report.recommendation, &report.ladder));
        out.push_str(&format!("{}\n", RULE));
        out
    }
}

impl ReportPort for ConsoleReportAdapter {
    fn write(&self, report: &OptimizationReport) -> Result<(), LevtraderError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(self.render(report).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

pub fn render_yearly_positions(dates: &[NaiveDate], positions: &[f64]) -> String {
    if dates.is_empty() || positions.is_empty() {
        return "No position history.\n".to_string();
    }

    let mut years: BTreeMap<i32, (f64, usize, f64)> = BTreeMap::new();
    for (date, &position) in dates.iter().zip(positions) {
        let entry = years.entry(date.year()).or_insert((0.0, 0, 0.0));
        entry.0 += position;
        entry.1 += 1;
        entry.2 = position;
    }

    let mut out = String::from("Year   Avg position   Year-end position\n");
    for (year, (sum, count, last)) in years {
        out.push_str(&format!(
            "{}   {:>12.2}   {:>17.2}\n",
            year,
            sum / count as f64,
            last
        ));
    }
    out
}

pub fn render_recommendation(rec: &Recommendation, ladder: &Ladder) -> String {
    let mut out = format!("Recommendation for {}\n", rec.date);
    out.push_str(&format!("  Price:      {:.2}\n", rec.price));
    out.push_str(&format!("  EMA:        {:.2}\n", rec.ema));
    out.push_str(&format!("  Sell line:  {:.2}\n", rec.sell_line));
    out.push_str(&format!("  RSI:        {:.1}\n", rec.rsi));

    if let Some(vol) = &rec.volatility {
        let state = if vol.panic {
            "PANIC"
        } else if vol.calm {
            "calm"
        } else {
            "elevated"
        };
        out.push_str(&format!(
            "  Volatility: {:.2} (average {:.2}, panic line {:.2}) {}\n",
            vol.reading.value, vol.reading.average, vol.panic_line, state
        ));
    }
    if let Some(mac) = &rec.macro_state {
        out.push_str(&format!(
            "  Macro:      {:.3} (baseline {:.3}, threshold {}) {}\n",
            mac.reading.value,
            mac.reading.baseline,
            mac.threshold,
            if mac.breached { "BREACHED" } else { "ok" }
        ));
    }

    let position = match ladder {
        Ladder::ModeSwitch => format!("mode {}", rec.position),
        Ladder::Pyramid { .. } | Ladder::Hybrid { .. } => {
            format!("{:.0}%", rec.position * 100.0)
        }
    };
    out.push_str(&format!("  Position:   {} ({})\n", position, describe_label(rec.label)));
    out
}

pub fn describe_label(label: PositionLabel) -> String {
    match label {
        PositionLabel::Cash { reason } => match reason {
            Reason::VolatilityPanic => "cash: volatility panic".to_string(),
            Reason::MacroVeto => "cash: macro veto".to_string(),
            Reason::TrendExit => "cash: below sell line".to_string(),
            _ => "cash: waiting for uptrend".to_string(),
        },
        PositionLabel::Partial {
            fraction,
            held_by_rsi: true,
        } => format!("{:.0}% held, RSI or volatility gate blocks top rung", fraction * 100.0),
        PositionLabel::Partial { fraction, .. } => format!("{:.0}% building", fraction * 100.0),
        PositionLabel::Full => "fully invested".to_string(),
        PositionLabel::Capped { fraction } => {
            format!("capped at {:.0}% by macro", fraction * 100.0)
        }
        PositionLabel::Hybrid {
            fraction,
            leveraged: true,
        } => format!("{:.0}% in the leveraged leg", fraction * 100.0),
        PositionLabel::Hybrid { fraction, .. } => {
            format!("{:.0}% in the underlying, RSI or macro blocks leverage", fraction * 100.0)
        }
        PositionLabel::Mode(AssetMode::Cash) => "cash".to_string(),
        PositionLabel::Mode(AssetMode::Spot) => "spot, overheated".to_string(),
        PositionLabel::Mode(AssetMode::Leveraged) => "leveraged".to_string(),
    }
}
