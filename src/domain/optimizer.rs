//! Exhaustive grid search over strategy parameters.
//!
//! Tuples are scored independently (optionally across rayon workers); the
//! arg-max is then taken in tuple order, so ties go to the earliest tuple and
//! parallel and sequential runs agree exactly.

use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::error::LevtraderError;
use crate::domain::market_frame::PreparedSeries;
use crate::domain::strategy::{StrategyParameters, StrategyProfile};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Ranges for each searched parameter. The optional axes may be empty, in
/// which case the profile's overlay defaults apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamGrid {
    pub ma_periods: Vec<usize>,
    pub rsi_limits: Vec<f64>,
    pub sell_buffers: Vec<f64>,
    pub vix_panic_lines: Vec<f64>,
    pub macro_thresholds: Vec<f64>,
}

impl ParamGrid {
    pub fn size(&self) -> usize {
        self.ma_periods.len()
            * self.rsi_limits.len()
            * self.sell_buffers.len()
            * self.vix_panic_lines.len().max(1)
            * self.macro_thresholds.len().max(1)
    }

    pub fn validate(&self) -> Result<(), LevtraderError> {
        let empty = |axis: &str| LevtraderError::EmptyGrid {
            reason: format!("{} has no values", axis),
        };
        if self.ma_periods.is_empty() {
            return Err(empty("ma_periods"));
        }
        if self.rsi_limits.is_empty() {
            return Err(empty("rsi_limits"));
        }
        if self.sell_buffers.is_empty() {
            return Err(empty("sell_buffers"));
        }
        if self.ma_periods.contains(&0) {
            return Err(LevtraderError::EmptyGrid {
                reason: "ma_periods must be positive".into(),
            });
        }
        Ok(())
    }

    /// Cartesian product in iteration order: MA outermost, then RSI limit,
    /// sell buffer, panic line and macro threshold.
    pub fn tuples(&self) -> Vec<StrategyParameters> {
        let optional = |values: &[f64]| -> Vec<Option<f64>> {
            if values.is_empty() {
                vec![None]
            } else {
                values.iter().copied().map(Some).collect()
            }
        };
        let vix_lines = optional(&self.vix_panic_lines);
        let macro_thresholds = optional(&self.macro_thresholds);

        let mut tuples = Vec::with_capacity(self.size());
        for &ma_period in &self.ma_periods {
            for &rsi_limit in &self.rsi_limits {
                for &sell_buffer in &self.sell_buffers {
                    for &vix_panic_line in &vix_lines {
                        for &macro_threshold in &macro_thresholds {
                            tuples.push(StrategyParameters {
                                ma_period,
                                rsi_limit,
                                sell_buffer,
                                vix_panic_line,
                                macro_threshold,
                            });
                        }
                    }
                }
            }
        }
        tuples
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub best: StrategyParameters,
    pub best_score: f64,
    pub evaluated: usize,
    /// The winning tuple re-run with its full series.
    pub result: BacktestResult,
    pub elapsed: Duration,
}

pub struct Optimizer<'a> {
    series: &'a PreparedSeries,
    profile: &'a StrategyProfile,
    parallel: bool,
}

impl<'a> Optimizer<'a> {
    pub fn new(series: &'a PreparedSeries, profile: &'a StrategyProfile) -> Self {
        Self {
            series,
            profile,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(&self, grid: &ParamGrid) -> Result<OptimizationOutcome, LevtraderError> {
        grid.validate()?;
        let started = Instant::now();
        let tuples = grid.tuples();
        let total = tuples.len();
        log::info!(
            "{}: searching {} parameter tuples ({})",
            self.profile.name,
            total,
            if self.parallel { "parallel" } else { "sequential" }
        );

        let emas: HashMap<usize, Vec<f64>> = grid
            .ma_periods
            .iter()
            .map(|&period| (period, self.series.ema(period)))
            .collect();

        let done = AtomicUsize::new(0);
        let step = (total / 10).max(1);
        let evaluate = |params: &StrategyParameters| -> f64 {
            let score = match emas.get(&params.ma_period) {
                Some(ema) => {
                    run_backtest(self.series, ema, self.profile, params).cumulative_multiple
                }
                None => f64::NEG_INFINITY,
            };
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % step == 0 || finished == total {
                log::debug!("{}: {}/{} tuples evaluated", self.profile.name, finished, total);
            }
            score
        };

        let scores: Vec<f64> = if self.parallel {
            tuples.par_iter().map(evaluate).collect()
        } else {
            tuples.iter().map(evaluate).collect()
        };

        let (best_index, best_score) = arg_max(&scores).ok_or_else(|| LevtraderError::EmptyGrid {
            reason: "no tuples generated".into(),
        })?;
        let best = tuples[best_index];

        let ema = emas
            .get(&best.ma_period)
            .cloned()
            .unwrap_or_else(|| self.series.ema(best.ma_period));
        let result = run_backtest(self.series, &ema, self.profile, &best);
        let elapsed = started.elapsed();

        log::info!(
            "{}: best {} -> {:.2}x after {} tuples in {:.2?}",
            self.profile.name,
            best,
            best_score,
            total,
            elapsed
        );

        Ok(OptimizationOutcome {
            best,
            best_score,
            evaluated: total,
            result,
            elapsed,
        })
    }
}

/// Index and value of the highest score. Strictly greater wins, so the first
/// of equal scores is kept. Non-finite scores rank below every finite one.
pub fn arg_max(scores: &[f64]) -> Option<(usize, f64)> {
    let rank = |s: f64| if s.is_finite() { s } else { f64::NEG_INFINITY };
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if rank(score) <= rank(current) => {}
            _ => best = Some((i, score)),
        }
    }
    best
}
