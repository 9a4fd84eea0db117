//! Per-day position state machine.
//!
//! Precedence, highest first:
//! 1. volatility panic -> 0
//! 2. macro veto -> 0
//! 3. price below `EMA * (1 - sell_buffer)` -> 0
//! 4. price above EMA -> climb the ladder (or pick a mode)
//! 5. otherwise (buffer zone) -> hold
//!
//! A macro cap is applied last to any non-zero result.
//! All comparisons are strict; equality holds the previous state.

use crate::domain::overlay::{MacroPolicy, VolatilityOverlay, VolatilityReading};
use crate::domain::strategy::{Ladder, StrategyParameters, StrategyProfile};

/// Discrete asset mode for the mode-switching ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetMode {
    Cash,
    Spot,
    Leveraged,
}

impl AssetMode {
    pub fn from_level(level: f64) -> Self {
        match level.round() {
            l if l >= 2.0 => AssetMode::Leveraged,
            l if l >= 1.0 => AssetMode::Spot,
            _ => AssetMode::Cash,
        }
    }

    pub fn level(self) -> f64 {
        match self {
            AssetMode::Cash => 0.0,
            AssetMode::Spot => 1.0,
            AssetMode::Leveraged => 2.0,
        }
    }
}

/// Why the state machine produced a position. Kept for the final-day label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Row 0: no previous state.
    Seed,
    VolatilityPanic,
    MacroVeto,
    TrendExit,
    Advance,
    /// The top rung (or leverage) was blocked by RSI or the volatility calm gate.
    TopBlocked,
    OverheatRetreat,
    /// Uptrend, already at the top rung, not overheated.
    Hold,
    /// Buffer zone between the sell line and the EMA.
    BufferHold,
    MacroCap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub position: f64,
    pub reason: Reason,
    /// Hybrid ladder only: the held size sits in the underlying rather than
    /// the leveraged proxy.
    pub spot: bool,
}

impl Decision {
    pub fn new(position: f64, reason: Reason) -> Self {
        Self {
            position,
            reason,
            spot: false,
        }
    }

    pub fn seed() -> Self {
        Self::new(0.0, Reason::Seed)
    }

    pub fn in_spot(mut self, spot: bool) -> Self {
        self.spot = spot;
        self
    }
}

/// Everything known about one trading day when its decision is made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayInputs {
    pub price: f64,
    pub ema: f64,
    pub rsi: f64,
    pub volatility: Option<VolatilityReading>,
    pub macro_breached: bool,
}

/// Parameter tuple resolved against a profile, ready for the daily loop.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRules<'a> {
    pub ladder: &'a Ladder,
    pub rsi_limit: f64,
    pub sell_buffer: f64,
    pub volatility: Option<&'a VolatilityOverlay>,
    pub panic_line: f64,
    pub macro_policy: Option<MacroPolicy>,
}

impl<'a> TransitionRules<'a> {
    pub fn resolve(profile: &'a StrategyProfile, params: &StrategyParameters) -> Self {
        let volatility = profile.volatility.as_ref();
        Self {
            ladder: &profile.ladder,
            rsi_limit: params.rsi_limit,
            sell_buffer: params.sell_buffer,
            volatility,
            panic_line: params
                .vix_panic_line
                .or(volatility.map(|v| v.panic_line))
                .unwrap_or(f64::INFINITY),
            macro_policy: profile.macro_overlay.as_ref().map(|m| m.policy),
        }
    }
}

pub fn next_position(rules: &TransitionRules<'_>, day: &DayInputs, previous: f64) -> Decision {
    let mut calm = true;
    if let (Some(overlay), Some(reading)) = (rules.volatility, day.volatility) {
        if overlay.is_panic(reading, rules.panic_line) {
            return Decision::new(0.0, Reason::VolatilityPanic);
        }
        calm = overlay.is_calm(reading);
    }

    if day.macro_breached && rules.macro_policy == Some(MacroPolicy::Veto) {
        return Decision::new(0.0, Reason::MacroVeto);
    }

    let sell_threshold = day.ema * (1.0 - rules.sell_buffer);
    if day.price < sell_threshold {
        return Decision::new(0.0, Reason::TrendExit);
    }

    let decision = if day.price > day.ema {
        match rules.ladder {
            Ladder::Pyramid { rungs } => climb(rungs, previous, day.rsi, rules.rsi_limit, calm),
            Ladder::ModeSwitch => switch_mode(day.rsi, rules.rsi_limit, calm),
            Ladder::Hybrid { rungs } => {
                hybrid_climb(rungs, previous, day.rsi, rules.rsi_limit, calm)
            }
        }
    } else {
        // The hybrid leverage flag is only raised on uptrend days.
        Decision::new(previous, Reason::BufferHold)
            .in_spot(matches!(rules.ladder, Ladder::Hybrid { .. }))
    };

    match rules.macro_policy {
        Some(MacroPolicy::Cap(cap)) if day.macro_breached => {
            apply_cap(rules.ladder, decision, cap)
        }
        _ => decision,
    }
}

/// On the hybrid ladder a breached cap also drops the leverage flag.
fn apply_cap(ladder: &Ladder, decision: Decision, cap: f64) -> Decision {
    let hybrid = matches!(ladder, Ladder::Hybrid { .. });
    let leveraged = hybrid && decision.position > 0.0 && !decision.spot;
    if decision.position > cap || leveraged {
        Decision::new(decision.position.min(cap), Reason::MacroCap).in_spot(hybrid)
    } else {
        decision
    }
}

/// Index of the rung after the one a position stands on. A value between
/// rungs (left by a cap) counts as the rung above it, so 0.5 on a
/// `0.3, 0.7, 1.0` ladder steps straight to 1.0. Callers handle positions
/// above the second-highest rung.
fn next_rung(rungs: &[f64], previous: f64) -> usize {
    if previous <= 0.0 {
        return 0;
    }
    rungs
        .iter()
        .position(|&rung| previous <= rung)
        .map_or(rungs.len() - 1, |i| (i + 1).min(rungs.len() - 1))
}

/// One step up the pyramid; anything above the second-highest rung is at
/// the top.
fn climb(rungs: &[f64], previous: f64, rsi: f64, rsi_limit: f64, calm: bool) -> Decision {
    if rungs.is_empty() {
        return Decision::new(previous, Reason::Hold);
    }
    let below_top = if rungs.len() >= 2 {
        rungs[rungs.len() - 2]
    } else {
        0.0
    };

    if previous > below_top {
        return if rsi > rsi_limit {
            Decision::new(below_top, Reason::OverheatRetreat)
        } else {
            Decision::new(previous, Reason::Hold)
        };
    }

    let next_index = next_rung(rungs, previous);
    if next_index == rungs.len() - 1 && !(rsi < rsi_limit && calm) {
        return Decision::new(below_top.max(previous), Reason::TopBlocked);
    }

    Decision::new(rungs[next_index], Reason::Advance)
}

fn switch_mode(rsi: f64, rsi_limit: f64, calm: bool) -> Decision {
    if rsi > rsi_limit || !calm {
        Decision::new(AssetMode::Spot.level(), Reason::TopBlocked)
    } else {
        Decision::new(AssetMode::Leveraged.level(), Reason::Advance)
    }
}

/// Size climbs one rung per uptrend day with no RSI gate. RSI and the calm
/// gate pick the leg: leveraged below the limit, spot otherwise.
fn hybrid_climb(rungs: &[f64], previous: f64, rsi: f64, rsi_limit: f64, calm: bool) -> Decision {
    let Some(&top) = rungs.last() else {
        return Decision::new(previous, Reason::Hold);
    };
    let below_top = if rungs.len() >= 2 {
        rungs[rungs.len() - 2]
    } else {
        0.0
    };

    let (position, reason) = if previous > below_top {
        (top, if previous >= top { Reason::Hold } else { Reason::Advance })
    } else {
        (rungs[next_rung(rungs, previous)], Reason::Advance)
    };

    if rsi < rsi_limit && calm {
        Decision::new(position, reason)
    } else {
        Decision::new(position, Reason::TopBlocked).in_spot(true)
    }
}
