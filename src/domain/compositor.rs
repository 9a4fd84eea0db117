//! Turns a position series into a daily strategy-return series.
//!
//! The position decided at row t is applied to the return realized at t+1.
//! Row 0 has no prior decision and returns exactly 0.

use crate::domain::position::{AssetMode, Decision};
use crate::domain::strategy::Ladder;

/// Synthetic leveraged return: the underlying's daily return times a fixed
/// multiplier. No decay or financing cost.
pub fn leveraged_return(underlying: f64, leverage: f64) -> f64 {
    underlying * leverage
}

pub fn compose_returns(
    decisions: &[Decision],
    ladder: &Ladder,
    underlying: &[f64],
    cash: &[f64],
    leverage: f64,
) -> Vec<f64> {
    let n = decisions.len().min(underlying.len()).min(cash.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    out.push(0.0);

    for t in 1..n {
        let Decision { position: held, spot, .. } = decisions[t - 1];
        let levered = leveraged_return(underlying[t], leverage);
        let ret = match ladder {
            Ladder::Pyramid { .. } => levered * held + cash[t] * (1.0 - held),
            Ladder::Hybrid { .. } => {
                let leg = if spot { underlying[t] } else { levered };
                leg * held + cash[t] * (1.0 - held)
            }
            Ladder::ModeSwitch => match AssetMode::from_level(held) {
                AssetMode::Cash => cash[t],
                AssetMode::Spot => underlying[t],
                AssetMode::Leveraged => levered,
            },
        };
        out.push(ret);
    }
    out
}
