//! Configuration validation.
//!
//! Reads every section through `ConfigPort`, checks it, and builds the typed
//! profile, grid and run window before any data is fetched.

use crate::domain::error::LevtraderError;
use crate::domain::optimizer::ParamGrid;
use crate::domain::overlay::{Breach, MacroOverlay, MacroPolicy, MacroSignal, VolatilityOverlay};
use crate::domain::strategy::{Ladder, StrategyProfile};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

/// Everything a run needs from the config file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: StrategyProfile,
    pub grid: ParamGrid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_dir: Option<String>,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, LevtraderError> {
    let profile = load_profile(config)?;
    let grid = load_grid(config, &profile)?;
    let (start_date, end_date) = load_dates(config)?;
    Ok(RunConfig {
        profile,
        grid,
        start_date,
        end_date,
        data_dir: config.get_string("data", "dir"),
    })
}

pub fn load_profile(config: &dyn ConfigPort) -> Result<StrategyProfile, LevtraderError> {
    let symbol = required(config, "instrument", "symbol")?;
    let name = config
        .get_string("instrument", "name")
        .unwrap_or_else(|| symbol.clone());
    let mut profile = StrategyProfile::new(name, symbol);

    profile.cash_symbol = config.get_string("instrument", "cash_symbol");

    if let Some(leverage) = optional::<f64>(config, "instrument", "leverage")? {
        if !(leverage.is_finite() && leverage > 0.0) {
            return Err(LevtraderError::invalid(
                "instrument",
                "leverage",
                "leverage must be positive",
            ));
        }
        profile.leverage = leverage;
    }

    if let Some(period) = optional::<usize>(config, "instrument", "rsi_period")? {
        if period == 0 {
            return Err(LevtraderError::invalid(
                "instrument",
                "rsi_period",
                "rsi_period must be at least 1",
            ));
        }
        profile.rsi_period = period;
    }

    profile.ladder = load_ladder(config)?;

    if config.has_section("volatility") {
        profile.volatility = Some(load_volatility(config)?);
    }
    if config.has_section("macro") {
        profile.macro_overlay = Some(load_macro(config, &profile.ladder)?);
    }

    Ok(profile)
}

fn load_ladder(config: &dyn ConfigPort) -> Result<Ladder, LevtraderError> {
    let kind = config
        .get_string("instrument", "ladder")
        .unwrap_or_else(|| "pyramid".to_string());
    match kind.to_lowercase().as_str() {
        "pyramid" => Ok(Ladder::Pyramid {
            rungs: load_rungs(config)?,
        }),
        "hybrid" => Ok(Ladder::Hybrid {
            rungs: load_rungs(config)?,
        }),
        "switch" => Ok(Ladder::ModeSwitch),
        other => Err(LevtraderError::invalid(
            "instrument",
            "ladder",
            format!("expected pyramid, hybrid or switch, got {}", other),
        )),
    }
}

fn load_rungs(config: &dyn ConfigPort) -> Result<Vec<f64>, LevtraderError> {
    match config.get_string("instrument", "rungs") {
        None => Ok(vec![0.3, 0.7, 1.0]),
        Some(text) => {
            let rungs = parse_number_list("instrument", "rungs", &text)?;
            validate_rungs(&rungs)?;
            Ok(rungs)
        }
    }
}

fn validate_rungs(rungs: &[f64]) -> Result<(), LevtraderError> {
    if rungs.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
        return Err(LevtraderError::invalid(
            "instrument",
            "rungs",
            "rungs must be positive",
        ));
    }
    if rungs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(LevtraderError::invalid(
            "instrument",
            "rungs",
            "rungs must be strictly increasing",
        ));
    }
    Ok(())
}

fn load_volatility(config: &dyn ConfigPort) -> Result<VolatilityOverlay, LevtraderError> {
    let symbol = required(config, "volatility", "symbol")?;
    let ma_span = optional::<usize>(config, "volatility", "ma_span")?.unwrap_or(50);
    if ma_span == 0 {
        return Err(LevtraderError::invalid(
            "volatility",
            "ma_span",
            "ma_span must be at least 1",
        ));
    }
    let ma_multiple = optional::<f64>(config, "volatility", "ma_multiple")?.unwrap_or(1.2);
    if !(ma_multiple.is_finite() && ma_multiple > 0.0) {
        return Err(LevtraderError::invalid(
            "volatility",
            "ma_multiple",
            "ma_multiple must be positive",
        ));
    }
    // No absolute line: only the spike-over-average test applies.
    let panic_line = optional::<f64>(config, "volatility", "panic_line")?.unwrap_or(f64::INFINITY);
    let calm_ceiling = optional::<f64>(config, "volatility", "calm_ceiling")?;

    Ok(VolatilityOverlay {
        symbol,
        ma_span,
        ma_multiple,
        panic_line,
        calm_ceiling,
    })
}

fn load_macro(config: &dyn ConfigPort, ladder: &Ladder) -> Result<MacroOverlay, LevtraderError> {
    let series = required(config, "macro", "series")?;

    let signal = match required(config, "macro", "signal")?.to_lowercase().as_str() {
        "level" => MacroSignal::Level,
        "ratio_to_average" => {
            let window = optional::<usize>(config, "macro", "window")?.unwrap_or(20);
            if window == 0 {
                return Err(LevtraderError::invalid(
                    "macro",
                    "window",
                    "window must be at least 1",
                ));
            }
            MacroSignal::RatioToAverage { window }
        }
        other => {
            return Err(LevtraderError::invalid(
                "macro",
                "signal",
                format!("expected level or ratio_to_average, got {}", other),
            ));
        }
    };

    let breach = match required(config, "macro", "breach")?.to_lowercase().as_str() {
        "above" => Breach::Above,
        "below" => Breach::Below,
        other => {
            return Err(LevtraderError::invalid(
                "macro",
                "breach",
                format!("expected above or below, got {}", other),
            ));
        }
    };

    let threshold = optional::<f64>(config, "macro", "threshold")?
        .ok_or_else(|| LevtraderError::missing("macro", "threshold"))?;
    let lag = optional::<usize>(config, "macro", "lag")?.unwrap_or(0);

    let policy = match required(config, "macro", "policy")?.to_lowercase().as_str() {
        "veto" => MacroPolicy::Veto,
        "cap" => {
            let cap = optional::<f64>(config, "macro", "cap")?
                .ok_or_else(|| LevtraderError::missing("macro", "cap"))?;
            if !(0.0..=ladder.top()).contains(&cap) {
                return Err(LevtraderError::invalid(
                    "macro",
                    "cap",
                    format!("cap must be between 0 and {}", ladder.top()),
                ));
            }
            // Switch levels are modes, not fractions: only cash or spot.
            if *ladder == Ladder::ModeSwitch && cap != 0.0 && cap != 1.0 {
                return Err(LevtraderError::invalid(
                    "macro",
                    "cap",
                    "a switch ladder cap must be 0 (cash) or 1 (spot)",
                ));
            }
            MacroPolicy::Cap(cap)
        }
        other => {
            return Err(LevtraderError::invalid(
                "macro",
                "policy",
                format!("expected veto or cap, got {}", other),
            ));
        }
    };

    Ok(MacroOverlay {
        series,
        signal,
        breach,
        threshold,
        lag,
        policy,
    })
}

pub fn load_grid(
    config: &dyn ConfigPort,
    profile: &StrategyProfile,
) -> Result<ParamGrid, LevtraderError> {
    let ma_text = required(config, "grid", "ma_periods")?;
    let ma_periods = parse_number_list("grid", "ma_periods", &ma_text)?
        .into_iter()
        .map(|v| {
            if v >= 1.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(LevtraderError::invalid(
                    "grid",
                    "ma_periods",
                    format!("{} is not a positive whole number", v),
                ))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rsi_limits =
        parse_number_list("grid", "rsi_limits", &required(config, "grid", "rsi_limits")?)?;
    let sell_buffers =
        parse_number_list("grid", "sell_buffers", &required(config, "grid", "sell_buffers")?)?;
    if sell_buffers.iter().any(|b| *b >= 1.0) {
        return Err(LevtraderError::invalid(
            "grid",
            "sell_buffers",
            "sell buffer must be below 1.0",
        ));
    }

    let vix_panic_lines = match config.get_string("grid", "vix_panic_lines") {
        Some(text) if profile.volatility.is_some() => {
            parse_number_list("grid", "vix_panic_lines", &text)?
        }
        Some(_) => {
            return Err(LevtraderError::invalid(
                "grid",
                "vix_panic_lines",
                "requires a [volatility] section",
            ));
        }
        None => Vec::new(),
    };
    let macro_thresholds = match config.get_string("grid", "macro_thresholds") {
        Some(text) if profile.macro_overlay.is_some() => {
            parse_number_list("grid", "macro_thresholds", &text)?
        }
        Some(_) => {
            return Err(LevtraderError::invalid(
                "grid",
                "macro_thresholds",
                "requires a [macro] section",
            ));
        }
        None => Vec::new(),
    };

    let grid = ParamGrid {
        ma_periods,
        rsi_limits,
        sell_buffers,
        vix_panic_lines,
        macro_thresholds,
    };
    grid.validate()?;
    Ok(grid)
}

pub fn load_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), LevtraderError> {
    let start_date = parse_date(
        Some(required(config, "instrument", "start_date")?.as_str()),
        "start_date",
    )?;
    let end_date = match config.get_string("instrument", "end_date") {
        Some(text) => parse_date(Some(text.as_str()), "end_date")?,
        None => chrono::Local::now().date_naive(),
    };
    if start_date >= end_date {
        return Err(LevtraderError::invalid(
            "instrument",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, LevtraderError> {
    match value {
        None => Err(LevtraderError::missing("instrument", field)),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            LevtraderError::invalid(
                "instrument",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

/// Parse a comma list (`0.0,0.01,0.02`) or an inclusive range
/// (`start:end:step`). Range values are `start + i * step`, rounded to ten
/// decimals so `0:0.05:0.01` ends exactly at 0.05.
/// Upper bound on the values one `start:end:step` range may expand to.
pub const MAX_RANGE_VALUES: usize = 100_000;

pub fn parse_number_list(section: &str, key: &str, text: &str) -> Result<Vec<f64>, LevtraderError> {
    let number = |s: &str| -> Result<f64, LevtraderError> {
        let value: f64 = s.trim().parse().map_err(|_| {
            LevtraderError::invalid(section, key, format!("'{}' is not a number", s.trim()))
        })?;
        if !value.is_finite() {
            return Err(LevtraderError::invalid(section, key, "values must be finite"));
        }
        Ok(value)
    };

    let values = if text.contains(':') {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() != 3 {
            return Err(LevtraderError::invalid(
                section,
                key,
                "range must be start:end:step",
            ));
        }
        let (start, end, step) = (number(parts[0])?, number(parts[1])?, number(parts[2])?);
        if step <= 0.0 {
            return Err(LevtraderError::invalid(section, key, "step must be positive"));
        }
        if end < start {
            return Err(LevtraderError::invalid(section, key, "end must not precede start"));
        }
        let span = ((end - start) / step + 1e-9).floor();
        if !span.is_finite() || span >= MAX_RANGE_VALUES as f64 {
            return Err(LevtraderError::invalid(
                section,
                key,
                format!("range expands to more than {} values", MAX_RANGE_VALUES),
            ));
        }
        let count = span as usize + 1;
        (0..count)
            .map(|i| round10(start + i as f64 * step))
            .collect()
    } else {
        text.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(number)
            .collect::<Result<Vec<_>, _>>()?
    };

    if values.is_empty() {
        return Err(LevtraderError::invalid(section, key, "must not be empty"));
    }
    Ok(values)
}

fn round10(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, LevtraderError> {
    config
        .get_string(section, key)
        .ok_or_else(|| LevtraderError::missing(section, key))
}

fn optional<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, LevtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(text) => text.parse::<T>().map(Some).map_err(|_| {
            LevtraderError::invalid(section, key, format!("'{}' could not be parsed", text))
        }),
    }
}
