//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::console_report::ConsoleReportAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{load_run_config, RunConfig};
use crate::domain::error::LevtraderError;
use crate::domain::market_frame::{MarketFrame, PreparedSeries, MIN_PREPARED_ROWS};
use crate::domain::optimizer::Optimizer;
use crate::domain::report::OptimizationReport;
use crate::domain::strategy::StrategyParameters;
use crate::ports::data_port::{MacroDataPort, MarketDataPort};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "levtrader",
    about = "Leveraged trend-following backtester and parameter optimizer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the parameter grid and report the best configuration
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <SYMBOL>.csv files; overrides [data] dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Evaluate tuples on one thread
        #[arg(long)]
        sequential: bool,
    },
    /// Backtest a single parameter tuple
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        ma: usize,
        #[arg(long)]
        rsi: f64,
        #[arg(long)]
        buffer: f64,
        #[arg(long)]
        vix: Option<f64>,
        #[arg(long)]
        macro_threshold: Option<f64>,
    },
    /// Validate a configuration file without fetching data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Optimize {
            config,
            data_dir,
            sequential,
        } => run_optimize(&config, data_dir, !sequential),
        Command::Backtest {
            config,
            data_dir,
            ma,
            rsi,
            buffer,
            vix,
            macro_threshold,
        } => {
            let params = StrategyParameters {
                ma_period: ma,
                rsi_limit: rsi,
                sell_buffer: buffer,
                vix_panic_line: vix,
                macro_threshold,
            };
            run_single(&config, data_dir, params)
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, LevtraderError> {
    log::info!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    load_run_config(&adapter)
}

fn resolve_data_dir(run: &RunConfig, data_dir: Option<PathBuf>) -> Result<PathBuf, LevtraderError> {
    data_dir
        .or_else(|| run.data_dir.as_ref().map(PathBuf::from))
        .ok_or_else(|| LevtraderError::missing("data", "dir"))
}

fn run_optimize(
    config_path: &Path,
    data_dir: Option<PathBuf>,
    parallel: bool,
) -> Result<(), LevtraderError> {
    let run = load_config(config_path)?;
    let adapter = CsvAdapter::new(resolve_data_dir(&run, data_dir)?);
    let report = run_optimization_pipeline(&run, &adapter, &adapter, parallel)?;
    ConsoleReportAdapter::new().write(&report)
}

fn run_single(
    config_path: &Path,
    data_dir: Option<PathBuf>,
    params: StrategyParameters,
) -> Result<(), LevtraderError> {
    let run = load_config(config_path)?;
    let adapter = CsvAdapter::new(resolve_data_dir(&run, data_dir)?);
    let report = run_single_pipeline(&run, &adapter, &adapter, params)?;
    ConsoleReportAdapter::new().write(&report)
}

fn run_validate(config_path: &Path) -> Result<(), LevtraderError> {
    let run = load_config(config_path)?;
    let profile = &run.profile;
    println!("Config validated successfully");
    println!("  Strategy:   {} ({})", profile.name, profile.symbol);
    println!("  Window:     {} to {}", run.start_date, run.end_date);
    println!("  Leverage:   x{}", profile.leverage);
    if let Some(vol) = &profile.volatility {
        println!("  Volatility: {}", vol.symbol);
    }
    if let Some(mac) = &profile.macro_overlay {
        println!("  Macro:      {} ({:?})", mac.series, mac.policy);
    }
    println!("  Grid size:  {}", run.grid.size());
    Ok(())
}

/// Fetch every series the profile needs and align them on trading days.
pub fn load_market_frame(
    run: &RunConfig,
    market: &dyn MarketDataPort,
    macro_data: &dyn MacroDataPort,
) -> Result<MarketFrame, LevtraderError> {
    let profile = &run.profile;
    log::info!(
        "Fetching {} from {} to {}",
        profile.symbol,
        run.start_date,
        run.end_date
    );
    let instrument = market.fetch_closes(&profile.symbol, run.start_date, run.end_date)?;

    let cash = match &profile.cash_symbol {
        Some(symbol) => Some(market.fetch_closes(symbol, run.start_date, run.end_date)?),
        None => {
            log::warn!("{}: no cash symbol configured, idle capital earns 0", profile.symbol);
            None
        }
    };
    let volatility = match &profile.volatility {
        Some(overlay) => Some(market.fetch_closes(&overlay.symbol, run.start_date, run.end_date)?),
        None => None,
    };
    let macro_observations = match &profile.macro_overlay {
        Some(overlay) => {
            Some(macro_data.fetch_observations(&overlay.series, run.start_date, run.end_date)?)
        }
        None => None,
    };

    MarketFrame::join(
        &instrument,
        cash.as_ref(),
        volatility.as_ref(),
        macro_observations.as_deref(),
    )
}

fn prepare(
    run: &RunConfig,
    market: &dyn MarketDataPort,
    macro_data: &dyn MacroDataPort,
) -> Result<PreparedSeries, LevtraderError> {
    let frame = load_market_frame(run, market, macro_data)?;
    let series = frame.prepare(&run.profile)?;
    log::info!(
        "{}: {} usable trading days",
        run.profile.symbol,
        series.len()
    );
    Ok(series)
}

fn build_report(
    run: &RunConfig,
    series: &PreparedSeries,
    result: &BacktestResult,
    evaluated: usize,
) -> Result<OptimizationReport, LevtraderError> {
    let ema = series.ema(result.parameters.ma_period);
    OptimizationReport::build(&run.profile, series, &ema, result, evaluated).ok_or_else(|| {
        LevtraderError::InsufficientData {
            symbol: series.symbol.clone(),
            rows: result.positions.len(),
            minimum: MIN_PREPARED_ROWS,
        }
    })
}

/// Fetch, search the grid, re-run the winner and build its report.
pub fn run_optimization_pipeline(
    run: &RunConfig,
    market: &dyn MarketDataPort,
    macro_data: &dyn MacroDataPort,
    parallel: bool,
) -> Result<OptimizationReport, LevtraderError> {
    run.grid.validate()?;
    let series = prepare(run, market, macro_data)?;
    let outcome = Optimizer::new(&series, &run.profile)
        .with_parallelism(parallel)
        .run(&run.grid)?;
    build_report(run, &series, &outcome.result, outcome.evaluated)
}

/// Fetch and evaluate one explicit tuple.
pub fn run_single_pipeline(
    run: &RunConfig,
    market: &dyn MarketDataPort,
    macro_data: &dyn MacroDataPort,
    params: StrategyParameters,
) -> Result<OptimizationReport, LevtraderError> {
    if params.ma_period == 0 {
        return Err(LevtraderError::invalid("backtest", "ma", "must be positive"));
    }
    if params.vix_panic_line.is_some() && run.profile.volatility.is_none() {
        return Err(LevtraderError::invalid(
            "backtest",
            "vix",
            "requires a [volatility] section",
        ));
    }
    if params.macro_threshold.is_some() && run.profile.macro_overlay.is_none() {
        return Err(LevtraderError::invalid(
            "backtest",
            "macro_threshold",
            "requires a [macro] section",
        ));
    }

    let series = prepare(run, market, macro_data)?;
    let ema = series.ema(params.ma_period);
    let result = run_backtest(&series, &ema, &run.profile, &params);
    log::info!(
        "{}: {} -> {:.2}x",
        run.profile.name,
        params,
        result.cumulative_multiple
    );
    build_report(run, &series, &result, 1)
}
