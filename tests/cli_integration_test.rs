//! CLI integration tests for config loading and the CSV-backed pipeline.
//!
//! Tests cover:
//! - Config loading from real INI files on disk
//! - Validation errors and their exit codes
//! - Full pipeline over a directory of CSV files
//! - Subcommand dispatch through `cli::run`

mod common;

use common::*;
use levtrader::adapters::console_report::ConsoleReportAdapter;
use levtrader::adapters::csv_adapter::CsvAdapter;
use levtrader::cli::{self, Cli};
use levtrader::domain::error::LevtraderError;
use levtrader::domain::overlay::MacroPolicy;
use levtrader::domain::strategy::{Ladder, StrategyParameters};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_code_of(err: &LevtraderError) -> String {
    format!("{:?}", ExitCode::from(err))
}

fn same_code(actual: ExitCode, expected: u8) -> bool {
    format!("{:?}", actual) == format!("{:?}", ExitCode::from(expected))
}

const VALID_INI: &str = r#"
[instrument]
name = QQQ -> TQQQ
symbol = QQQ
cash_symbol = SHY
leverage = 3
start_date = 2020-01-01
end_date = 2020-12-31

[grid]
ma_periods = 10,20
rsi_limits = 70:80:5
sell_buffers = 0,0.02
"#;

const OVERLAY_INI: &str = r#"
[instrument]
name = PLTR + VIX + HY
symbol = QQQ
start_date = 2020-01-01
end_date = 2020-12-31

[volatility]
symbol = VIX
ma_span = 50
ma_multiple = 1.2
calm_ceiling = 20

[macro]
series = BAMLH0A0HYM2
signal = ratio_to_average
window = 20
breach = above
threshold = 1.05
lag = 1
policy = veto

[grid]
ma_periods = 20
rsi_limits = 80
sell_buffers = 0.02
vix_panic_lines = 30,35
macro_thresholds = 1.05,1.1
"#;

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[(String, String)]) {
    let mut content = format!("{}\n", header);
    for (date, value) in rows {
        content.push_str(&format!("{},{}\n", date, value));
    }
    std::fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
}

fn dated(values: &[f64]) -> Vec<(String, String)> {
    make_bars(start_date(), values)
        .iter()
        .map(|b| (b.date.to_string(), b.close.to_string()))
        .collect()
}

/// QQQ, SHY, VIX and a FRED-style spread file with `.` gaps.
fn write_market_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let closes = rise_crash_flat();
    write_csv(dir.path(), "QQQ", "Date,Open,Close", &{
        make_bars(start_date(), &closes)
            .iter()
            .map(|b| (b.date.to_string(), format!("{},{}", b.close, b.close)))
            .collect::<Vec<_>>()
    });
    let cash: Vec<f64> = (0..closes.len()).map(|i| 80.0 + i as f64 * 0.001).collect();
    write_csv(dir.path(), "SHY", "date,close", &dated(&cash));
    write_csv(dir.path(), "VIX", "date,close", &dated(&vec![16.0; closes.len()]));

    let mut spread = dated(&vec![4.0; closes.len()]);
    for row in spread.iter_mut().skip(50).step_by(7) {
        row.1 = ".".to_string();
    }
    write_csv(dir.path(), "BAMLH0A0HYM2", "observation_date,BAMLH0A0HYM2", &spread);
    dir
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_from_file() {
        let file = write_temp_ini(VALID_INI);
        let run = cli::load_config(file.path()).unwrap();

        assert_eq!(run.profile.symbol, "QQQ");
        assert_eq!(run.profile.cash_symbol.as_deref(), Some("SHY"));
        assert_eq!(run.profile.leverage, 3.0);
        assert_eq!(run.profile.ladder, Ladder::pyramid_default());
        assert_eq!(run.start_date, date(2020, 1, 1));
        assert_eq!(run.end_date, date(2020, 12, 31));
        assert_eq!(run.grid.ma_periods, vec![10, 20]);
        assert_eq!(run.grid.rsi_limits, vec![70.0, 75.0, 80.0]);
        assert_eq!(run.grid.size(), 12);
        assert!(run.data_dir.is_none());
    }

    #[test]
    fn load_config_with_overlays() {
        let file = write_temp_ini(OVERLAY_INI);
        let run = cli::load_config(file.path()).unwrap();

        let vol = run.profile.volatility.as_ref().unwrap();
        assert_eq!(vol.symbol, "VIX");
        assert_eq!(vol.calm_ceiling, Some(20.0));
        let mac = run.profile.macro_overlay.as_ref().unwrap();
        assert_eq!(mac.lag, 1);
        assert_eq!(mac.policy, MacroPolicy::Veto);
        assert_eq!(run.grid.size(), 4);
    }

    #[test]
    fn missing_file_is_parse_error() {
        let err = cli::load_config(Path::new("/nonexistent/levtrader.ini")).unwrap_err();
        assert!(matches!(err, LevtraderError::ConfigParse { .. }));
        assert_eq!(exit_code_of(&err), format!("{:?}", ExitCode::from(2)));
    }

    #[test]
    fn missing_grid_key_is_reported() {
        let ini = VALID_INI.replace("sell_buffers = 0,0.02\n", "");
        let file = write_temp_ini(&ini);
        let err = cli::load_config(file.path()).unwrap_err();
        match err {
            LevtraderError::ConfigMissing { section, key } => {
                assert_eq!(section, "grid");
                assert_eq!(key, "sell_buffers");
            }
            other => panic!("expected ConfigMissing, got {:?}", other),
        }
    }

    #[test]
    fn overlay_grid_without_overlay_section_is_invalid() {
        let ini = format!("{}vix_panic_lines = 30\n", VALID_INI);
        let file = write_temp_ini(&ini);
        let err = cli::load_config(file.path()).unwrap_err();
        assert!(matches!(err, LevtraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn reversed_dates_are_invalid() {
        let ini = VALID_INI.replace("end_date = 2020-12-31", "end_date = 2019-06-30");
        let file = write_temp_ini(&ini);
        let err = cli::load_config(file.path()).unwrap_err();
        assert!(matches!(err, LevtraderError::ConfigInvalid { .. }));
    }
}

mod csv_pipeline {
    use super::*;

    #[test]
    fn optimize_over_csv_directory() {
        let dir = write_market_dir();
        let file = write_temp_ini(VALID_INI);
        let run = cli::load_config(file.path()).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let report = cli::run_optimization_pipeline(&run, &adapter, &adapter, true).unwrap();
        assert_eq!(report.evaluated, 12);
        assert_eq!(report.symbol, "QQQ");
        assert!(report.metrics.cumulative_multiple > 1.0);
        assert!(report.metrics.benchmark_multiple > 0.0);

        let text = ConsoleReportAdapter::new().render(&report);
        assert!(text.contains("QQQ -> TQQQ"));
        assert!(text.contains("Tuples evaluated:  12"));
        assert!(text.contains("Recommendation for"));
    }

    #[test]
    fn csv_and_parallel_settings_agree() {
        let dir = write_market_dir();
        let file = write_temp_ini(VALID_INI);
        let run = cli::load_config(file.path()).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let parallel = cli::run_optimization_pipeline(&run, &adapter, &adapter, true).unwrap();
        let sequential = cli::run_optimization_pipeline(&run, &adapter, &adapter, false).unwrap();
        assert_eq!(parallel.parameters, sequential.parameters);
        assert_eq!(parallel.positions, sequential.positions);
    }

    #[test]
    fn overlays_from_csv_with_fred_gaps() {
        let dir = write_market_dir();
        let file = write_temp_ini(OVERLAY_INI);
        let run = cli::load_config(file.path()).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let report = cli::run_optimization_pipeline(&run, &adapter, &adapter, true).unwrap();
        assert_eq!(report.evaluated, 4);
        let vol = report.recommendation.volatility.unwrap();
        assert!(!vol.panic);
        assert!(vol.calm);
        let mac = report.recommendation.macro_state.unwrap();
        assert!(!mac.breached);
        assert!((mac.reading.value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_tuple_over_csv() {
        let dir = write_market_dir();
        let file = write_temp_ini(VALID_INI);
        let run = cli::load_config(file.path()).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let params = StrategyParameters::new(20, 80.0, 0.02);
        let report = cli::run_single_pipeline(&run, &adapter, &adapter, params).unwrap();
        assert_eq!(report.parameters, params);
        assert_eq!(report.evaluated, 1);
    }

    #[test]
    fn missing_symbol_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(VALID_INI);
        let run = cli::load_config(file.path()).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = cli::run_optimization_pipeline(&run, &adapter, &adapter, true).unwrap_err();
        assert!(matches!(err, LevtraderError::DataFetch { .. }));
        assert_eq!(exit_code_of(&err), format!("{:?}", ExitCode::from(5)));
    }
}

mod dispatch {
    use super::*;

    #[test]
    fn validate_subcommand_succeeds() {
        let file = write_temp_ini(OVERLAY_INI);
        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["levtrader", "validate", "--config", path]).unwrap();
        assert!(same_code(cli::run(cli), 0));
    }

    #[test]
    fn optimize_with_data_dir_flag() {
        let dir = write_market_dir();
        let file = write_temp_ini(VALID_INI);
        let cli = Cli::try_parse_from([
            "levtrader",
            "optimize",
            "--config",
            file.path().to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--sequential",
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 0));
    }

    #[test]
    fn data_dir_from_config() {
        let dir = write_market_dir();
        let ini = format!("{}\n[data]\ndir = {}\n", VALID_INI, dir.path().display());
        let file = write_temp_ini(&ini);
        let cli = Cli::try_parse_from([
            "levtrader",
            "backtest",
            "--config",
            file.path().to_str().unwrap(),
            "--ma",
            "20",
            "--rsi",
            "80",
            "--buffer",
            "0.02",
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 0));
    }

    #[test]
    fn missing_data_dir_is_config_error() {
        let file = write_temp_ini(VALID_INI);
        let cli = Cli::try_parse_from([
            "levtrader",
            "optimize",
            "--config",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 2));
    }

    #[test]
    fn empty_data_dir_exits_with_data_code() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_temp_ini(VALID_INI);
        let cli = Cli::try_parse_from([
            "levtrader",
            "optimize",
            "--config",
            file.path().to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(same_code(cli::run(cli), 5));
    }

    #[test]
    fn backtest_requires_tuple_arguments() {
        let result =
            Cli::try_parse_from(["levtrader", "backtest", "--config", "x.ini", "--ma", "20"]);
        assert!(result.is_err());
    }
}
