//! End-to-end runner tests over real CSV files in a temp directory.

use barsim_runner::{
    run_backtest, run_sweep, BacktestConfig, CsvBarSource, RunError, ThresholdDip,
};
use std::io::Write;
use std::path::Path;

fn write_csv(dir: &Path, symbol: &str, rows: &[(&str, f64, f64, f64, f64)]) {
    let mut file = std::fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
    writeln!(file, "datetime,open,high,low,close,volume").unwrap();
    for (dt, open, high, low, close) in rows {
        writeln!(file, "{dt} 15:00:00,{open},{high},{low},{close},1000").unwrap();
    }
}

fn sample_config() -> BacktestConfig {
    BacktestConfig::from_toml_str(
        r#"
        symbols = ["CU.SHFE"]
        interval = "daily"
        start = "2024-01-01"
        end = "2024-02-01"
        capital = 1000000.0
        warmup_days = 0

        [instruments."CU.SHFE"]
        size = 1.0
        rate = 0.0
        slippage = 0.0
        price_tick = 0.01
        "#,
    )
    .unwrap()
}

fn seed_data(dir: &Path) {
    write_csv(
        dir,
        "CU.SHFE",
        &[
            ("2024-01-02", 100.0, 101.0, 99.5, 100.0),
            ("2024-01-03", 99.5, 100.0, 98.0, 99.0),
            ("2024-01-04", 100.5, 101.0, 100.0, 100.5),
            ("2024-01-05", 100.0, 100.5, 99.0, 100.0),
        ],
    );
}

#[test]
fn threshold_dip_round_trips_through_the_whole_stack() {
    let dir = tempfile::tempdir().unwrap();
    seed_data(dir.path());

    let config = sample_config();
    let source = CsvBarSource::new(dir.path());
    let report = run_backtest(&config, &source, ThresholdDip::new(0.01, 0.01, 1.0)).unwrap();

    // Day 3 fills the resting bid from day 2; day 4 fills the closing
    // offer; day 5 re-enters.
    assert!(report.trades.len() >= 3);
    assert_eq!(report.daily_results.len(), 4);
    assert_eq!(report.statistics.total_days, 4);
    assert_eq!(
        report.statistics.total_trade_count,
        report.trades.len()
    );
    assert!(report
        .daily_results
        .windows(2)
        .all(|w| w[0].date < w[1].date));
    assert!(!report.logs.is_empty());
    assert!(!report.run_token.is_empty());

    // Daily trade counts aggregate to the engine's trade list.
    let ledger_trades: usize = report.daily_results.iter().map(|d| d.trade_count).sum();
    assert_eq!(ledger_trades, report.trades.len());
}

#[test]
fn first_fill_happens_at_the_resting_bid_with_price_improvement() {
    let dir = tempfile::tempdir().unwrap();
    seed_data(dir.path());

    let config = sample_config();
    let source = CsvBarSource::new(dir.path());
    let report = run_backtest(&config, &source, ThresholdDip::new(0.01, 0.01, 1.0)).unwrap();

    // Bid placed at 100 * 0.99 = 99; day 3 opens at 99.5, so the fill is
    // min(99, 99.5) = 99.
    let first = &report.trades[0];
    assert_eq!(first.price, 99.0);
    assert_eq!(first.volume, 1.0);
    assert_eq!(first.datetime.date_naive().to_string(), "2024-01-03");
}

#[test]
fn missing_instrument_entry_fails_before_the_engine_starts() {
    let dir = tempfile::tempdir().unwrap();
    seed_data(dir.path());

    let mut config = sample_config();
    config.symbols.push("RB.SHFE".into());
    let source = CsvBarSource::new(dir.path());
    let err = run_backtest(&config, &source, ThresholdDip::new(0.01, 0.01, 1.0)).unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
}

#[test]
fn sweep_produces_one_isolated_report_per_config() {
    let dir = tempfile::tempdir().unwrap();
    seed_data(dir.path());

    let base = sample_config();
    let mut richer = base.clone();
    richer.capital = 2_000_000.0;
    let configs = vec![base, richer];

    let reports = run_sweep(&configs, dir.path(), |_| ThresholdDip::new(0.01, 0.01, 1.0));
    assert_eq!(reports.len(), 2);

    let reports: Vec<_> = reports.into_iter().map(|r| r.unwrap()).collect();
    assert_ne!(reports[0].run_token, reports[1].run_token);
    assert_eq!(reports[0].trades.len(), reports[1].trades.len());
    assert_eq!(reports[0].statistics.capital, 1_000_000.0);
    assert_eq!(reports[1].statistics.capital, 2_000_000.0);

    // Distinct engines, distinct run-scoped ids.
    let run_a = &reports[0].trades[0].id.run;
    let run_b = &reports[1].trades[0].id.run;
    assert_ne!(run_a, run_b);
}
