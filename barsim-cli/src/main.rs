//! barsim CLI — run backtests and sweeps from TOML configs.
//!
//! Commands:
//! - `run` — execute one backtest and print the statistics summary
//! - `sweep` — run several configs in parallel and print one summary line each

use anyhow::{Context as _, Result};
use barsim_runner::{run_backtest, run_sweep, BacktestConfig, CsvBarSource, ThresholdDip};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "barsim", about = "barsim CLI — portfolio bar-replay backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Directory of per-symbol CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Entry bid discount as a fraction of close.
        #[arg(long, default_value_t = 0.01)]
        entry_discount: f64,

        /// Exit offer premium as a fraction of close.
        #[arg(long, default_value_t = 0.01)]
        exit_premium: f64,

        /// Order volume per entry.
        #[arg(long, default_value_t = 1.0)]
        volume: f64,

        /// Print the engine log after the summary.
        #[arg(long, default_value_t = false)]
        verbose: bool,

        /// Emit the daily results as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run several configs in parallel, one isolated engine each.
    Sweep {
        /// Paths to TOML configs.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Directory of per-symbol CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Entry bid discount as a fraction of close.
        #[arg(long, default_value_t = 0.01)]
        entry_discount: f64,

        /// Exit offer premium as a fraction of close.
        #[arg(long, default_value_t = 0.01)]
        exit_premium: f64,

        /// Order volume per entry.
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Run {
            config,
            data_dir,
            entry_discount,
            exit_premium,
            volume,
            verbose,
            json,
        } => {
            let config = BacktestConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let source = CsvBarSource::new(&data_dir);
            let strategy = ThresholdDip::new(entry_discount, exit_premium, volume);
            let report = run_backtest(&config, &source, strategy)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report.daily_results)?);
            } else {
                println!("run {}", report.run_token);
                println!("{}", report.statistics);
            }
            if verbose {
                for line in &report.logs {
                    eprintln!("{line}");
                }
            }
        }
        Commands::Sweep {
            configs,
            data_dir,
            entry_discount,
            exit_premium,
            volume,
        } => {
            let configs = configs
                .iter()
                .map(|path| {
                    BacktestConfig::load(path)
                        .with_context(|| format!("loading {}", path.display()))
                })
                .collect::<Result<Vec<_>>>()?;

            let reports = run_sweep(&configs, &data_dir, |_| {
                ThresholdDip::new(entry_discount, exit_premium, volume)
            });
            for (config, report) in configs.iter().zip(reports) {
                match report {
                    Ok(report) => println!(
                        "{}  days={:<4} trades={:<5} net_pnl={:<14.2} sharpe={:.2}",
                        report.run_token,
                        report.statistics.total_days,
                        report.statistics.total_trade_count,
                        report.statistics.total_net_pnl,
                        report.statistics.sharpe_ratio,
                    ),
                    Err(err) => println!("{}  FAILED: {err}", config.run_token()),
                }
            }
        }
    }
    Ok(())
}
