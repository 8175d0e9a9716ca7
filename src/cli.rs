//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::InMemoryMarketData;
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, BacktestRunner, RunSummary, DEFAULT_FEE_RATE,
    DEFAULT_INITIAL_CAPITAL, DEFAULT_PORTFOLIO_SIZE,
};
use crate::domain::config_validation::{
    parse_date, parse_number, validate_backtest_config, WEIGHT_KEYS,
};
use crate::domain::error::MomentumError;
use crate::domain::score::{Factor, FactorWeights};
use crate::domain::scorer::MomentumScorer;
use crate::domain::signal::MomentumSignals;
use crate::domain::universe::{parse_symbols, ListedUniverse, RepositoryUniverse};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::universe_port::UniverseProvider;

pub const DEFAULT_BENCHMARK: &str = "SPY";

#[derive(Parser, Debug)]
#[command(name = "momentum-backtest", about = "Quarterly momentum strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a quarterly backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV file for per-period results (overrides [report] output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Validate and print the settings without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Score and rank the universe on one date
    Score {
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluation date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },
    /// Validate a configuration file and its data directory
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref())
            }
        }
        Command::Score { config, date, top } => run_score(&config, date, top),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &MomentumError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, MomentumError> {
    let start_date = parse_date(adapter, "start_date")?;
    let end_date = parse_date(adapter, "end_date")?;

    let portfolio_size = adapter.get_int("backtest", "portfolio_size", DEFAULT_PORTFOLIO_SIZE as i64);
    let portfolio_size = usize::try_from(portfolio_size).map_err(|_| {
        MomentumError::invalid("backtest", "portfolio_size", "must be at least 1")
    })?;

    let config = BacktestConfig {
        start_date,
        end_date,
        initial_capital: parse_number(adapter, "backtest", "initial_capital")?
            .unwrap_or(DEFAULT_INITIAL_CAPITAL),
        portfolio_size,
        fee_rate: parse_number(adapter, "backtest", "fee_rate")?.unwrap_or(DEFAULT_FEE_RATE),
    };
    config.validate()?;
    Ok(config)
}

/// Base weights from `[scoring]`, falling back per key to the defaults.
pub fn build_weights(adapter: &dyn ConfigPort) -> Result<FactorWeights, MomentumError> {
    let defaults = FactorWeights::default();
    let mut values = [0.0; 5];
    for (key, factor) in WEIGHT_KEYS.iter().zip(Factor::ALL) {
        values[factor.index()] =
            parse_number(adapter, "scoring", key)?.unwrap_or(defaults.get(factor));
    }
    let weights = FactorWeights::new(values[0], values[1], values[2], values[3], values[4]);
    if !weights.is_normalized() {
        return Err(MomentumError::invalid(
            "scoring",
            WEIGHT_KEYS[0],
            format!("weights must sum to 1, got {}", weights.sum()),
        ));
    }
    Ok(weights)
}

/// The configured symbol list, or `None` to use every known symbol.
pub fn resolve_symbols(adapter: &dyn ConfigPort) -> Result<Option<Vec<String>>, MomentumError> {
    match adapter.get_string("backtest", "symbols") {
        Some(raw) if !raw.trim().is_empty() => parse_symbols(&raw)
            .map(Some)
            .map_err(|e| MomentumError::invalid("backtest", "symbols", e.to_string())),
        _ => Ok(None),
    }
}

pub fn resolve_benchmark(adapter: &dyn ConfigPort) -> String {
    adapter
        .get_string("data", "benchmark")
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string())
}

pub fn load_market_data(adapter: &dyn ConfigPort) -> Result<InMemoryMarketData, MomentumError> {
    let path = adapter
        .get_string("data", "path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| MomentumError::missing("data", "path"))?;
    csv_adapter::load_directory(Path::new(path.trim()), &resolve_benchmark(adapter))
}

/// Validate, run and optionally write the report. Separated from
/// [`run_backtest`] so it can be driven with any repository.
pub fn run_backtest_pipeline(
    adapter: &dyn ConfigPort,
    port: &dyn MarketDataPort,
    output_path: Option<&Path>,
) -> Result<BacktestResult, MomentumError> {
    validate_backtest_config(adapter)?;
    let config = build_backtest_config(adapter)?;
    let weights = build_weights(adapter)?;

    let listed;
    let everything;
    let universe: &dyn UniverseProvider = match resolve_symbols(adapter)? {
        Some(symbols) => {
            listed = ListedUniverse::new(port, symbols);
            &listed
        }
        None => {
            everything = RepositoryUniverse::new(port);
            &everything
        }
    };

    let runner = BacktestRunner::new(port, MomentumScorer::new(weights));
    let result = runner.run(&config, universe)?;

    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| {
            adapter
                .get_string("report", "output")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(s.trim()))
        });
    if let Some(path) = output {
        CsvReportAdapter::new().write(&result, &path)?;
        eprintln!("\nResults written to: {}", path.display());
    }

    Ok(result)
}

fn run_backtest(config_path: &Path, output_path: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data = match load_market_data(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    match run_backtest_pipeline(&adapter, &data, output_path) {
        Ok(result) => {
            print_summary(&result);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn print_summary(result: &BacktestResult) {
    if !result.periods.is_empty() {
        eprintln!("\n=== Periods ===");
        for p in &result.periods {
            let flag = if p.is_degraded() { " *" } else { "" };
            eprintln!(
                "  Q{:<3} {} .. {}  {:>8.2}%  bench {:>7.2}%  excess {:>7.2}%  ${:>12.2}  [{}]{}",
                p.quarter_index,
                p.start_date,
                p.end_date,
                p.portfolio_return * 100.0,
                p.benchmark_return * 100.0,
                p.excess_return * 100.0,
                p.portfolio_value_after_rebalance,
                p.selected_symbols.join(", "),
                flag,
            );
        }
    }

    if !result.skipped.is_empty() {
        eprintln!("\n=== Skipped ===");
        for s in &result.skipped {
            eprintln!("  Q{:<3} {}  {}", s.quarter_index, s.period.start_date, s.reason);
        }
    }

    match &result.summary {
        RunSummary::NoPeriodsProcessed => {
            eprintln!("\nNo quarterly periods processed");
        }
        RunSummary::Completed(m) => {
            eprintln!("\n=== Summary ===");
            eprintln!("Quarters:          {}", m.num_periods);
            eprintln!("Final Value:       ${:.2}", m.final_value);
            eprintln!("Total Return:      {:.2}%", m.total_return * 100.0);
            eprintln!("Annual Return:     {:.2}%", m.annual_return * 100.0);
            eprintln!("Volatility:        {:.2}%", m.portfolio_volatility * 100.0);
            eprintln!("Bench Volatility:  {:.2}%", m.benchmark_volatility * 100.0);
            eprintln!("Sharpe Ratio:      {:.2}", m.sharpe_ratio);
            eprintln!("Outperformance:    {:.1}%", m.outperformance_rate * 100.0);
            eprintln!("Avg Excess Return: {:.2}%", m.average_excess_return * 100.0);
            eprintln!("Max Drawdown:      -{:.1}%", m.max_drawdown * 100.0);
            eprintln!("Positive Quarters: {}", m.positive_periods);
            eprintln!("Negative Quarters: {}", m.negative_periods);
            eprintln!("Transaction Costs: ${:.2}", m.total_transaction_costs);
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let weights = match build_weights(&adapter) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };

    eprintln!("Config validated successfully");
    eprintln!("\nBacktest:");
    eprintln!("  period:          {} to {}", config.start_date, config.end_date);
    eprintln!("  initial capital: {:.2}", config.initial_capital);
    eprintln!("  portfolio size:  {}", config.portfolio_size);
    eprintln!("  fee rate:        {}", config.fee_rate);

    eprintln!("\nWeights:");
    for f in Factor::ALL {
        eprintln!("  {:<20} {:.3}", f.name(), weights.get(f));
    }

    eprintln!("\nUniverse:");
    eprintln!("  benchmark: {}", resolve_benchmark(&adapter));
    match resolve_symbols(&adapter) {
        Ok(Some(symbols)) => eprintln!("  symbols: {}", symbols.join(", ")),
        Ok(None) => eprintln!("  symbols: all in data directory"),
        Err(e) => return fail(&e),
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_score(config_path: &Path, date: NaiveDate, top: usize) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let weights = match build_weights(&adapter) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };
    let data = match load_market_data(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let symbols = match resolve_symbols(&adapter) {
        Ok(Some(listed)) => ListedUniverse::new(&data, listed).eligible_symbols(date),
        Ok(None) => data.get_known_symbols(date),
        Err(e) => Err(e),
    };
    let symbols = match symbols {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols with price history on or before {date}");
        return ExitCode::SUCCESS;
    }

    let ranked = MomentumScorer::new(weights).score_universe(&data, &symbols, date);
    println!(
        "{:>4}  {:<8} {:>9} {:>8} {:>8} {:>8} {:>8} {:>8}  {:<11} {:<8}",
        "rank", "symbol", "combined", "rs", "eps", "price", "pe", "volume", "overall", "trend"
    );
    for set in ranked.iter().take(top) {
        let signals = MomentumSignals::classify(set);
        println!(
            "{:>4}  {:<8} {:>9.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}  {:<11} {:<8}{}",
            set.rank,
            set.symbol,
            set.combined_score,
            set.scores.rs_vs_benchmark,
            set.scores.eps_momentum,
            set.scores.price_momentum,
            set.scores.valuation_momentum,
            set.scores.volume_momentum,
            signals.overall.to_string(),
            signals.price.to_string(),
            if set.issues.is_empty() { "" } else { " *" },
        );
    }
    eprintln!("{} of {} symbols shown", ranked.len().min(top), ranked.len());
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!("  configuration: OK");

    let data = match load_market_data(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let benchmark = resolve_benchmark(&adapter);
    let known = match data.get_known_symbols(config.start_date) {
        Ok(k) => k,
        Err(e) => return fail(&e),
    };
    eprintln!("  symbols in data directory: {}", data.symbol_count());
    eprintln!("  eligible on {}: {}", config.start_date, known.len());

    match data.get_benchmark_prices(config.start_date, config.end_date) {
        Ok(bars) if !bars.is_empty() => eprintln!("  benchmark {benchmark}: {} bars", bars.len()),
        Ok(_) => eprintln!("  warning: benchmark {benchmark} has no data in the backtest range"),
        Err(e) => return fail(&e),
    }

    if let Ok(Some(listed)) = resolve_symbols(&adapter) {
        match ListedUniverse::new(&data, listed).missing_symbols(config.end_date) {
            Ok(missing) if !missing.is_empty() => {
                eprintln!("  warning: no price data for {}", missing.join(", "));
            }
            Ok(_) => {}
            Err(e) => return fail(&e),
        }
    }

    if known.len() < config.portfolio_size {
        eprintln!(
            "  warning: only {} symbols eligible at start, portfolio_size is {}; early quarters will be skipped",
            known.len(),
            config.portfolio_size
        );
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
