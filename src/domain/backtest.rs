//! Quarterly backtest loop.
//!
//! The runner walks [`QuarterPeriod`]s in order. Each processed period scores
//! the eligible universe at its start date, rebalances into the top N and
//! measures the return of that allocation to the period's end. Periods that
//! cannot be rebalanced are recorded as [`SkippedPeriod`]s and leave the
//! portfolio untouched.

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use super::error::MomentumError;
use super::metrics::PerformanceSummary;
use super::period::{quarterly_periods, QuarterPeriod};
use super::portfolio::Portfolio;
use super::score::Factor;
use super::scorer::MomentumScorer;
use super::series::nearest_close;
use crate::ports::data_port::MarketDataPort;
use crate::ports::universe_port::UniverseProvider;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_PORTFOLIO_SIZE: usize = 5;
pub const DEFAULT_FEE_RATE: f64 = 0.001;

/// Calendar days either side of a date searched for a close.
pub const PRICE_LOOKUP_WINDOW_DAYS: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub portfolio_size: usize,
    pub fee_rate: f64,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            portfolio_size: DEFAULT_PORTFOLIO_SIZE,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }

    pub fn validate(&self) -> Result<(), MomentumError> {
        if self.start_date > self.end_date {
            return Err(MomentumError::invalid(
                "backtest",
                "end_date",
                format!(
                    "end_date {} is before start_date {}",
                    self.end_date, self.start_date
                ),
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(MomentumError::invalid(
                "backtest",
                "initial_capital",
                "must be a positive number",
            ));
        }
        if self.portfolio_size == 0 {
            return Err(MomentumError::invalid(
                "backtest",
                "portfolio_size",
                "must be at least 1",
            ));
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(MomentumError::invalid(
                "backtest",
                "fee_rate",
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Why a period produced no result.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UniverseUnavailable { reason: String },
    UniverseTooSmall { eligible: usize, required: usize },
    PriceUnresolvable { priced: usize, required: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UniverseUnavailable { reason } => {
                write!(f, "universe unavailable: {reason}")
            }
            SkipReason::UniverseTooSmall { eligible, required } => {
                write!(f, "universe too small: {eligible} < {required}")
            }
            SkipReason::PriceUnresolvable { priced, required } => {
                write!(f, "not enough prices: {priced} < {required}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPeriod {
    pub quarter_index: usize,
    pub period: QuarterPeriod,
    pub reason: SkipReason,
}

/// Non-fatal degradation observed while processing a period.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodDiagnostic {
    /// A selected symbol was scored with failed factor lookups.
    DegradedScore { symbol: String, failed: Vec<Factor> },
    /// A price lookup failed in the repository.
    PriceLookupFailed { symbol: String, reason: String },
    /// Held at rebalance without a price; cleared with no proceeds.
    DroppedPosition { symbol: String },
    /// Target order did not fit the available cash.
    UnfundedPurchase { symbol: String },
    /// Held at quarter end without a price; valued at 0.
    UnvaluedAtQuarterEnd { symbol: String },
    /// No benchmark closes inside the period; benchmark return taken as 0.
    MissingBenchmark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    /// 1-based position among all generated periods, skipped ones included.
    pub quarter_index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub selected_symbols: Vec<String>,
    pub selected_scores: Vec<f64>,
    pub portfolio_return: f64,
    pub benchmark_return: f64,
    pub excess_return: f64,
    /// Value recorded by the previous rebalance.
    pub portfolio_value_before: f64,
    pub portfolio_value_after_rebalance: f64,
    pub portfolio_value_at_end: f64,
    pub transaction_costs: f64,
    pub diagnostics: Vec<PeriodDiagnostic>,
}

impl PeriodResult {
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunSummary {
    Completed(PerformanceSummary),
    NoPeriodsProcessed,
}

impl RunSummary {
    pub fn performance(&self) -> Option<&PerformanceSummary> {
        match self {
            RunSummary::Completed(summary) => Some(summary),
            RunSummary::NoPeriodsProcessed => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub periods: Vec<PeriodResult>,
    pub skipped: Vec<SkippedPeriod>,
    pub summary: RunSummary,
    pub portfolio: Portfolio,
}

impl BacktestResult {
    pub fn degraded_periods(&self) -> impl Iterator<Item = &PeriodResult> {
        self.periods.iter().filter(|p| p.is_degraded())
    }
}

pub struct BacktestRunner<'a> {
    port: &'a dyn MarketDataPort,
    scorer: MomentumScorer,
}

impl<'a> BacktestRunner<'a> {
    pub fn new(port: &'a dyn MarketDataPort, scorer: MomentumScorer) -> Self {
        BacktestRunner { port, scorer }
    }

    /// Run the whole horizon. Only an invalid config is an error.
    pub fn run(
        &self,
        config: &BacktestConfig,
        universe: &dyn UniverseProvider,
    ) -> Result<BacktestResult, MomentumError> {
        config.validate()?;

        let periods = quarterly_periods(config.start_date, config.end_date);
        let mut portfolio = Portfolio::new(config.initial_capital);
        let mut results = Vec::new();
        let mut skipped = Vec::new();

        info!(
            start = %config.start_date,
            end = %config.end_date,
            periods = periods.len(),
            portfolio_size = config.portfolio_size,
            "starting backtest"
        );

        for (i, period) in periods.iter().enumerate() {
            let quarter_index = i + 1;
            match self.run_period(quarter_index, period, config, &mut portfolio, universe) {
                Ok(result) => {
                    info!(
                        quarter = quarter_index,
                        start = %result.start_date,
                        value = result.portfolio_value_after_rebalance,
                        portfolio_return = result.portfolio_return,
                        benchmark_return = result.benchmark_return,
                        costs = result.transaction_costs,
                        "period processed"
                    );
                    results.push(result);
                }
                Err(reason) => {
                    warn!(quarter = quarter_index, start = %period.start_date, %reason, "period skipped");
                    skipped.push(SkippedPeriod {
                        quarter_index,
                        period: *period,
                        reason,
                    });
                }
            }
        }

        let summary = match PerformanceSummary::compute(&results, config.initial_capital) {
            Some(stats) => RunSummary::Completed(stats),
            None => {
                warn!("no periods processed");
                RunSummary::NoPeriodsProcessed
            }
        };

        Ok(BacktestResult {
            config: config.clone(),
            periods: results,
            skipped,
            summary,
            portfolio,
        })
    }

    /// One period. Every check that can skip runs before the portfolio is
    /// touched.
    fn run_period(
        &self,
        quarter_index: usize,
        period: &QuarterPeriod,
        config: &BacktestConfig,
        portfolio: &mut Portfolio,
        universe: &dyn UniverseProvider,
    ) -> Result<PeriodResult, SkipReason> {
        let n = config.portfolio_size;
        let value_before = portfolio.portfolio_value;

        let eligible = universe.eligible_symbols(period.start_date).map_err(|e| {
            SkipReason::UniverseUnavailable {
                reason: e.to_string(),
            }
        })?;
        if eligible.len() < n {
            return Err(SkipReason::UniverseTooSmall {
                eligible: eligible.len(),
                required: n,
            });
        }

        let ranked = self
            .scorer
            .score_universe(self.port, &eligible, period.start_date);
        let selected: Vec<_> = ranked.into_iter().take(n).collect();
        let selected_symbols: Vec<String> = selected.iter().map(|s| s.symbol.clone()).collect();

        let mut diagnostics = Vec::new();
        for set in selected.iter().filter(|s| !s.issues.is_empty()) {
            diagnostics.push(PeriodDiagnostic::DegradedScore {
                symbol: set.symbol.clone(),
                failed: set.issues.iter().map(|i| i.factor).collect(),
            });
        }

        let mut price_map = self.prices_on(&selected_symbols, period.start_date, &mut diagnostics);
        if price_map.len() < n {
            return Err(SkipReason::PriceUnresolvable {
                priced: price_map.len(),
                required: n,
            });
        }

        let held: Vec<String> = portfolio
            .held_symbols()
            .into_iter()
            .filter(|s| !price_map.contains_key(s))
            .collect();
        price_map.extend(self.prices_on(&held, period.start_date, &mut diagnostics));

        let rebalance = portfolio.rebalance(
            period.start_date,
            &selected_symbols,
            &price_map,
            config.fee_rate,
        );
        diagnostics.extend(
            rebalance
                .dropped_positions
                .iter()
                .map(|s| PeriodDiagnostic::DroppedPosition { symbol: s.clone() }),
        );
        diagnostics.extend(
            rebalance
                .unfunded_targets
                .iter()
                .map(|s| PeriodDiagnostic::UnfundedPurchase { symbol: s.clone() }),
        );

        let end_prices = self.prices_on(&portfolio.held_symbols(), period.end_date, &mut diagnostics);
        diagnostics.extend(
            portfolio
                .unpriced_positions(&end_prices)
                .into_iter()
                .map(|symbol| PeriodDiagnostic::UnvaluedAtQuarterEnd { symbol }),
        );
        let value_at_end = portfolio.get_current_value(&end_prices);

        let portfolio_return = if value_before > 0.0 {
            (value_at_end - value_before) / value_before
        } else {
            0.0
        };

        let benchmark_return = match self.benchmark_return(period) {
            Some(r) => r,
            None => {
                diagnostics.push(PeriodDiagnostic::MissingBenchmark);
                0.0
            }
        };

        for d in &diagnostics {
            debug!(quarter = quarter_index, diagnostic = ?d, "degraded");
        }

        Ok(PeriodResult {
            quarter_index,
            start_date: period.start_date,
            end_date: period.end_date,
            selected_scores: selected.iter().map(|s| s.combined_score).collect(),
            selected_symbols,
            portfolio_return,
            benchmark_return,
            excess_return: portfolio_return - benchmark_return,
            portfolio_value_before: value_before,
            portfolio_value_after_rebalance: rebalance.new_value,
            portfolio_value_at_end: value_at_end,
            transaction_costs: rebalance.total_fees(),
            diagnostics,
        })
    }

    /// Nearest close within [`PRICE_LOOKUP_WINDOW_DAYS`] of `date` for each
    /// symbol. Unresolvable symbols are left out of the map.
    fn prices_on(
        &self,
        symbols: &[String],
        date: NaiveDate,
        diagnostics: &mut Vec<PeriodDiagnostic>,
    ) -> HashMap<String, f64> {
        let window = Duration::days(PRICE_LOOKUP_WINDOW_DAYS);
        let mut prices = HashMap::new();

        for symbol in symbols {
            match self.port.get_prices(symbol, date - window, date + window) {
                Ok(bars) => {
                    if let Some(close) = nearest_close(&bars, date, PRICE_LOOKUP_WINDOW_DAYS) {
                        prices.insert(symbol.clone(), close);
                    }
                }
                Err(e) => diagnostics.push(PeriodDiagnostic::PriceLookupFailed {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        prices
    }

    /// First to last benchmark close inside the period.
    fn benchmark_return(&self, period: &QuarterPeriod) -> Option<f64> {
        let bars = match self
            .port
            .get_benchmark_prices(period.start_date, period.end_date)
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(start = %period.start_date, error = %e, "benchmark lookup failed");
                return None;
            }
        };
        let first = bars.first()?.close;
        let last = bars.last()?.close;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first)
    }
}
