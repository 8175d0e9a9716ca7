//! Multi-factor momentum scoring.
//!
//! Five factors are computed per symbol from repository history ending on the
//! evaluation date:
//!
//! - relative strength vs the benchmark over 63/126/189/252 bars,
//!   weighted 0.4/0.3/0.2/0.1
//! - EPS change between the two latest prints
//! - price change over 21/63/126 bars, weighted 0.5/0.3/0.2
//! - P/E change against the value 21 observations back
//! - 5-bar vs 21-bar mean volume
//!
//! Any factor without enough history is 0.0. Windows lacking history
//! contribute 0 to their weighted sums without renormalizing the window
//! weights. Repository failures are recorded as [`ScoreIssue`]s and never
//! abort the pass.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::error::MomentumError;
use super::score::{rank_scores, Factor, FactorWeights, ScoreIssue, ScoreSet, SubScores};
use super::series::{
    align_closes, closes, cumulative_return, daily_returns, mean, values, volumes, PriceBar,
};
use crate::ports::data_port::MarketDataPort;

pub const RS_WINDOWS: [(usize, f64); 4] = [(63, 0.4), (126, 0.3), (189, 0.2), (252, 0.1)];
pub const PRICE_WINDOWS: [(usize, f64); 3] = [(21, 0.5), (63, 0.3), (126, 0.2)];
pub const RS_CAP: f64 = 1000.0;
pub const PERCENT_CAP: f64 = 100.0;
pub const VALUATION_LOOKBACK: usize = 21;
pub const VOLUME_SHORT_WINDOW: usize = 5;
pub const VOLUME_LONG_WINDOW: usize = 21;

/// Calendar days of price history requested for relative strength.
pub const PRICE_HISTORY_DAYS: i64 = 500;
/// Calendar days of EPS and P/E history requested.
pub const FUNDAMENTAL_HISTORY_DAYS: i64 = 400;

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

/// Relative strength from two aligned daily return series.
pub fn relative_strength_from_returns(stock: &[f64], benchmark: &[f64]) -> f64 {
    let n = stock.len().min(benchmark.len());
    let stock = &stock[stock.len() - n..];
    let benchmark = &benchmark[benchmark.len() - n..];

    let total: f64 = RS_WINDOWS
        .iter()
        .filter(|(period, _)| n >= *period)
        .map(|&(period, weight)| {
            let s = cumulative_return(&stock[n - period..]);
            let b = cumulative_return(&benchmark[n - period..]);
            ((s - b) * 100.0).clamp(-RS_CAP, RS_CAP) * weight
        })
        .sum();

    finite_or_zero(total)
}

/// Relative strength from two date-aligned close series.
pub fn relative_strength(stock_closes: &[f64], benchmark_closes: &[f64]) -> f64 {
    relative_strength_from_returns(
        &daily_returns(stock_closes),
        &daily_returns(benchmark_closes),
    )
}

pub fn eps_momentum(eps: &[f64]) -> f64 {
    if eps.len() < 2 {
        return 0.0;
    }
    let latest = eps[eps.len() - 1];
    let previous = eps[eps.len() - 2];
    if previous == 0.0 {
        return 0.0;
    }
    finite_or_zero((latest - previous) / previous.abs() * 100.0).clamp(-PERCENT_CAP, PERCENT_CAP)
}

/// Weighted percentage price change; the past price for an `n`-bar window is
/// the `n`th close from the end.
pub fn price_momentum(closes: &[f64]) -> f64 {
    let Some(&current) = closes.last() else {
        return 0.0;
    };

    let total: f64 = PRICE_WINDOWS
        .iter()
        .filter(|(period, _)| closes.len() >= *period)
        .map(|&(period, weight)| {
            let past = closes[closes.len() - period];
            if past == 0.0 {
                0.0
            } else {
                (current - past) / past * 100.0 * weight
            }
        })
        .sum();

    finite_or_zero(total)
}

/// P/E change against the value [`VALUATION_LOOKBACK`] observations back, or
/// the oldest observation when the history is shorter.
pub fn valuation_momentum(pe: &[f64]) -> f64 {
    if pe.len() < 2 {
        return 0.0;
    }
    let lookback = VALUATION_LOOKBACK.min(pe.len() - 1);
    let recent = pe[pe.len() - 1];
    let older = pe[pe.len() - 1 - lookback];
    if older == 0.0 {
        return 0.0;
    }
    finite_or_zero((recent - older) / older * 100.0).clamp(-PERCENT_CAP, PERCENT_CAP)
}

pub fn volume_momentum(volume: &[f64]) -> f64 {
    if volume.len() < VOLUME_LONG_WINDOW {
        return 0.0;
    }
    let recent = mean(&volume[volume.len() - VOLUME_SHORT_WINDOW..]);
    let older = mean(&volume[volume.len() - VOLUME_LONG_WINDOW..]);
    if older == 0.0 {
        return 0.0;
    }
    finite_or_zero((recent - older) / older * 100.0).clamp(-PERCENT_CAP, PERCENT_CAP)
}

/// Benchmark history shared by every symbol in one pass.
type BenchmarkHistory = Result<Vec<PriceBar>, String>;

#[derive(Debug, Clone, Default)]
pub struct MomentumScorer {
    weights: FactorWeights,
}

impl MomentumScorer {
    pub fn new(weights: FactorWeights) -> Self {
        MomentumScorer { weights }
    }

    /// Score a single symbol. The result is unranked.
    pub fn score_symbol(
        &self,
        port: &dyn MarketDataPort,
        symbol: &str,
        as_of: NaiveDate,
    ) -> ScoreSet {
        let benchmark = fetch_benchmark(port, as_of);
        self.score_with_benchmark(port, symbol, as_of, &benchmark)
    }

    /// Score every symbol and rank the batch. Per-symbol work runs in
    /// parallel; output order only depends on scores and input order.
    pub fn score_universe(
        &self,
        port: &dyn MarketDataPort,
        symbols: &[String],
        as_of: NaiveDate,
    ) -> Vec<ScoreSet> {
        let benchmark = fetch_benchmark(port, as_of);
        let sets: Vec<ScoreSet> = symbols
            .par_iter()
            .map(|symbol| self.score_with_benchmark(port, symbol, as_of, &benchmark))
            .collect();
        rank_scores(sets)
    }

    /// The `n` best symbols by combined score.
    pub fn top_symbols(
        &self,
        port: &dyn MarketDataPort,
        symbols: &[String],
        as_of: NaiveDate,
        n: usize,
    ) -> Vec<String> {
        self.score_universe(port, symbols, as_of)
            .into_iter()
            .take(n)
            .map(|s| s.symbol)
            .collect()
    }

    fn score_with_benchmark(
        &self,
        port: &dyn MarketDataPort,
        symbol: &str,
        as_of: NaiveDate,
        benchmark: &BenchmarkHistory,
    ) -> ScoreSet {
        let price_start = as_of - Duration::days(PRICE_HISTORY_DAYS);
        let fundamental_start = as_of - Duration::days(FUNDAMENTAL_HISTORY_DAYS);

        let mut scores = SubScores::default();
        let mut issues = Vec::new();

        match port.get_prices(symbol, price_start, as_of) {
            Ok(bars) => {
                match benchmark {
                    Ok(bench) => {
                        let (stock, bench) = align_closes(&bars, bench);
                        scores.rs_vs_benchmark = relative_strength(&stock, &bench);
                    }
                    Err(reason) => issues.push(ScoreIssue {
                        factor: Factor::RelativeStrength,
                        reason: reason.clone(),
                    }),
                }
                scores.price_momentum = price_momentum(&closes(&bars));
                scores.volume_momentum = volume_momentum(&volumes(&bars));
            }
            Err(e) => {
                for factor in [Factor::RelativeStrength, Factor::Price, Factor::Volume] {
                    issues.push(issue(factor, &e));
                }
            }
        }

        match port.get_eps_history(symbol, fundamental_start, as_of) {
            Ok(points) => scores.eps_momentum = eps_momentum(&values(&points)),
            Err(e) => issues.push(issue(Factor::Eps, &e)),
        }

        match port.get_pe_history(symbol, fundamental_start, as_of) {
            Ok(points) => scores.valuation_momentum = valuation_momentum(&values(&points)),
            Err(e) => issues.push(issue(Factor::Valuation, &e)),
        }

        for i in &issues {
            warn!(symbol, factor = %i.factor, reason = %i.reason, "factor lookup failed");
        }

        let set = ScoreSet::new(symbol.to_string(), as_of, scores, &self.weights, issues);
        debug!(
            symbol,
            rs = set.scores.rs_vs_benchmark,
            eps = set.scores.eps_momentum,
            price = set.scores.price_momentum,
            valuation = set.scores.valuation_momentum,
            volume = set.scores.volume_momentum,
            combined = set.combined_score,
            "scored"
        );
        set
    }
}

fn issue(factor: Factor, err: &MomentumError) -> ScoreIssue {
    ScoreIssue {
        factor,
        reason: err.to_string(),
    }
}

fn fetch_benchmark(port: &dyn MarketDataPort, as_of: NaiveDate) -> BenchmarkHistory {
    port.get_benchmark_prices(as_of - Duration::days(PRICE_HISTORY_DAYS), as_of)
        .map_err(|e| {
            warn!(%as_of, error = %e, "benchmark lookup failed");
            e.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_adapter::InMemoryMarketData;
    use crate::domain::series::FundamentalPoint;
    use approx::assert_relative_eq;

    fn closes_from_returns(returns: &[f64]) -> Vec<f64> {
        let mut out = vec![100.0];
        for r in returns {
            let last = *out.last().unwrap();
            out.push(last * (1.0 + r));
        }
        out
    }

    fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::from_close(start + Duration::days(i as i64), c, 1000.0))
            .collect()
    }

    #[test]
    fn relative_strength_single_window() {
        let stock = vec![0.01; 63];
        let bench = vec![0.005; 63];
        let expected = ((1.01f64.powi(63) - 1.0) - (1.005f64.powi(63) - 1.0)) * 100.0 * 0.4;
        assert_relative_eq!(
            relative_strength_from_returns(&stock, &bench),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn relative_strength_from_closes_matches_returns() {
        let stock = closes_from_returns(&[0.01; 63]);
        let bench = closes_from_returns(&[0.005; 63]);
        let expected = relative_strength_from_returns(&[0.01; 63], &[0.005; 63]);
        assert_relative_eq!(relative_strength(&stock, &bench), expected, epsilon = 1e-9);
    }

    #[test]
    fn relative_strength_short_history_is_zero() {
        assert_eq!(relative_strength_from_returns(&[0.01; 62], &[0.0; 62]), 0.0);
    }

    #[test]
    fn relative_strength_window_is_capped() {
        let stock = vec![0.05; 63];
        let bench = vec![0.0; 63];
        assert_relative_eq!(
            relative_strength_from_returns(&stock, &bench),
            RS_CAP * 0.4,
            epsilon = 1e-9
        );
    }

    #[test]
    fn relative_strength_all_windows() {
        let stock = vec![0.001; 252];
        let bench = vec![0.0; 252];
        let expected: f64 = RS_WINDOWS
            .iter()
            .map(|&(p, w)| (1.001f64.powi(p as i32) - 1.0) * 100.0 * w)
            .sum();
        assert_relative_eq!(
            relative_strength_from_returns(&stock, &bench),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn eps_momentum_cases() {
        assert_relative_eq!(eps_momentum(&[1.0, 1.2]), 20.0, epsilon = 1e-9);
        assert_eq!(eps_momentum(&[1.0]), 0.0);
        assert_eq!(eps_momentum(&[0.0, 1.0]), 0.0);
        assert_relative_eq!(eps_momentum(&[-1.0, -0.5]), 50.0, epsilon = 1e-9);
        assert_eq!(eps_momentum(&[1.0, 5.0]), 100.0);
        assert_eq!(eps_momentum(&[1.0, -5.0]), -100.0);
    }

    #[test]
    fn price_momentum_weights_available_windows() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        // Only the 21-bar window fits: past close is closes[9] = 109.
        let expected = (129.0 - 109.0) / 109.0 * 100.0 * 0.5;
        assert_relative_eq!(price_momentum(&closes), expected, epsilon = 1e-9);
        assert_eq!(price_momentum(&[]), 0.0);
    }

    #[test]
    fn price_momentum_full_history() {
        let closes: Vec<f64> = (0..130).map(|i| 100.0 + i as f64).collect();
        let last = 229.0;
        let expected = (last - closes[130 - 21]) / closes[130 - 21] * 100.0 * 0.5
            + (last - closes[130 - 63]) / closes[130 - 63] * 100.0 * 0.3
            + (last - closes[130 - 126]) / closes[130 - 126] * 100.0 * 0.2;
        assert_relative_eq!(price_momentum(&closes), expected, epsilon = 1e-9);
    }

    #[test]
    fn valuation_momentum_uses_lookback_or_oldest() {
        assert_relative_eq!(valuation_momentum(&[20.0, 22.0]), 10.0, epsilon = 1e-9);
        let mut long: Vec<f64> = vec![99.0; 5];
        long.push(10.0);
        long.extend(vec![12.0; 20]);
        long.push(11.0);
        // 27 points: value 21 back from the last is index 5 (10.0).
        assert_relative_eq!(valuation_momentum(&long), 10.0, epsilon = 1e-9);
        assert_eq!(valuation_momentum(&[0.0, 10.0]), 0.0);
        assert_eq!(valuation_momentum(&[10.0]), 0.0);
    }

    #[test]
    fn volume_momentum_compares_short_and_long_means() {
        let mut v = vec![100.0; 16];
        v.extend(vec![200.0; 5]);
        let older = (16.0 * 100.0 + 5.0 * 200.0) / 21.0;
        let expected = (200.0 - older) / older * 100.0;
        assert_relative_eq!(volume_momentum(&v), expected, epsilon = 1e-9);
        assert_eq!(volume_momentum(&[100.0; 20]), 0.0);
        assert_eq!(volume_momentum(&[0.0; 21]), 0.0);
    }

    #[test]
    fn score_universe_survives_repository_errors() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let start = as_of - Duration::days(99);
        let rising: Vec<f64> = (0..100).map(|i| 50.0 + i as f64).collect();
        let flat = vec![100.0; 100];

        let port = InMemoryMarketData::new()
            .with_benchmark(bars_from_closes(start, &flat))
            .with_prices("GOOD", bars_from_closes(start, &rising))
            .with_eps(
                "GOOD",
                vec![
                    FundamentalPoint { date: as_of - Duration::days(120), value: 1.0 },
                    FundamentalPoint { date: as_of - Duration::days(30), value: 1.1 },
                ],
            )
            .with_prices("BAD", bars_from_closes(start, &rising))
            .with_error("BAD", "connection reset");

        let scorer = MomentumScorer::default();
        let symbols = vec!["BAD".to_string(), "GOOD".to_string()];
        let ranked = scorer.score_universe(&port, &symbols, as_of);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].symbol, "GOOD");
        assert_eq!(ranked[0].rank, 1);
        assert!(ranked[0].combined_score > 0.0);
        assert_relative_eq!(ranked[0].scores.eps_momentum, 10.0, epsilon = 1e-9);

        let bad = &ranked[1];
        assert_eq!(bad.symbol, "BAD");
        assert_eq!(bad.combined_score, 0.0);
        assert_eq!(bad.issues.len(), 5);
        assert!(bad.is_degraded());
    }

    #[test]
    fn scoring_is_idempotent() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let start = as_of - Duration::days(299);
        let a: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1).collect();
        let b: Vec<f64> = (0..300).map(|i| 80.0 + (i as f64 * 0.2).cos() * 3.0).collect();
        let bench: Vec<f64> = (0..300).map(|i| 300.0 + i as f64 * 0.05).collect();
        let port = InMemoryMarketData::new()
            .with_benchmark(bars_from_closes(start, &bench))
            .with_prices("A", bars_from_closes(start, &a))
            .with_prices("B", bars_from_closes(start, &b));

        let scorer = MomentumScorer::default();
        let symbols = vec!["A".to_string(), "B".to_string()];
        let first = scorer.score_universe(&port, &symbols, as_of);
        let second = scorer.score_universe(&port, &symbols, as_of);
        assert_eq!(first, second);
        assert_eq!(
            scorer.top_symbols(&port, &symbols, as_of, 1),
            vec![first[0].symbol.clone()]
        );
    }

    #[test]
    fn all_five_factors_combine_with_base_weights() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let start = as_of - Duration::days(129);
        let closes: Vec<f64> = (0..130).map(|i| 100.0 + i as f64).collect();
        let bars: Vec<PriceBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let volume = if i >= 125 { 2000.0 } else { 1000.0 };
                PriceBar::from_close(start + Duration::days(i as i64), c, volume)
            })
            .collect();

        let port = InMemoryMarketData::new()
            .with_benchmark(bars_from_closes(start, &[100.0; 130]))
            .with_prices("X", bars)
            .with_eps(
                "X",
                vec![
                    FundamentalPoint { date: as_of - Duration::days(120), value: 1.0 },
                    FundamentalPoint { date: as_of - Duration::days(30), value: 1.25 },
                ],
            )
            .with_pe(
                "X",
                vec![
                    FundamentalPoint { date: as_of - Duration::days(90), value: 20.0 },
                    FundamentalPoint { date: as_of - Duration::days(10), value: 18.0 },
                ],
            );

        let scorer = MomentumScorer::default();
        let set = scorer.score_symbol(&port, "X", as_of);

        // Flat benchmark: only the 63 and 126 bar windows fit in 129 returns.
        let last = closes[129];
        let rs = (last / closes[129 - 63] - 1.0) * 100.0 * 0.4
            + (last / closes[129 - 126] - 1.0) * 100.0 * 0.3;
        let price = (last - closes[130 - 21]) / closes[130 - 21] * 100.0 * 0.5
            + (last - closes[130 - 63]) / closes[130 - 63] * 100.0 * 0.3
            + (last - closes[130 - 126]) / closes[130 - 126] * 100.0 * 0.2;
        let older_volume = (16.0 * 1000.0 + 5.0 * 2000.0) / 21.0;
        let volume = (2000.0 - older_volume) / older_volume * 100.0;

        assert!(set.issues.is_empty());
        assert_relative_eq!(set.scores.rs_vs_benchmark, rs, epsilon = 1e-9);
        assert_relative_eq!(set.scores.eps_momentum, 25.0, epsilon = 1e-9);
        assert_relative_eq!(set.scores.price_momentum, price, epsilon = 1e-9);
        assert_relative_eq!(set.scores.valuation_momentum, -10.0, epsilon = 1e-9);
        assert_relative_eq!(set.scores.volume_momentum, volume, epsilon = 1e-9);
        assert!(set.scores.unavailable().is_empty());

        let expected = 0.35 * rs + 0.25 * 25.0 + 0.20 * price + 0.10 * -10.0 + 0.10 * volume;
        for f in Factor::ALL {
            assert_relative_eq!(set.weights.get(f), FactorWeights::default().get(f), epsilon = 1e-12);
        }
        assert_relative_eq!(set.combined_score, expected, epsilon = 1e-9);

        let ranked = scorer.score_universe(&port, &["X".to_string()], as_of);
        assert_eq!(ranked[0].combined_score, set.combined_score);
        assert_eq!(ranked[0].rank, 1);
    }
}
