//! In-memory market data repository.
//!
//! Backs the CSV loader and doubles as the test repository. Series are kept
//! sorted by date; queries return the inclusive `[start, end]` slice.

use crate::domain::error::MomentumError;
use crate::domain::series::{FundamentalPoint, PriceBar};
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    prices: HashMap<String, Vec<PriceBar>>,
    eps: HashMap<String, Vec<FundamentalPoint>>,
    pe: HashMap<String, Vec<FundamentalPoint>>,
    benchmark: Vec<PriceBar>,
    errors: HashMap<String, String>,
    benchmark_error: Option<String>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.insert_prices(symbol, bars);
        self
    }

    pub fn with_eps(mut self, symbol: &str, points: Vec<FundamentalPoint>) -> Self {
        self.insert_eps(symbol, points);
        self
    }

    pub fn with_pe(mut self, symbol: &str, points: Vec<FundamentalPoint>) -> Self {
        self.insert_pe(symbol, points);
        self
    }

    pub fn with_benchmark(mut self, bars: Vec<PriceBar>) -> Self {
        self.set_benchmark(bars);
        self
    }

    /// Every lookup for `symbol` fails with `reason`.
    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_benchmark_error(mut self, reason: &str) -> Self {
        self.benchmark_error = Some(reason.to_string());
        self
    }

    pub fn insert_prices(&mut self, symbol: &str, mut bars: Vec<PriceBar>) {
        bars.sort_by_key(|b| b.date);
        self.prices.insert(symbol.to_string(), bars);
    }

    pub fn insert_eps(&mut self, symbol: &str, mut points: Vec<FundamentalPoint>) {
        points.sort_by_key(|p| p.date);
        self.eps.insert(symbol.to_string(), points);
    }

    pub fn insert_pe(&mut self, symbol: &str, mut points: Vec<FundamentalPoint>) {
        points.sort_by_key(|p| p.date);
        self.pe.insert(symbol.to_string(), points);
    }

    pub fn set_benchmark(&mut self, mut bars: Vec<PriceBar>) {
        bars.sort_by_key(|b| b.date);
        self.benchmark = bars;
    }

    pub fn symbol_count(&self) -> usize {
        self.prices.len()
    }

    fn check(&self, symbol: &str) -> Result<(), MomentumError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(MomentumError::Repository {
                reason: format!("{symbol}: {reason}"),
            }),
            None => Ok(()),
        }
    }
}

fn bar_range(bars: &[PriceBar], start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    bars.iter()
        .filter(|b| b.date >= start && b.date <= end)
        .cloned()
        .collect()
}

fn point_range(
    points: Option<&Vec<FundamentalPoint>>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<FundamentalPoint> {
    points
        .map(|p| {
            p.iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect()
        })
        .unwrap_or_default()
}

impl MarketDataPort for InMemoryMarketData {
    fn get_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MomentumError> {
        self.check(symbol)?;
        Ok(self
            .prices
            .get(symbol)
            .map(|bars| bar_range(bars, start_date, end_date))
            .unwrap_or_default())
    }

    fn get_benchmark_prices(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MomentumError> {
        if let Some(reason) = &self.benchmark_error {
            return Err(MomentumError::Repository {
                reason: format!("benchmark: {reason}"),
            });
        }
        Ok(bar_range(&self.benchmark, start_date, end_date))
    }

    fn get_eps_history(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FundamentalPoint>, MomentumError> {
        self.check(symbol)?;
        Ok(point_range(self.eps.get(symbol), start_date, end_date))
    }

    fn get_pe_history(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FundamentalPoint>, MomentumError> {
        self.check(symbol)?;
        Ok(point_range(self.pe.get(symbol), start_date, end_date))
    }

    fn get_known_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        let mut symbols: Vec<String> = self
            .prices
            .iter()
            .filter(|(_, bars)| bars.first().is_some_and(|b| b.date <= as_of))
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}
