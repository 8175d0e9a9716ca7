#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use momentum_backtest::domain::error::MomentumError;
pub use momentum_backtest::domain::series::{FundamentalPoint, PriceBar};
use momentum_backtest::ports::universe_port::UniverseProvider;
use std::collections::BTreeMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per `(date, close)` pair with a flat volume.
pub fn bars_from_points(points: &[(NaiveDate, f64)]) -> Vec<PriceBar> {
    points
        .iter()
        .map(|&(d, close)| PriceBar::from_close(d, close, 1_000.0))
        .collect()
}

/// Daily bars from `start` for `days` days, compounding `daily_growth` on
/// the close and `volume_growth` on the volume.
pub fn ramp(
    start: NaiveDate,
    days: i64,
    base: f64,
    daily_growth: f64,
    volume_growth: f64,
) -> Vec<PriceBar> {
    (0..days)
        .map(|i| {
            let close = base * (1.0 + daily_growth).powi(i as i32);
            let volume = 10_000.0 * (1.0 + volume_growth).powi(i as i32);
            PriceBar::from_close(start + Duration::days(i), close, volume)
        })
        .collect()
}

pub fn flat(start: NaiveDate, days: i64, close: f64) -> Vec<PriceBar> {
    ramp(start, days, close, 0.0, 0.0)
}

/// Quarterly fundamental observations starting at `start`.
pub fn quarterly_points(start: NaiveDate, values: &[f64]) -> Vec<FundamentalPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| FundamentalPoint {
            date: start + Duration::days(91 * i as i64),
            value,
        })
        .collect()
}

/// The same symbols on every date.
pub struct FixedUniverse(pub Vec<String>);

impl FixedUniverse {
    pub fn of(symbols: &[&str]) -> Self {
        FixedUniverse(symbols.iter().map(|s| s.to_string()).collect())
    }
}

impl UniverseProvider for FixedUniverse {
    fn eligible_symbols(&self, _as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        Ok(self.0.clone())
    }
}

/// Symbols change on the listed dates; each entry holds until the next.
/// Dates before the first entry fail.
pub struct DatedUniverse(pub BTreeMap<NaiveDate, Result<Vec<String>, String>>);

impl DatedUniverse {
    pub fn new() -> Self {
        DatedUniverse(BTreeMap::new())
    }

    pub fn on(mut self, d: NaiveDate, symbols: &[&str]) -> Self {
        self.0
            .insert(d, Ok(symbols.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn failing_from(mut self, d: NaiveDate, reason: &str) -> Self {
        self.0.insert(d, Err(reason.to_string()));
        self
    }
}

impl UniverseProvider for DatedUniverse {
    fn eligible_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        match self.0.range(..=as_of).next_back() {
            Some((_, Ok(symbols))) => Ok(symbols.clone()),
            Some((_, Err(reason))) => Err(MomentumError::Repository {
                reason: reason.clone(),
            }),
            None => Err(MomentumError::Repository {
                reason: format!("no universe before {as_of}"),
            }),
        }
    }
}
