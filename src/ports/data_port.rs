//! Market data access port.
//!
//! Every lookup returns an ordered, date-indexed series. An empty series means
//! "no data"; `Err` is reserved for the repository itself failing.

use crate::domain::error::MomentumError;
use crate::domain::series::{FundamentalPoint, PriceBar};
use chrono::NaiveDate;

pub trait MarketDataPort: Send + Sync {
    fn get_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MomentumError>;

    fn get_benchmark_prices(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MomentumError>;

    fn get_eps_history(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FundamentalPoint>, MomentumError>;

    fn get_pe_history(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FundamentalPoint>, MomentumError>;

    /// Symbols with at least one price record on or before `as_of`, sorted.
    fn get_known_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError>;
}
