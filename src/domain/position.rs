//! Holdings and the transaction log entries produced by rebalancing.

use chrono::NaiveDate;
use std::fmt;

/// Fractional long holding in one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub shares: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Sell => f.write_str("SELL"),
        }
    }
}

/// Append-only log entry.
///
/// `net_value` is cash actually moved: proceeds after fee for a sale, the
/// gross value for a purchase (its fee is charged on top).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub symbol: String,
    pub action: TradeAction,
    pub shares: f64,
    pub price: f64,
    pub gross_value: f64,
    pub fee: f64,
    pub net_value: f64,
}
