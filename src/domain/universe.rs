//! Eligible-universe selection.
//!
//! Parses symbol lists from configuration and provides the two
//! [`UniverseProvider`]s the runner uses: everything the repository knows,
//! or a configured list restricted to what the repository knows.

use crate::domain::error::MomentumError;
use crate::ports::data_port::MarketDataPort;
use crate::ports::universe_port::UniverseProvider;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Every symbol with a price record on or before the date.
pub struct RepositoryUniverse<'a> {
    port: &'a dyn MarketDataPort,
}

impl<'a> RepositoryUniverse<'a> {
    pub fn new(port: &'a dyn MarketDataPort) -> Self {
        RepositoryUniverse { port }
    }
}

impl UniverseProvider for RepositoryUniverse<'_> {
    fn eligible_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        self.port.get_known_symbols(as_of)
    }
}

/// A fixed list, narrowed on each date to symbols the repository knows.
/// Output keeps the list's order.
pub struct ListedUniverse<'a> {
    port: &'a dyn MarketDataPort,
    symbols: Vec<String>,
}

impl<'a> ListedUniverse<'a> {
    pub fn new(port: &'a dyn MarketDataPort, symbols: Vec<String>) -> Self {
        ListedUniverse { port, symbols }
    }

    /// Listed symbols with no price record on or before `as_of`.
    pub fn missing_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        let known: HashSet<String> = self.port.get_known_symbols(as_of)?.into_iter().collect();
        Ok(self
            .symbols
            .iter()
            .filter(|s| !known.contains(*s))
            .cloned()
            .collect())
    }
}

impl UniverseProvider for ListedUniverse<'_> {
    fn eligible_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError> {
        let known: HashSet<String> = self.port.get_known_symbols(as_of)?.into_iter().collect();
        Ok(self
            .symbols
            .iter()
            .filter(|s| known.contains(*s))
            .cloned()
            .collect())
    }
}
