//! Universe selection port.

use crate::domain::error::MomentumError;
use chrono::NaiveDate;

/// Supplies the symbols eligible for selection on a rebalance date.
pub trait UniverseProvider {
    fn eligible_symbols(&self, as_of: NaiveDate) -> Result<Vec<String>, MomentumError>;
}
