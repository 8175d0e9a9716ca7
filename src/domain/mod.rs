//! Core domain types and logic.

pub mod series;
pub mod score;
pub mod scorer;
pub mod signal;
pub mod position;
pub mod portfolio;
pub mod period;
pub mod backtest;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
