//! Configuration validation.
//!
//! Validates every section before a run starts, so a bad value is reported
//! up front instead of surfacing as a silently defaulted parameter.

use crate::domain::error::MomentumError;
use crate::domain::score::{Factor, FactorWeights};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// `[scoring]` keys in factor order.
pub const WEIGHT_KEYS: [&str; 5] = [
    "rs_weight",
    "eps_weight",
    "price_weight",
    "valuation_weight",
    "volume_weight",
];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_portfolio_size(config)?;
    validate_fee_rate(config)?;
    validate_symbols(config)?;
    validate_data(config)?;
    validate_weights(config)?;
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(MomentumError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, MomentumError> {
    let value = config
        .get_string("backtest", key)
        .ok_or_else(|| MomentumError::missing("backtest", key))?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        MomentumError::invalid(
            "backtest",
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

/// Optional number: `Ok(None)` when absent, an error when present but not a
/// number.
pub fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, MomentumError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| MomentumError::invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    if let Some(value) = parse_number(config, "backtest", "initial_capital")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(MomentumError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_portfolio_size(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    let Some(raw) = config.get_string("backtest", "portfolio_size") else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(()),
        _ => Err(MomentumError::invalid(
            "backtest",
            "portfolio_size",
            "portfolio_size must be an integer of at least 1",
        )),
    }
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    if let Some(value) = parse_number(config, "backtest", "fee_rate")? {
        if !(0.0..1.0).contains(&value) {
            return Err(MomentumError::invalid(
                "backtest",
                "fee_rate",
                "fee_rate must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    if let Some(raw) = config.get_string("backtest", "symbols") {
        if !raw.trim().is_empty() {
            parse_symbols(&raw)
                .map_err(|e| MomentumError::invalid("backtest", "symbols", e.to_string()))?;
        }
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    if !config.has_value("data", "path") {
        return Err(MomentumError::missing("data", "path"));
    }
    if let Some(b) = config.get_string("data", "benchmark") {
        if b.trim().is_empty() {
            return Err(MomentumError::invalid(
                "data",
                "benchmark",
                "benchmark must not be blank",
            ));
        }
    }
    Ok(())
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), MomentumError> {
    let defaults = FactorWeights::default();
    let mut any = false;
    let mut sum = 0.0;

    for (key, factor) in WEIGHT_KEYS.iter().zip(Factor::ALL) {
        let value = match parse_number(config, "scoring", key)? {
            Some(v) => {
                any = true;
                v
            }
            None => defaults.get(factor),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(MomentumError::invalid(
                "scoring",
                key,
                "weights must be non-negative",
            ));
        }
        sum += value;
    }

    if any && (sum - 1.0).abs() >= FactorWeights::SUM_TOLERANCE {
        return Err(MomentumError::invalid(
            "scoring",
            WEIGHT_KEYS[0],
            format!("weights must sum to 1, got {sum}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const BASE: &str = "[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n[data]\npath = ./data\n";

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with_extra(backtest: &str, rest: &str) -> FileConfigAdapter {
        make_config(&format!(
            "[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n{backtest}\n[data]\npath = ./data\n{rest}"
        ))
    }

    fn invalid_key(config: &FileConfigAdapter) -> String {
        match validate_backtest_config(config).unwrap_err() {
            MomentumError::ConfigInvalid { key, .. } => key,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn minimal_config_passes() {
        assert!(validate_backtest_config(&make_config(BASE)).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[backtest]
start_date = 2020-01-01
end_date = 2024-12-31
initial_capital = 250000
portfolio_size = 10
fee_rate = 0.0005
symbols = AAPL, msft, GOOGL

[data]
path = ./data
benchmark = QQQ

[scoring]
rs_weight = 0.4
eps_weight = 0.2
price_weight = 0.2
valuation_weight = 0.1
volume_weight = 0.1
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn missing_start_date_fails() {
        let config = make_config("[backtest]\nend_date = 2024-12-31\n[data]\npath = x\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MomentumError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[backtest]\nstart_date = 2020/01/01\nend_date = 2024-12-31\n[data]\npath = x\n");
        assert_eq!(invalid_key(&config), "start_date");
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[backtest]\nstart_date = 2024-12-31\nend_date = 2020-01-01\n[data]\npath = x\n");
        assert_eq!(invalid_key(&config), "start_date");
    }

    #[test]
    fn initial_capital_must_be_positive() {
        assert_eq!(invalid_key(&with_extra("initial_capital = 0", "")), "initial_capital");
        assert_eq!(invalid_key(&with_extra("initial_capital = -5", "")), "initial_capital");
        assert_eq!(invalid_key(&with_extra("initial_capital = lots", "")), "initial_capital");
    }

    #[test]
    fn portfolio_size_must_be_positive_integer() {
        assert_eq!(invalid_key(&with_extra("portfolio_size = 0", "")), "portfolio_size");
        assert_eq!(invalid_key(&with_extra("portfolio_size = 2.5", "")), "portfolio_size");
        assert!(validate_backtest_config(&with_extra("portfolio_size = 1", "")).is_ok());
    }

    #[test]
    fn fee_rate_range() {
        assert_eq!(invalid_key(&with_extra("fee_rate = -0.1", "")), "fee_rate");
        assert_eq!(invalid_key(&with_extra("fee_rate = 1", "")), "fee_rate");
        assert!(validate_backtest_config(&with_extra("fee_rate = 0", "")).is_ok());
    }

    #[test]
    fn bad_symbol_list_fails() {
        assert_eq!(invalid_key(&with_extra("symbols = AAPL,,MSFT", "")), "symbols");
        assert_eq!(invalid_key(&with_extra("symbols = AAPL,aapl", "")), "symbols");
    }

    #[test]
    fn missing_data_path_fails() {
        let config = make_config("[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MomentumError::ConfigMissing { section, key } if section == "data" && key == "path"));
    }

    #[test]
    fn partial_weight_override_must_still_sum_to_one() {
        // Default rs 0.35 replaced by 0.5: total becomes 1.15.
        let config = with_extra("", "[scoring]\nrs_weight = 0.5\n");
        assert_eq!(invalid_key(&config), "rs_weight");

        let config = with_extra("", "[scoring]\nrs_weight = 0.45\neps_weight = 0.15\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn negative_weight_fails() {
        let config = with_extra(
            "",
            "[scoring]\nrs_weight = -0.1\neps_weight = 0.7\n",
        );
        assert_eq!(invalid_key(&config), "rs_weight");
    }
}
