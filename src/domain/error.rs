//! Domain error types.
//!
//! Only fatal conditions live here. Missing history, thin universes and
//! unresolvable prices are recorded as data on the score and period records.

/// Top-level error type for the backtester.
#[derive(Debug, thiserror::Error)]
pub enum MomentumError {
    #[error("repository error: {reason}")]
    Repository { reason: String },

    #[error("malformed data in {file}: {reason}")]
    DataFormat { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MomentumError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MomentumError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        MomentumError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MomentumError::ConfigParse { .. }
                | MomentumError::ConfigMissing { .. }
                | MomentumError::ConfigInvalid { .. }
        )
    }
}

impl From<&MomentumError> for std::process::ExitCode {
    fn from(err: &MomentumError) -> Self {
        let code: u8 = match err {
            MomentumError::Io(_) | MomentumError::Report { .. } => 1,
            MomentumError::ConfigParse { .. }
            | MomentumError::ConfigMissing { .. }
            | MomentumError::ConfigInvalid { .. } => 2,
            MomentumError::Repository { .. } | MomentumError::DataFormat { .. } => 3,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_classified() {
        assert!(MomentumError::missing("backtest", "start_date").is_config_error());
        assert!(MomentumError::invalid("backtest", "fee_rate", "negative").is_config_error());
        let repo = MomentumError::Repository {
            reason: "timeout".into(),
        };
        assert!(!repo.is_config_error());
    }

    #[test]
    fn display_includes_section_and_key() {
        let err = MomentumError::invalid("backtest", "portfolio_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid config value [backtest] portfolio_size: must be at least 1"
        );
    }
}
