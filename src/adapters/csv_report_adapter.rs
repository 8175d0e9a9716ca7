//! CSV report adapter implementing ReportPort.
//!
//! One row per processed period. Skipped periods are not written; they are
//! reported on the console.

use std::fs;
use std::path::Path;

use crate::domain::backtest::{BacktestResult, PeriodResult};
use crate::domain::error::MomentumError;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 12] = [
    "quarter",
    "start_date",
    "end_date",
    "symbols",
    "portfolio_return",
    "benchmark_return",
    "excess_return",
    "value_before",
    "value_after_rebalance",
    "value_at_end",
    "transaction_costs",
    "diagnostics",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn report_error(e: impl std::fmt::Display) -> MomentumError {
    MomentumError::Report {
        reason: e.to_string(),
    }
}

fn row(p: &PeriodResult) -> Vec<String> {
    vec![
        p.quarter_index.to_string(),
        p.start_date.to_string(),
        p.end_date.to_string(),
        p.selected_symbols.join(";"),
        format!("{:.6}", p.portfolio_return),
        format!("{:.6}", p.benchmark_return),
        format!("{:.6}", p.excess_return),
        format!("{:.2}", p.portfolio_value_before),
        format!("{:.2}", p.portfolio_value_after_rebalance),
        format!("{:.2}", p.portfolio_value_at_end),
        format!("{:.2}", p.transaction_costs),
        p.diagnostics.len().to_string(),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MomentumError> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(output_path).map_err(report_error)?;
        writer.write_record(HEADER).map_err(report_error)?;
        for period in &result.periods {
            writer.write_record(row(period)).map_err(report_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, PeriodDiagnostic, RunSummary};
    use crate::domain::portfolio::Portfolio;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn result_with(periods: Vec<PeriodResult>) -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        BacktestResult {
            config: BacktestConfig::new(start, end),
            periods,
            skipped: Vec::new(),
            summary: RunSummary::NoPeriodsProcessed,
            portfolio: Portfolio::new(100_000.0),
        }
    }

    fn period() -> PeriodResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PeriodResult {
            quarter_index: 1,
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            selected_symbols: vec!["AAPL".into(), "MSFT".into()],
            selected_scores: vec![12.0, 8.0],
            portfolio_return: 0.1,
            benchmark_return: 0.05,
            excess_return: 0.05,
            portfolio_value_before: 100_000.0,
            portfolio_value_after_rebalance: 99_900.0,
            portfolio_value_at_end: 110_000.0,
            transaction_costs: 100.0,
            diagnostics: vec![PeriodDiagnostic::MissingBenchmark],
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/results.csv");
        CsvReportAdapter::new()
            .write(&result_with(vec![period()]), &path)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("quarter,start_date,end_date,symbols"));
        assert_eq!(
            lines[1],
            "1,2024-01-01,2024-03-31,AAPL;MSFT,0.100000,0.050000,0.050000,100000.00,99900.00,110000.00,100.00,1"
        );
    }

    #[test]
    fn empty_run_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        CsvReportAdapter::default()
            .write(&result_with(Vec::new()), &path)
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
