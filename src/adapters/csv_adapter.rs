//! CSV directory loader.
//!
//! Reads a data directory into an [`InMemoryMarketData`]:
//!
//! ```text
//! <root>/prices/<SYMBOL>.csv   date,open,high,low,close,volume
//! <root>/eps/<SYMBOL>.csv      date,value
//! <root>/pe/<SYMBOL>.csv       date,value
//! ```
//!
//! Each file has a header row. The benchmark is the price file named after
//! the benchmark symbol and is kept out of the stock universe.

use crate::adapters::memory_adapter::InMemoryMarketData;
use crate::domain::error::MomentumError;
use crate::domain::series::{FundamentalPoint, PriceBar};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn load_directory(root: &Path, benchmark: &str) -> Result<InMemoryMarketData, MomentumError> {
    let prices_dir = root.join("prices");
    if !prices_dir.is_dir() {
        return Err(MomentumError::Repository {
            reason: format!("no prices directory at {}", prices_dir.display()),
        });
    }

    let benchmark = benchmark.to_uppercase();
    let mut data = InMemoryMarketData::new();
    let mut found_benchmark = false;

    for (symbol, path) in csv_files(&prices_dir)? {
        let bars = read_price_file(&path)?;
        if symbol == benchmark {
            data.set_benchmark(bars);
            found_benchmark = true;
        } else {
            data.insert_prices(&symbol, bars);
        }
    }

    if !found_benchmark {
        warn!(benchmark = %benchmark, "no benchmark price file; benchmark returns will be 0");
    }

    let eps_dir = root.join("eps");
    if eps_dir.is_dir() {
        for (symbol, path) in csv_files(&eps_dir)? {
            data.insert_eps(&symbol, read_value_file(&path)?);
        }
    }

    let pe_dir = root.join("pe");
    if pe_dir.is_dir() {
        for (symbol, path) in csv_files(&pe_dir)? {
            data.insert_pe(&symbol, read_value_file(&path)?);
        }
    }

    info!(root = %root.display(), symbols = data.symbol_count(), "loaded market data");
    Ok(data)
}

/// `(SYMBOL, path)` for every `.csv` file in `dir`, sorted by symbol. Two
/// files naming the same symbol in different case are an error.
fn csv_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, MomentumError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_uppercase(), path.clone()));
        }
    }
    files.sort();

    if let Some(pair) = files.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(format_error(
            &pair[1].1,
            format!(
                "duplicate symbol {}: also loaded from {}",
                pair[0].0,
                pair[0].1.display()
            ),
        ));
    }
    Ok(files)
}

fn format_error(path: &Path, reason: impl Into<String>) -> MomentumError {
    MomentumError::DataFormat {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    path: &Path,
) -> Result<&'r str, MomentumError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| format_error(path, format!("missing {name} column")))
}

fn parse_date(value: &str, path: &Path) -> Result<NaiveDate, MomentumError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format_error(path, format!("invalid date '{value}': {e}")))
}

fn parse_number(value: &str, name: &str, path: &Path) -> Result<f64, MomentumError> {
    value
        .parse()
        .map_err(|e| format_error(path, format!("invalid {name} value '{value}': {e}")))
}

/// Rows must have strictly increasing dates once sorted.
fn check_unique_dates(
    dates: impl Iterator<Item = NaiveDate>,
    path: &Path,
) -> Result<(), MomentumError> {
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        if previous == Some(date) {
            return Err(format_error(path, format!("duplicate date {date}")));
        }
        previous = Some(date);
    }
    Ok(())
}

fn read_price_file(path: &Path) -> Result<Vec<PriceBar>, MomentumError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| format_error(path, e.to_string()))?;
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| format_error(path, format!("CSV parse error: {e}")))?;
        let number = |index, name| parse_number(field(&record, index, name, path)?, name, path);

        bars.push(PriceBar {
            date: parse_date(field(&record, 0, "date", path)?, path)?,
            open: number(1, "open")?,
            high: number(2, "high")?,
            low: number(3, "low")?,
            close: number(4, "close")?,
            volume: number(5, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.date);
    check_unique_dates(bars.iter().map(|b| b.date), path)?;
    Ok(bars)
}

fn read_value_file(path: &Path) -> Result<Vec<FundamentalPoint>, MomentumError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| format_error(path, e.to_string()))?;
    let mut points = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| format_error(path, format!("CSV parse error: {e}")))?;
        points.push(FundamentalPoint {
            date: parse_date(field(&record, 0, "date", path)?, path)?,
            value: parse_number(field(&record, 1, "value", path)?, "value", path)?,
        });
    }

    points.sort_by_key(|p| p.date);
    check_unique_dates(points.iter().map(|p| p.date), path)?;
    Ok(points)
}
