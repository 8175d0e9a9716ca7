//! Price and fundamental time series.
//!
//! Both series kinds are ordered by strictly increasing date. Missing trading
//! days are simply absent; nothing here interpolates.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// A bar with open/high/low pinned to the close.
    pub fn from_close(date: NaiveDate, close: f64, volume: f64) -> Self {
        PriceBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }
}

/// One dated observation of EPS, P/E or PEG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundamentalPoint {
    pub date: NaiveDate,
    pub value: f64,
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}

pub fn values(points: &[FundamentalPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

/// Inner-join two date-ordered bar series, returning the paired closes.
pub fn align_closes(left: &[PriceBar], right: &[PriceBar]) -> (Vec<f64>, Vec<f64>) {
    let mut a = Vec::with_capacity(left.len().min(right.len()));
    let mut b = Vec::with_capacity(a.capacity());
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].date.cmp(&right[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                a.push(left[i].close);
                b.push(right[j].close);
                i += 1;
                j += 1;
            }
        }
    }

    (a, b)
}

/// Day-over-day percentage change. A zero previous close yields 0.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Compounded return of a run of simple returns.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Close of the bar nearest to `target` within `window_days` on either side.
/// Ties go to the earlier bar.
pub fn nearest_close(bars: &[PriceBar], target: NaiveDate, window_days: i64) -> Option<f64> {
    bars.iter()
        .map(|b| ((b.date - target).num_days().abs(), b))
        .filter(|(distance, _)| *distance <= window_days)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, b)| b.close)
}
