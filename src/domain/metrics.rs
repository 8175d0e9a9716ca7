//! Run-level performance statistics over processed periods.

use super::backtest::PeriodResult;

pub const PERIODS_PER_YEAR: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub num_periods: usize,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub portfolio_volatility: f64,
    pub benchmark_volatility: f64,
    pub sharpe_ratio: f64,
    pub outperformance_rate: f64,
    pub average_excess_return: f64,
    pub positive_periods: usize,
    pub negative_periods: usize,
    /// Largest peak-to-trough fall of period-end values, as a fraction.
    pub max_drawdown: f64,
    pub total_transaction_costs: f64,
}

impl PerformanceSummary {
    /// `None` when no period was processed. The final value is the last
    /// processed period's value at its end date.
    pub fn compute(periods: &[PeriodResult], initial_capital: f64) -> Option<Self> {
        let final_value = periods.last()?.portfolio_value_at_end;
        let n = periods.len() as f64;

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let growth = 1.0 + total_return;
        let annual_return = if growth > 0.0 {
            growth.powf(PERIODS_PER_YEAR / n) - 1.0
        } else {
            -1.0
        };

        let portfolio_returns: Vec<f64> = periods.iter().map(|p| p.portfolio_return).collect();
        let benchmark_returns: Vec<f64> = periods.iter().map(|p| p.benchmark_return).collect();
        let excess: Vec<f64> = periods.iter().map(|p| p.excess_return).collect();

        let portfolio_volatility = annualized_volatility(&portfolio_returns);
        let benchmark_volatility = annualized_volatility(&benchmark_returns);

        let sharpe_ratio = if portfolio_volatility > 0.0 {
            annual_return / portfolio_volatility
        } else {
            0.0
        };

        let outperformance_rate = excess.iter().filter(|&&x| x > 0.0).count() as f64 / n;
        let average_excess_return = excess.iter().sum::<f64>() / n;

        let mut values = Vec::with_capacity(periods.len() + 1);
        values.push(initial_capital);
        values.extend(periods.iter().map(|p| p.portfolio_value_at_end));

        Some(PerformanceSummary {
            num_periods: periods.len(),
            initial_capital,
            final_value,
            total_return,
            annual_return,
            portfolio_volatility,
            benchmark_volatility,
            sharpe_ratio,
            outperformance_rate,
            average_excess_return,
            positive_periods: portfolio_returns.iter().filter(|&&r| r > 0.0).count(),
            negative_periods: portfolio_returns.iter().filter(|&&r| r < 0.0).count(),
            max_drawdown: compute_drawdown(&values),
            total_transaction_costs: periods.iter().map(|p| p.transaction_costs).sum(),
        })
    }
}

/// Population standard deviation scaled by `sqrt(PERIODS_PER_YEAR)`.
fn annualized_volatility(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * PERIODS_PER_YEAR.sqrt()
}

fn compute_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}
