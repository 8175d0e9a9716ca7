//! Portfolio state and equal-weight rebalancing.
//!
//! `rebalance` is the only operation that moves cash or positions. Cash is
//! allowed to go slightly negative: the purchase check compares each order
//! against the whole pool available to the rebalance, not against what is
//! left after earlier orders.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::position::{Position, TradeAction, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub transactions: Vec<Transaction>,
    /// Value recorded by the most recent rebalance.
    pub portfolio_value: f64,
}

/// What a single rebalance did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebalanceSummary {
    pub gross_sale_proceeds: f64,
    pub gross_purchase_cost: f64,
    pub sale_fees: f64,
    pub purchase_fees: f64,
    pub new_value: f64,
    /// Held symbols with no price: cleared without proceeds.
    pub dropped_positions: Vec<String>,
    /// Targets with no price.
    pub unpriced_targets: Vec<String>,
    /// Targets whose order exceeded the available cash.
    pub unfunded_targets: Vec<String>,
}

impl RebalanceSummary {
    pub fn total_fees(&self) -> f64 {
        self.sale_fees + self.purchase_fees
    }
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            transactions: Vec::new(),
            portfolio_value: initial_capital,
        }
    }

    pub fn shares(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.shares)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn held_symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// `cash + Σ shares × price`. A held symbol missing from `price_map`
    /// contributes nothing; see [`Portfolio::unpriced_positions`].
    pub fn get_current_value(&self, price_map: &HashMap<String, f64>) -> f64 {
        let held: f64 = self
            .positions
            .values()
            .filter_map(|pos| price_map.get(&pos.symbol).map(|&p| pos.market_value(p)))
            .sum();
        self.cash + held
    }

    pub fn unpriced_positions(&self, price_map: &HashMap<String, f64>) -> Vec<String> {
        self.positions
            .keys()
            .filter(|s| !price_map.contains_key(*s))
            .cloned()
            .collect()
    }

    /// Liquidate everything and buy `target_symbols` in equal dollar amounts.
    ///
    /// 1. value the portfolio at `price_map` and split it evenly over targets
    /// 2. sell every priced holding, paying `fee_rate` on the sale value
    /// 3. clear all positions, including unpriced ones
    /// 4. buy each priced target whose value plus fee fits the pool of
    ///    old cash plus net proceeds; others are skipped, never partially filled
    /// 5. cash = pool − Σ (purchase value + fee), then record the new value
    ///
    /// Duplicate targets are bought once.
    pub fn rebalance(
        &mut self,
        date: NaiveDate,
        target_symbols: &[String],
        price_map: &HashMap<String, f64>,
        fee_rate: f64,
    ) -> RebalanceSummary {
        let mut seen = HashSet::new();
        let targets: Vec<&String> = target_symbols
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .collect();

        let current_value = self.get_current_value(price_map);
        let mut summary = RebalanceSummary::default();

        let mut net_sale_proceeds = 0.0;
        for pos in self.positions.values() {
            let Some(&price) = price_map.get(&pos.symbol) else {
                summary.dropped_positions.push(pos.symbol.clone());
                continue;
            };
            if pos.shares <= 0.0 {
                continue;
            }
            let gross = pos.market_value(price);
            let fee = gross * fee_rate;
            let net = gross - fee;
            summary.gross_sale_proceeds += gross;
            summary.sale_fees += fee;
            net_sale_proceeds += net;
            self.transactions.push(Transaction {
                date,
                symbol: pos.symbol.clone(),
                action: TradeAction::Sell,
                shares: pos.shares,
                price,
                gross_value: gross,
                fee,
                net_value: net,
            });
        }
        self.positions.clear();

        let available_cash = self.cash + net_sale_proceeds;
        let mut total_purchase_cost = 0.0;

        if !targets.is_empty() {
            let target_value = current_value / targets.len() as f64;
            for symbol in targets {
                let Some(&price) = price_map.get(symbol) else {
                    summary.unpriced_targets.push(symbol.clone());
                    continue;
                };
                if price <= 0.0 {
                    summary.unpriced_targets.push(symbol.clone());
                    continue;
                }
                let shares = target_value / price;
                let gross = shares * price;
                let fee = gross * fee_rate;
                let cost = gross + fee;
                if cost > available_cash {
                    summary.unfunded_targets.push(symbol.clone());
                    continue;
                }
                self.positions.insert(
                    symbol.clone(),
                    Position {
                        symbol: symbol.clone(),
                        shares,
                    },
                );
                total_purchase_cost += cost;
                summary.gross_purchase_cost += gross;
                summary.purchase_fees += fee;
                self.transactions.push(Transaction {
                    date,
                    symbol: symbol.clone(),
                    action: TradeAction::Buy,
                    shares,
                    price,
                    gross_value: gross,
                    fee,
                    net_value: gross,
                });
            }
        }

        self.cash = available_cash - total_purchase_cost;
        self.portfolio_value = self.get_current_value(price_map);
        summary.new_value = self.portfolio_value;
        summary
    }
}
