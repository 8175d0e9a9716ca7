//! Momentum score records, factor weights and ranking.
//!
//! A sub-score of exactly `0.0` doubles as the "unavailable" marker: it is
//! excluded from the combination and its weight is spread over the factors
//! that did produce a value.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

/// The five momentum factors, in combination order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    RelativeStrength,
    Eps,
    Price,
    Valuation,
    Volume,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::RelativeStrength,
        Factor::Eps,
        Factor::Price,
        Factor::Valuation,
        Factor::Volume,
    ];

    pub const fn index(self) -> usize {
        match self {
            Factor::RelativeStrength => 0,
            Factor::Eps => 1,
            Factor::Price => 2,
            Factor::Valuation => 3,
            Factor::Volume => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Factor::RelativeStrength => "rs_vs_benchmark",
            Factor::Eps => "eps_momentum",
            Factor::Price => "price_momentum",
            Factor::Valuation => "valuation_momentum",
            Factor::Volume => "volume_momentum",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw factor values for one symbol on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub rs_vs_benchmark: f64,
    pub eps_momentum: f64,
    pub price_momentum: f64,
    pub valuation_momentum: f64,
    pub volume_momentum: f64,
}

impl SubScores {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::RelativeStrength => self.rs_vs_benchmark,
            Factor::Eps => self.eps_momentum,
            Factor::Price => self.price_momentum,
            Factor::Valuation => self.valuation_momentum,
            Factor::Volume => self.volume_momentum,
        }
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        let slot = match factor {
            Factor::RelativeStrength => &mut self.rs_vs_benchmark,
            Factor::Eps => &mut self.eps_momentum,
            Factor::Price => &mut self.price_momentum,
            Factor::Valuation => &mut self.valuation_momentum,
            Factor::Volume => &mut self.volume_momentum,
        };
        *slot = value;
    }

    /// Factors whose value is exactly zero.
    pub fn unavailable(&self) -> Vec<Factor> {
        Factor::ALL
            .into_iter()
            .filter(|&f| self.get(f) == 0.0)
            .collect()
    }
}

/// Per-factor weights, indexed by [`Factor::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights([f64; 5]);

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights([0.35, 0.25, 0.20, 0.10, 0.10])
    }
}

impl FactorWeights {
    pub const SUM_TOLERANCE: f64 = 1e-6;

    pub const fn new(rs: f64, eps: f64, price: f64, valuation: f64, volume: f64) -> Self {
        FactorWeights([rs, eps, price, valuation, volume])
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.0[factor.index()]
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < Self::SUM_TOLERANCE
    }

    /// Weights actually applied to `scores`.
    ///
    /// Zero-valued factors get weight 0 and the remaining base weights are
    /// scaled up proportionally so they sum to 1. When every factor is zero
    /// the base weights are returned unchanged.
    pub fn effective(&self, scores: &SubScores) -> FactorWeights {
        let available: f64 = Factor::ALL
            .into_iter()
            .filter(|&f| scores.get(f) != 0.0)
            .map(|f| self.get(f))
            .sum();

        if available <= 0.0 {
            return *self;
        }

        let mut out = [0.0; 5];
        for f in Factor::ALL {
            if scores.get(f) != 0.0 {
                out[f.index()] = self.get(f) / available;
            }
        }
        FactorWeights(out)
    }

    pub fn combine(&self, scores: &SubScores) -> f64 {
        let weights = self.effective(scores);
        Factor::ALL
            .into_iter()
            .map(|f| scores.get(f) * weights.get(f))
            .sum()
    }
}

/// A factor that fell back to 0 because its data lookup failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreIssue {
    pub factor: Factor,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSet {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub scores: SubScores,
    pub weights: FactorWeights,
    pub combined_score: f64,
    /// 1 is best. Zero until [`rank_scores`] runs.
    pub rank: usize,
    pub issues: Vec<ScoreIssue>,
}

impl ScoreSet {
    pub fn new(
        symbol: String,
        as_of: NaiveDate,
        scores: SubScores,
        base: &FactorWeights,
        issues: Vec<ScoreIssue>,
    ) -> Self {
        let weights = base.effective(&scores);
        let combined_score = base.combine(&scores);
        ScoreSet {
            symbol,
            as_of,
            scores,
            weights,
            combined_score,
            rank: 0,
            issues,
        }
    }

    /// True when any factor was unavailable or failed.
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty() || !self.scores.unavailable().is_empty()
    }
}

/// Sort descending by combined score and assign ranks 1..=N.
/// The sort is stable, so ties keep their input order.
pub fn rank_scores(mut sets: Vec<ScoreSet>) -> Vec<ScoreSet> {
    sets.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
    for (i, set) in sets.iter_mut().enumerate() {
        set.rank = i + 1;
    }
    sets
}
