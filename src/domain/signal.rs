//! Coarse labels derived from a [`ScoreSet`] for human-readable output.

use std::fmt;

use super::score::ScoreSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthSignal {
    Strong,
    Positive,
    Neutral,
    Negative,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsSignal {
    Accelerating,
    Positive,
    Stable,
    Negative,
    Decelerating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    StrongUptrend,
    Uptrend,
    Sideways,
    Downtrend,
    StrongDowntrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallSignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumSignals {
    pub relative_strength: StrengthSignal,
    pub earnings: EarningsSignal,
    pub price: TrendSignal,
    pub overall: OverallSignal,
}

impl MomentumSignals {
    pub fn classify(set: &ScoreSet) -> Self {
        MomentumSignals {
            relative_strength: StrengthSignal::from_score(set.scores.rs_vs_benchmark),
            earnings: EarningsSignal::from_score(set.scores.eps_momentum),
            price: TrendSignal::from_score(set.scores.price_momentum),
            overall: OverallSignal::from_score(set.combined_score),
        }
    }
}

impl StrengthSignal {
    pub fn from_score(rs: f64) -> Self {
        if rs > 10.0 {
            StrengthSignal::Strong
        } else if rs > 5.0 {
            StrengthSignal::Positive
        } else if rs < -10.0 {
            StrengthSignal::Weak
        } else if rs < -5.0 {
            StrengthSignal::Negative
        } else {
            StrengthSignal::Neutral
        }
    }
}

impl EarningsSignal {
    pub fn from_score(eps: f64) -> Self {
        if eps > 5.0 {
            EarningsSignal::Accelerating
        } else if eps > 0.0 {
            EarningsSignal::Positive
        } else if eps < -5.0 {
            EarningsSignal::Decelerating
        } else if eps < 0.0 {
            EarningsSignal::Negative
        } else {
            EarningsSignal::Stable
        }
    }
}

impl TrendSignal {
    pub fn from_score(price: f64) -> Self {
        if price > 10.0 {
            TrendSignal::StrongUptrend
        } else if price > 5.0 {
            TrendSignal::Uptrend
        } else if price < -10.0 {
            TrendSignal::StrongDowntrend
        } else if price < -5.0 {
            TrendSignal::Downtrend
        } else {
            TrendSignal::Sideways
        }
    }
}

impl OverallSignal {
    pub fn from_score(combined: f64) -> Self {
        if combined > 15.0 {
            OverallSignal::StrongBuy
        } else if combined > 5.0 {
            OverallSignal::Buy
        } else if combined < -15.0 {
            OverallSignal::StrongSell
        } else if combined < -5.0 {
            OverallSignal::Sell
        } else {
            OverallSignal::Hold
        }
    }
}

impl fmt::Display for StrengthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrengthSignal::Strong => "STRONG",
            StrengthSignal::Positive => "POSITIVE",
            StrengthSignal::Neutral => "NEUTRAL",
            StrengthSignal::Negative => "NEGATIVE",
            StrengthSignal::Weak => "WEAK",
        })
    }
}

impl fmt::Display for EarningsSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EarningsSignal::Accelerating => "ACCELERATING",
            EarningsSignal::Positive => "POSITIVE",
            EarningsSignal::Stable => "STABLE",
            EarningsSignal::Negative => "NEGATIVE",
            EarningsSignal::Decelerating => "DECELERATING",
        })
    }
}

impl fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendSignal::StrongUptrend => "STRONG_UPTREND",
            TrendSignal::Uptrend => "UPTREND",
            TrendSignal::Sideways => "SIDEWAYS",
            TrendSignal::Downtrend => "DOWNTREND",
            TrendSignal::StrongDowntrend => "STRONG_DOWNTREND",
        })
    }
}

impl fmt::Display for OverallSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverallSignal::StrongBuy => "STRONG_BUY",
            OverallSignal::Buy => "BUY",
            OverallSignal::Hold => "HOLD",
            OverallSignal::Sell => "SELL",
            OverallSignal::StrongSell => "STRONG_SELL",
        })
    }
}
