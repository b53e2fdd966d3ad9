use serde::{Deserialize, Serialize};

use super::IndicatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    EnterLong,
    EnterShort,
    ExitLong,
    ExitShort,
    Wait,
}

impl SignalAction {
    pub fn is_entry(&self) -> bool {
        matches!(self, SignalAction::EnterLong | SignalAction::EnterShort)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, SignalAction::EnterLong | SignalAction::ExitShort)
    }
}

/// Six bounded category scores in [-1, 1] produced by the probabilistic
/// scorer, before weighting and aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryScores {
    pub momentum: f64,
    pub trend: f64,
    pub volatility: f64,
    pub volume: f64,
    pub mean_reversion: f64,
    pub probability: f64,
}

impl CategoryScores {
    pub const WEIGHTS: CategoryWeights = CategoryWeights {
        momentum: 0.25,
        trend: 0.20,
        volatility: 0.15,
        volume: 0.10,
        mean_reversion: 0.20,
        probability: 0.10,
    };

    pub fn weighted_sum(&self) -> f64 {
        let w = Self::WEIGHTS;
        self.momentum * w.momentum
            + self.trend * w.trend
            + self.volatility * w.volatility
            + self.volume * w.volume
            + self.mean_reversion * w.mean_reversion
            + self.probability * w.probability
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryWeights {
    pub momentum: f64,
    pub trend: f64,
    pub volatility: f64,
    pub volume: f64,
    pub mean_reversion: f64,
    pub probability: f64,
}

/// Which bucket the V2 validator placed one indicator's signal into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorVote {
    Supporting,
    Conflicting,
    Neutral,
}

/// One indicator's contribution to V2's validation, named for telemetry/reasoning.
#[derive(Debug, Clone)]
pub struct IndicatorVerdict {
    pub name: &'static str,
    pub vote: IndicatorVote,
    /// true = this indicator's direction agrees with the long side.
    pub favors_long: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Normal,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketCondition {
    Volatile,
    TrendingUp,
    TrendingDown,
    Ranging,
    Uncertain,
}

/// The rule-based validator's verdict for a candidate V1 action.
#[derive(Debug, Clone)]
pub struct ValidationRecord {
    pub valid: bool,
    pub confirmation_score: f64,
    pub supporting_count: usize,
    pub conflicting_count: usize,
    pub strength: SignalStrength,
    pub market_condition: MarketCondition,
    pub reasoning: String,
    pub verdicts: Vec<IndicatorVerdict>,
}

/// Final, arbitrated trade candidate for one symbol.
#[derive(Debug, Clone)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    pub confidence: f64,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub category_scores: CategoryScores,
    pub indicator_snapshot: IndicatorSnapshot,
    pub reasoning: String,
}

impl Signal {
    pub fn waiting(symbol: impl Into<String>, indicator_snapshot: IndicatorSnapshot) -> Self {
        Self {
            symbol: symbol.into(),
            action: SignalAction::Wait,
            confidence: 0.0,
            raw_score: 0.0,
            adjusted_score: 0.0,
            price: indicator_snapshot.current_price,
            stop_loss: 0.0,
            take_profit: 0.0,
            risk_reward: 0.0,
            category_scores: CategoryScores {
                momentum: 0.0,
                trend: 0.0,
                volatility: 0.0,
                volume: 0.0,
                mean_reversion: 0.0,
                probability: 0.0,
            },
            indicator_snapshot,
            reasoning: "no actionable edge".to_string(),
        }
    }
}
