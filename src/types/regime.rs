use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeLabel {
    TrendUp,
    TrendDown,
    Range,
    Chop,
    Volatile,
    Unknown,
}

impl RegimeLabel {
    pub fn is_trend(&self) -> bool {
        matches!(self, RegimeLabel::TrendUp | RegimeLabel::TrendDown)
    }

    pub fn recommended_strategy(&self) -> &'static str {
        match self {
            RegimeLabel::TrendUp | RegimeLabel::TrendDown => "trend_following",
            RegimeLabel::Range => "mean_reversion",
            RegimeLabel::Chop => "avoid",
            RegimeLabel::Volatile => "avoid",
            RegimeLabel::Unknown => "scalp_only",
        }
    }

    pub fn preferred_holding_minutes(&self) -> u32 {
        match self {
            RegimeLabel::TrendUp | RegimeLabel::TrendDown => 240,
            RegimeLabel::Range => 120,
            RegimeLabel::Chop => 60,
            RegimeLabel::Volatile => 30,
            RegimeLabel::Unknown => 180,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Regime {
    pub label: RegimeLabel,
    pub confidence: f64,
    pub risk_multiplier: f64,
    pub volatility: f64,
    pub adx: f64,
}

impl Regime {
    pub fn tradeable(&self) -> bool {
        if self.label == RegimeLabel::Volatile {
            return false;
        }
        if self.label == RegimeLabel::Chop && self.confidence > 0.6 {
            return false;
        }
        if self.confidence < 0.3 {
            return false;
        }
        if self.volatility > 0.9 {
            return false;
        }
        true
    }
}
