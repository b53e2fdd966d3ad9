use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub exit_reason: String,
}

impl ClosedTrade {
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        exit_price: f64,
        size: f64,
        entry_time: DateTime<Utc>,
        exit_reason: impl Into<String>,
    ) -> Self {
        let pnl = match side {
            Side::Buy => (exit_price - entry_price) * size,
            Side::Sell => (entry_price - exit_price) * size,
        };
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            entry_price,
            exit_price,
            size,
            pnl,
            entry_time,
            exit_time: Utc::now(),
            exit_reason: exit_reason.into(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Rolling empirical statistics gating Kelly-fraction position sizing.
/// Only produced once `sample_size >= 30` (see expectancy engine).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KellyInputs {
    pub win_rate: f64,
    pub payoff_ratio: f64,
    pub sample_size: usize,
    pub kelly_fraction_raw: f64,
    pub confidence_interval: f64,
    pub expectancy: f64,
}
