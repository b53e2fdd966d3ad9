use serde::{Deserialize, Serialize};

use crate::types::TimeFrame;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub universe: Vec<String>,
    pub timeframe: String,
    pub risk: RiskSettings,
    pub loop_settings: LoopSettings,
    pub circuit: CircuitThresholds,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            universe: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
                "ADAUSDT".to_string(),
                "XRPUSDT".to_string(),
                "LTCUSDT".to_string(),
                "DOGEUSDT".to_string(),
                "BNBUSDT".to_string(),
            ],
            timeframe: "M5".to_string(),
            risk: RiskSettings::default(),
            loop_settings: LoopSettings::default(),
            circuit: CircuitThresholds::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.universe.is_empty() {
            errors.push("universe must not be empty".to_string());
        }
        for symbol in &self.universe {
            if crate::types::TradingPair::from_str(symbol).is_none() {
                errors.push(format!("unknown symbol in universe: {symbol}"));
            }
        }
        if TimeFrame::from_str(&self.timeframe).is_none() {
            errors.push(format!("unknown timeframe: {}", self.timeframe));
        }

        if self.risk.max_open_positions == 0 {
            errors.push("max_open_positions must be > 0".to_string());
        }
        if self.risk.max_leverage == 0 {
            errors.push("max_leverage must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.risk.min_confidence) {
            errors.push("min_confidence must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.risk.kelly_fraction) {
            errors.push("kelly_fraction must be between 0 and 1".to_string());
        }
        if self.risk.max_risk_per_trade <= 0.0 || self.risk.max_risk_per_trade > 1.0 {
            errors.push("max_risk_per_trade must be between 0 and 1".to_string());
        }
        if self.risk.max_daily_loss <= 0.0 || self.risk.max_daily_loss > 1.0 {
            errors.push("max_daily_loss must be between 0 and 1".to_string());
        }

        if self.loop_settings.cycle_period_seconds == 0 {
            errors.push("cycle_period_seconds must be > 0".to_string());
        }
        if self.loop_settings.strategy_monitor_interval_cycles == 0 {
            errors.push("strategy_monitor_interval_cycles must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn universe_pairs(&self) -> Vec<crate::types::TradingPair> {
        self.universe
            .iter()
            .filter_map(|s| crate::types::TradingPair::from_str(s))
            .collect()
    }

    pub fn timeframe(&self) -> TimeFrame {
        TimeFrame::from_str(&self.timeframe).unwrap_or(TimeFrame::M5)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    pub max_open_positions: usize,
    pub max_leverage: u32,
    pub min_confidence: f64,
    pub kelly_fraction: f64,
    pub max_risk_per_trade: f64,
    pub max_daily_loss: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_open_positions: 3,
            max_leverage: 20,
            min_confidence: 0.5,
            kelly_fraction: 0.25,
            max_risk_per_trade: 0.02,
            max_daily_loss: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSettings {
    pub cycle_period_seconds: u64,
    pub strategy_monitor_interval_cycles: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            cycle_period_seconds: 10,
            strategy_monitor_interval_cycles: 20,
        }
    }
}

/// Overridable thresholds mirroring the constants in `crate::circuit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitThresholds {
    pub alert_latency_ms: f64,
    pub throttle_latency_ms: f64,
    pub halt_latency_ms: f64,
    pub alert_failures: u32,
    pub throttle_failures: u32,
    pub halt_failures: u32,
    pub alert_slippage_pct: f64,
    pub throttle_slippage_pct: f64,
    pub halt_slippage_pct: f64,
    pub halt_unexpected_loss_pct: f64,
}

impl Default for CircuitThresholds {
    fn default() -> Self {
        Self {
            alert_latency_ms: crate::circuit::ALERT_LATENCY_MS,
            throttle_latency_ms: crate::circuit::THROTTLE_LATENCY_MS,
            halt_latency_ms: crate::circuit::HALT_LATENCY_MS,
            alert_failures: crate::circuit::ALERT_CONSECUTIVE_FAILURES,
            throttle_failures: crate::circuit::THROTTLE_CONSECUTIVE_FAILURES,
            halt_failures: crate::circuit::HALT_CONSECUTIVE_FAILURES,
            alert_slippage_pct: crate::circuit::ALERT_SLIPPAGE_PCT,
            throttle_slippage_pct: crate::circuit::THROTTLE_SLIPPAGE_PCT,
            halt_slippage_pct: crate::circuit::HALT_SLIPPAGE_PCT,
            halt_unexpected_loss_pct: crate::circuit::HALT_UNEXPECTED_LOSS_PCT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_universe_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.universe.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_open_positions_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.risk.max_open_positions = 0;
        assert!(config.validate().is_err());
    }
}
