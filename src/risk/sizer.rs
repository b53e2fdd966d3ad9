//! Position sizing: Kelly-fraction sizing once enough trade history exists,
//! an exploration fallback before that, and the preflight checks that can
//! reject a candidate outright regardless of the computed size.
use crate::expectancy::ExpectancyStats;
use crate::types::Regime;

pub const KELLY_FRACTION: f64 = 0.25;
const EXPLORATION_BASE_RISK_PCT: f64 = 0.005;
const EXPLORATION_HIGH_CONFIDENCE_MULTIPLIER: f64 = 1.5;
const EXPLORATION_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;
const HARD_NOTIONAL_CAP_PCT: f64 = 0.10;
const MIN_SAMPLE_SIZE: usize = 30;

pub struct SizingInput {
    pub balance: f64,
    pub entry: f64,
    pub stop: f64,
    pub leverage: f64,
    pub regime: Regime,
    pub confidence: f64,
    pub expectancy: Option<ExpectancyStats>,
}

#[derive(Debug, Clone, Copy)]
pub struct SizingOutcome {
    pub size: f64,
    pub used_kelly: bool,
}

pub fn size_position(input: &SizingInput) -> SizingOutcome {
    let risk_per_unit = (input.entry - input.stop).abs();
    if risk_per_unit < f64::EPSILON {
        return SizingOutcome { size: 0.0, used_kelly: false };
    }

    let (base_size, used_kelly) = match input.expectancy {
        Some(stats) if stats.sample_size >= MIN_SAMPLE_SIZE => {
            if stats.expectancy <= 0.0 {
                return SizingOutcome { size: 0.0, used_kelly: true };
            }
            let kelly_adj = stats.kelly_fraction_raw * KELLY_FRACTION;
            if kelly_adj <= 0.0 {
                return SizingOutcome { size: 0.0, used_kelly: true };
            }
            let risk_amount = input.balance * kelly_adj;
            (risk_amount / risk_per_unit * input.leverage, true)
        }
        _ => {
            let risk_pct = if input.confidence > EXPLORATION_HIGH_CONFIDENCE_THRESHOLD {
                EXPLORATION_BASE_RISK_PCT * EXPLORATION_HIGH_CONFIDENCE_MULTIPLIER
            } else {
                EXPLORATION_BASE_RISK_PCT
            };
            let risk_amount = input.balance * risk_pct;
            (risk_amount / risk_per_unit * input.leverage, false)
        }
    };

    let regime_adjusted = base_size * input.regime.risk_multiplier;
    let vol_penalty = volatility_penalty(input.regime.volatility);
    let penalized = regime_adjusted * vol_penalty;

    let cap = (input.balance * HARD_NOTIONAL_CAP_PCT) / input.entry;
    let size = penalized.min(cap).max(0.0);

    SizingOutcome { size, used_kelly }
}

fn volatility_penalty(gk_volatility: f64) -> f64 {
    if gk_volatility < 0.3 {
        1.0
    } else if gk_volatility < 0.5 {
        0.85
    } else if gk_volatility < 0.7 {
        0.65
    } else if gk_volatility < 0.9 {
        0.45
    } else {
        0.3
    }
}

pub struct RiskPreflightInput {
    pub open_position_count: usize,
    pub max_open_positions: usize,
    pub size: f64,
    pub entry: f64,
    pub balance: f64,
    pub leverage: f64,
}

pub fn validate_risk(input: &RiskPreflightInput) -> Result<(), &'static str> {
    if input.open_position_count >= input.max_open_positions {
        return Err("max_open_positions reached");
    }
    if input.size <= 0.0 {
        return Err("zero size");
    }
    let notional = input.size * input.entry;
    if notional > input.balance * 0.10 {
        return Err("position notional exceeds 10% of balance");
    }
    let required_margin = notional / input.leverage.max(1.0);
    if required_margin > input.balance {
        return Err("required margin exceeds balance");
    }
    Ok(())
}

/// Stop-loss/take-profit distances from the base ATR distance, adjusted for
/// the current regime.
pub fn stop_and_target_distance(atr: f64, regime: &Regime) -> (f64, f64) {
    const BASE_SL_MULT: f64 = 1.5;
    const RR_RATIO: f64 = 2.5;

    let sl_regime_factor = match regime.label {
        crate::types::RegimeLabel::Volatile => 1.5,
        crate::types::RegimeLabel::TrendUp | crate::types::RegimeLabel::TrendDown => 1.2,
        crate::types::RegimeLabel::Range => 0.9,
        crate::types::RegimeLabel::Chop => 0.8,
        crate::types::RegimeLabel::Unknown => 1.0,
    };
    let sl_distance = atr * BASE_SL_MULT * sl_regime_factor;

    let tp_regime_factor = match regime.label {
        crate::types::RegimeLabel::TrendUp | crate::types::RegimeLabel::TrendDown => 1.2,
        crate::types::RegimeLabel::Range => 0.8,
        crate::types::RegimeLabel::Chop => 0.7,
        crate::types::RegimeLabel::Volatile | crate::types::RegimeLabel::Unknown => 1.0,
    };
    let tp_distance = sl_distance * RR_RATIO * tp_regime_factor;

    (sl_distance, tp_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegimeLabel;

    fn regime(label: RegimeLabel, risk_multiplier: f64, volatility: f64) -> Regime {
        Regime {
            label,
            confidence: 0.8,
            risk_multiplier,
            volatility,
            adx: 30.0,
        }
    }

    #[test]
    fn zero_expectancy_blocks_kelly_sizing() {
        let input = SizingInput {
            balance: 10_000.0,
            entry: 100.0,
            stop: 98.0,
            leverage: 1.0,
            regime: regime(RegimeLabel::TrendUp, 1.3, 0.2),
            confidence: 0.6,
            expectancy: Some(ExpectancyStats {
                sample_size: 40,
                win_rate: Some(0.5),
                payoff_ratio: Some(1.0),
                expectancy: -0.1,
                kelly_fraction_raw: 0.1,
            }),
        };
        let outcome = size_position(&input);
        assert_eq!(outcome.size, 0.0);
    }

    #[test]
    fn exploration_path_used_below_sample_threshold() {
        let input = SizingInput {
            balance: 10_000.0,
            entry: 100.0,
            stop: 98.0,
            leverage: 1.0,
            regime: regime(RegimeLabel::Range, 0.8, 0.2),
            confidence: 0.8,
            expectancy: None,
        };
        let outcome = size_position(&input);
        assert!(!outcome.used_kelly);
        assert!(outcome.size > 0.0);
    }

    #[test]
    fn size_never_exceeds_hard_notional_cap() {
        let input = SizingInput {
            balance: 10_000.0,
            entry: 1.0,
            stop: 0.5,
            leverage: 20.0,
            regime: regime(RegimeLabel::TrendUp, 1.5, 0.1),
            confidence: 0.9,
            expectancy: Some(ExpectancyStats {
                sample_size: 100,
                win_rate: Some(0.7),
                payoff_ratio: Some(2.0),
                expectancy: 1.0,
                kelly_fraction_raw: 0.9,
            }),
        };
        let outcome = size_position(&input);
        assert!(outcome.size * input.entry <= input.balance * 0.10 + 1e-9);
    }

    #[test]
    fn preflight_rejects_when_positions_maxed_out() {
        let input = RiskPreflightInput {
            open_position_count: 3,
            max_open_positions: 3,
            size: 1.0,
            entry: 100.0,
            balance: 10_000.0,
            leverage: 1.0,
        };
        assert!(validate_risk(&input).is_err());
    }
}
