//! Fuses the probabilistic scorer's candidate (V1) with the rule-based
//! validator's verdict (V2) into the final tradeable [`Signal`].
use crate::types::{Signal, SignalAction, ValidationRecord};

pub fn arbitrate(mut signal: Signal, validation: &ValidationRecord) -> Signal {
    if signal.action == SignalAction::Wait {
        signal.reasoning = "no candidate direction from scorer".to_string();
        return signal;
    }

    if validation.valid {
        let multiplier = if validation.confirmation_score > 50.0 {
            1.1
        } else if validation.confirmation_score >= 30.0 {
            1.0
        } else {
            0.7
        };
        signal.confidence = (signal.confidence * multiplier).clamp(0.0, 1.0);
    } else if signal.confidence > 0.7 {
        signal.confidence = (signal.confidence * 0.8).clamp(0.0, 1.0);
    } else {
        signal.action = SignalAction::Wait;
        signal.confidence = (signal.confidence * 0.5).clamp(0.0, 1.0);
    }

    signal.reasoning = validation.reasoning.clone();
    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryScores, IndicatorSnapshot, MarketCondition, SignalStrength};

    fn base_signal(action: SignalAction, confidence: f64) -> Signal {
        Signal {
            symbol: "BTCUSDT".to_string(),
            action,
            confidence,
            raw_score: confidence,
            adjusted_score: confidence,
            price: 100.0,
            stop_loss: 98.0,
            take_profit: 104.0,
            risk_reward: 2.0,
            category_scores: CategoryScores {
                momentum: 0.0,
                trend: 0.0,
                volatility: 0.0,
                volume: 0.0,
                mean_reversion: 0.0,
                probability: 0.0,
            },
            indicator_snapshot: IndicatorSnapshot {
                rsi: 50.0,
                macd: 0.0,
                macd_signal: 0.0,
                macd_histogram: 0.0,
                stoch_k: 50.0,
                stoch_d: 50.0,
                ema_9: 100.0,
                ema_20: 100.0,
                ema_50: 100.0,
                ema_200: 100.0,
                sma_20: 100.0,
                bb_upper: 105.0,
                bb_middle: 100.0,
                bb_lower: 95.0,
                bb_width: 10.0,
                atr: 1.0,
                adx: 20.0,
                cci: 0.0,
                mfi: 50.0,
                obv: 0.0,
                vwap: 100.0,
                mc_probability: 0.5,
                mc_expected_price: 100.0,
                gk_volatility: 0.2,
                z_score: 0.0,
                lr_slope: 0.0,
                current_price: 100.0,
            },
            reasoning: String::new(),
        }
    }

    fn validation(valid: bool, confirmation_score: f64) -> ValidationRecord {
        ValidationRecord {
            valid,
            confirmation_score,
            supporting_count: 4,
            conflicting_count: 0,
            strength: SignalStrength::Strong,
            market_condition: MarketCondition::TrendingUp,
            reasoning: "rsi + macd".to_string(),
            verdicts: Vec::new(),
        }
    }

    #[test]
    fn wait_action_passes_through_unchanged() {
        let signal = base_signal(SignalAction::Wait, 0.0);
        let out = arbitrate(signal, &validation(true, 80.0));
        assert_eq!(out.action, SignalAction::Wait);
    }

    #[test]
    fn high_confirmation_boosts_confidence() {
        let signal = base_signal(SignalAction::EnterLong, 0.5);
        let out = arbitrate(signal, &validation(true, 70.0));
        assert!((out.confidence - 0.55).abs() < 1e-9);
        assert_eq!(out.action, SignalAction::EnterLong);
    }

    #[test]
    fn boost_is_capped_at_one() {
        let signal = base_signal(SignalAction::EnterLong, 0.95);
        let out = arbitrate(signal, &validation(true, 70.0));
        assert!(out.confidence <= 1.0);
    }

    #[test]
    fn low_confirmation_damps_confidence() {
        let signal = base_signal(SignalAction::EnterLong, 0.5);
        let out = arbitrate(signal, &validation(true, 10.0));
        assert!((out.confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn invalid_with_high_v1_confidence_survives_damped() {
        let signal = base_signal(SignalAction::EnterLong, 0.8);
        let out = arbitrate(signal, &validation(false, 0.0));
        assert_eq!(out.action, SignalAction::EnterLong);
        assert!((out.confidence - 0.64).abs() < 1e-9);
    }

    #[test]
    fn invalid_with_low_v1_confidence_downgrades_to_wait() {
        let signal = base_signal(SignalAction::EnterLong, 0.5);
        let out = arbitrate(signal, &validation(false, 0.0));
        assert_eq!(out.action, SignalAction::Wait);
        assert!((out.confidence - 0.25).abs() < 1e-9);
    }
}
