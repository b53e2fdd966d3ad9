//! Rule-based validator: cross-checks the probabilistic scorer's candidate
//! direction against a fixed set of indicator thresholds, bucketing each into
//! supporting/conflicting/neutral and computing a confirmation score.
use crate::types::{
    EmaAlignment, IndicatorSnapshot, IndicatorVerdict, IndicatorVote, MarketCondition, Signal,
    SignalAction, SignalStrength, ValidationRecord,
};

const MIN_CONFIDENCE_FOR_VALIDITY: f64 = 0.4;
const MIN_SUPPORTING: usize = 3;
const MAX_CONFLICTING: usize = 2;

pub fn validate(signal: &Signal) -> ValidationRecord {
    if signal.action == SignalAction::Wait {
        return ValidationRecord {
            valid: true,
            confirmation_score: 0.0,
            supporting_count: 0,
            conflicting_count: 0,
            strength: SignalStrength::Neutral,
            market_condition: market_condition(&signal.indicator_snapshot),
            reasoning: "no candidate direction to validate".to_string(),
            verdicts: Vec::new(),
        };
    }

    let wants_long = signal.action == SignalAction::EnterLong;
    let verdicts = analyze_indicators(&signal.indicator_snapshot);

    let supporting_count = verdicts
        .iter()
        .filter(|v| v.vote == IndicatorVote::Supporting && v.favors_long == wants_long)
        .count();
    let conflicting_count = verdicts
        .iter()
        .filter(|v| v.vote == IndicatorVote::Conflicting || (v.vote == IndicatorVote::Supporting && v.favors_long != wants_long))
        .count();

    let total_bucketed = verdicts
        .iter()
        .filter(|v| v.vote != IndicatorVote::Neutral)
        .count();
    let confirmation_score = if total_bucketed == 0 {
        0.0
    } else {
        let in_direction = verdicts
            .iter()
            .filter(|v| v.vote == IndicatorVote::Supporting && v.favors_long == wants_long)
            .count();
        in_direction as f64 / total_bucketed as f64 * 100.0
    };

    let valid = signal.confidence >= MIN_CONFIDENCE_FOR_VALIDITY
        && supporting_count >= MIN_SUPPORTING
        && conflicting_count <= MAX_CONFLICTING;

    let combined = signal.confidence * 0.7 + (supporting_count as f64 / 10.0) * 0.3;
    let strength = if combined >= 0.8 {
        SignalStrength::Strong
    } else if combined >= 0.6 {
        SignalStrength::Normal
    } else {
        SignalStrength::Neutral
    };

    let reasoning = build_reasoning(&verdicts, wants_long, &signal.indicator_snapshot);

    ValidationRecord {
        valid,
        confirmation_score,
        supporting_count,
        conflicting_count,
        strength,
        market_condition: market_condition(&signal.indicator_snapshot),
        reasoning,
        verdicts,
    }
}

fn analyze_indicators(s: &IndicatorSnapshot) -> Vec<IndicatorVerdict> {
    let mut verdicts = Vec::with_capacity(9);

    verdicts.push(if s.rsi < 30.0 {
        IndicatorVerdict { name: "rsi", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.rsi > 70.0 {
        IndicatorVerdict { name: "rsi", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "rsi", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(if s.macd_histogram > 5.0 {
        IndicatorVerdict { name: "macd", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.macd_histogram < -5.0 {
        IndicatorVerdict { name: "macd", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "macd", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(if s.stoch_k < 20.0 {
        IndicatorVerdict { name: "stochastic", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.stoch_k > 80.0 {
        IndicatorVerdict { name: "stochastic", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "stochastic", vote: IndicatorVote::Neutral, favors_long: true }
    });

    let bb_position = s.bb_position();
    verdicts.push(if bb_position <= -0.9 {
        IndicatorVerdict { name: "bollinger", vote: IndicatorVote::Supporting, favors_long: true }
    } else if bb_position >= 0.9 {
        IndicatorVerdict { name: "bollinger", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "bollinger", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(match s.ema_alignment_3() {
        EmaAlignment::Bullish => IndicatorVerdict { name: "ema_alignment", vote: IndicatorVote::Supporting, favors_long: true },
        EmaAlignment::Bearish => IndicatorVerdict { name: "ema_alignment", vote: IndicatorVote::Supporting, favors_long: false },
        EmaAlignment::Mixed => IndicatorVerdict { name: "ema_alignment", vote: IndicatorVote::Neutral, favors_long: true },
    });

    verdicts.push(if s.adx > 25.0 {
        IndicatorVerdict { name: "adx", vote: IndicatorVote::Supporting, favors_long: s.ema_9 > s.ema_50 }
    } else if s.adx < 15.0 {
        IndicatorVerdict { name: "adx", vote: IndicatorVote::Conflicting, favors_long: true }
    } else {
        IndicatorVerdict { name: "adx", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(if s.mc_probability > 0.65 {
        IndicatorVerdict { name: "monte_carlo", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.mc_probability < 0.35 {
        IndicatorVerdict { name: "monte_carlo", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "monte_carlo", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(if s.z_score > 2.0 {
        IndicatorVerdict { name: "z_score", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.z_score < -2.0 {
        IndicatorVerdict { name: "z_score", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "z_score", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts.push(if s.lr_slope > 0.002 {
        IndicatorVerdict { name: "lr_slope", vote: IndicatorVote::Supporting, favors_long: true }
    } else if s.lr_slope < -0.002 {
        IndicatorVerdict { name: "lr_slope", vote: IndicatorVote::Supporting, favors_long: false }
    } else {
        IndicatorVerdict { name: "lr_slope", vote: IndicatorVote::Neutral, favors_long: true }
    });

    verdicts
}

fn market_condition(s: &IndicatorSnapshot) -> MarketCondition {
    if s.gk_volatility > 0.5 {
        MarketCondition::Volatile
    } else if s.adx > 30.0 {
        if s.ema_9 > s.ema_50 {
            MarketCondition::TrendingUp
        } else {
            MarketCondition::TrendingDown
        }
    } else if s.adx < 20.0 {
        MarketCondition::Ranging
    } else {
        MarketCondition::Uncertain
    }
}

fn build_reasoning(verdicts: &[IndicatorVerdict], wants_long: bool, s: &IndicatorSnapshot) -> String {
    let mut reasons: Vec<&'static str> = verdicts
        .iter()
        .filter(|v| v.vote == IndicatorVote::Supporting && v.favors_long == wants_long)
        .map(|v| v.name)
        .take(3)
        .collect();
    if reasons.is_empty() {
        reasons.push("no strong indicator confirmation");
    }
    format!(
        "{} | Market: {:?}",
        reasons.join(" + "),
        market_condition(s)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryScores;

    fn signal_with(rsi: f64, adx: f64, action: SignalAction, confidence: f64) -> Signal {
        let snapshot = IndicatorSnapshot {
            rsi,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 8.0,
            stoch_k: 15.0,
            stoch_d: 15.0,
            ema_9: 105.0,
            ema_20: 102.0,
            ema_50: 100.0,
            ema_200: 98.0,
            sma_20: 100.0,
            bb_upper: 105.0,
            bb_middle: 100.0,
            bb_lower: 95.0,
            bb_width: 10.0,
            atr: 1.0,
            adx,
            cci: 0.0,
            mfi: 50.0,
            obv: 0.0,
            vwap: 100.0,
            mc_probability: 0.7,
            mc_expected_price: 101.0,
            gk_volatility: 0.2,
            z_score: -2.5,
            lr_slope: 0.0,
            current_price: 100.0,
        };
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
            indicator_snapshot: snapshot,
            reasoning: String::new(),
        }
    }

    #[test]
    fn wait_signal_is_trivially_valid() {
        let signal = signal_with(50.0, 20.0, SignalAction::Wait, 0.0);
        let record = validate(&signal);
        assert!(record.valid);
    }

    #[test]
    fn strongly_confirmed_long_is_valid() {
        let signal = signal_with(20.0, 30.0, SignalAction::EnterLong, 0.6);
        let record = validate(&signal);
        assert!(record.valid, "expected valid, got {:?}", record);
        assert!(record.supporting_count >= MIN_SUPPORTING);
    }

    #[test]
    fn low_confidence_below_floor_is_invalid() {
        let signal = signal_with(20.0, 30.0, SignalAction::EnterLong, 0.1);
        let record = validate(&signal);
        assert!(!record.valid);
    }
}
