//! Probabilistic scorer: turns an [`IndicatorSnapshot`] into six bounded
//! [`CategoryScores`], aggregates them into a confidence-weighted action, and
//! proposes ATR-based stop-loss/take-profit levels.
use crate::types::{CategoryScores, EmaAlignment, IndicatorSnapshot, Signal, SignalAction};

const ACTION_THRESHOLD: f64 = 0.2;
const DEFAULT_ATR_PCT: f64 = 0.005;
const SL_ATR_MULTIPLIER: f64 = 1.5;
const TP_ATR_MULTIPLIER: f64 = 3.0;

pub fn score(symbol: &str, snapshot: &IndicatorSnapshot) -> Signal {
    let category_scores = category_scores(snapshot);
    let raw_score = category_scores.weighted_sum().clamp(-1.0, 1.0);

    let volatility_factor = volatility_factor(snapshot.gk_volatility);
    let mut adjusted_score = raw_score * volatility_factor;
    if snapshot.gk_volatility > 0.9 {
        adjusted_score *= 0.3;
    }
    adjusted_score = adjusted_score.clamp(-1.0, 1.0);

    let action = if adjusted_score > ACTION_THRESHOLD {
        SignalAction::EnterLong
    } else if adjusted_score < -ACTION_THRESHOLD {
        SignalAction::EnterShort
    } else {
        SignalAction::Wait
    };
    let confidence = adjusted_score.abs().clamp(0.0, 1.0);

    let atr = if snapshot.atr.abs() < f64::EPSILON {
        snapshot.current_price * DEFAULT_ATR_PCT
    } else {
        snapshot.atr
    };
    let is_long = action == SignalAction::EnterLong;
    let (stop_loss, take_profit) = match action {
        SignalAction::EnterLong => (
            snapshot.current_price - atr * SL_ATR_MULTIPLIER,
            snapshot.current_price + atr * TP_ATR_MULTIPLIER,
        ),
        SignalAction::EnterShort => (
            snapshot.current_price + atr * SL_ATR_MULTIPLIER,
            snapshot.current_price - atr * TP_ATR_MULTIPLIER,
        ),
        _ => (0.0, 0.0),
    };
    let risk_reward = if action.is_entry() {
        let risk = (snapshot.current_price - stop_loss).abs();
        let reward = (take_profit - snapshot.current_price).abs();
        if risk.abs() < f64::EPSILON {
            0.0
        } else {
            reward / risk
        }
    } else {
        0.0
    };
    let _ = is_long;

    Signal {
        symbol: symbol.to_string(),
        action,
        confidence,
        raw_score,
        adjusted_score,
        price: snapshot.current_price,
        stop_loss,
        take_profit,
        risk_reward,
        category_scores,
        indicator_snapshot: *snapshot,
        reasoning: String::new(),
    }
}

fn category_scores(s: &IndicatorSnapshot) -> CategoryScores {
    CategoryScores {
        momentum: momentum_score(s),
        trend: trend_score(s),
        volatility: volatility_score(s),
        volume: volume_score(s),
        mean_reversion: mean_reversion_score(s),
        probability: 2.0 * (s.mc_probability - 0.5),
    }
    .clamp_all()
}

fn momentum_score(s: &IndicatorSnapshot) -> f64 {
    let rsi_component = -((2.0 * (s.rsi - 50.0) / 50.0).tanh());
    let stoch_component = -((2.0 * (s.stoch_k - 50.0) / 50.0).tanh());
    let cci_component = (s.cci / 100.0).tanh();
    (rsi_component + stoch_component + cci_component) / 3.0
}

fn trend_score(s: &IndicatorSnapshot) -> f64 {
    let macd_component = (s.macd_histogram / 10.0).tanh();
    let alignment = match s.ema_alignment_3() {
        EmaAlignment::Bullish => 0.8,
        EmaAlignment::Bearish => -0.8,
        EmaAlignment::Mixed => 0.0,
    };
    let adx_component = (s.adx / 50.0).min(1.0);
    (macd_component + alignment * adx_component) / 2.0
}

fn volatility_score(s: &IndicatorSnapshot) -> f64 {
    let bb_position = s.bb_position();
    -0.7 * bb_position + 0.3 * (((s.gk_volatility - 0.3) / 0.2).tanh())
}

fn volume_score(s: &IndicatorSnapshot) -> f64 {
    let mfi_component = (1.5 * (s.mfi - 50.0) / 50.0).tanh();
    let vwap_component = if s.vwap.abs() < f64::EPSILON {
        0.0
    } else {
        (100.0 * (s.current_price - s.vwap) / s.vwap).tanh()
    };
    (mfi_component + vwap_component) / 2.0
}

fn mean_reversion_score(s: &IndicatorSnapshot) -> f64 {
    let z_component = if s.z_score < -2.0 {
        0.8
    } else if s.z_score > 2.0 {
        -0.8
    } else {
        -(s.z_score / 2.0).tanh()
    };
    let bb_position = s.bb_position();
    let bb_component = if bb_position < -0.8 {
        0.6
    } else if bb_position > 0.8 {
        -0.6
    } else {
        0.0
    };
    (z_component + bb_component) / 2.0
}

/// 1 - 0.5 * clamp((gk_vol-0.2)/0.4, 0, 1), in [0.5, 1.0].
fn volatility_factor(gk_volatility: f64) -> f64 {
    1.0 - 0.5 * ((gk_volatility - 0.2) / 0.4).clamp(0.0, 1.0)
}

trait ClampAll {
    fn clamp_all(self) -> Self;
}

impl ClampAll for CategoryScores {
    fn clamp_all(self) -> Self {
        CategoryScores {
            momentum: self.momentum.clamp(-1.0, 1.0),
            trend: self.trend.clamp(-1.0, 1.0),
            volatility: self.volatility.clamp(-1.0, 1.0),
            volume: self.volume.clamp(-1.0, 1.0),
            mean_reversion: self.mean_reversion.clamp(-1.0, 1.0),
            probability: self.probability.clamp(-1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
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
        }
    }

    #[test]
    fn neutral_snapshot_waits() {
        let signal = score("BTCUSDT", &base_snapshot());
        assert_eq!(signal.action, SignalAction::Wait);
    }

    #[test]
    fn category_scores_always_bounded() {
        let mut s = base_snapshot();
        s.rsi = 0.0;
        s.cci = 500.0;
        s.mc_probability = 1.0;
        s.z_score = 10.0;
        let signal = score("BTCUSDT", &s);
        let c = signal.category_scores;
        for v in [
            c.momentum,
            c.trend,
            c.volatility,
            c.volume,
            c.mean_reversion,
            c.probability,
        ] {
            assert!((-1.0..=1.0).contains(&v), "score out of bounds: {v}");
        }
        assert!((-1.0..=1.0).contains(&signal.raw_score));
        assert!((0.0..=1.0).contains(&signal.confidence));
    }

    #[test]
    fn oversold_conditions_trigger_long() {
        let mut s = base_snapshot();
        s.rsi = 20.0;
        s.stoch_k = 15.0;
        s.cci = -150.0;
        s.ema_9 = 105.0;
        s.ema_20 = 102.0;
        s.ema_50 = 100.0;
        s.macd_histogram = 8.0;
        s.z_score = -2.5;
        let signal = score("BTCUSDT", &s);
        assert_eq!(signal.action, SignalAction::EnterLong);
        assert!(signal.stop_loss < signal.price);
        assert!(signal.take_profit > signal.price);
    }

    #[test]
    fn extreme_volatility_dampens_score_heavily() {
        let mut calm = base_snapshot();
        calm.rsi = 20.0;
        calm.stoch_k = 15.0;
        let calm_signal = score("BTCUSDT", &calm);

        let mut volatile = calm;
        volatile.gk_volatility = 0.95;
        let volatile_signal = score("BTCUSDT", &volatile);

        assert!(volatile_signal.adjusted_score.abs() < calm_signal.adjusted_score.abs());
    }
}
