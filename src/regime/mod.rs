//! Classifies the current market regime from a candle window and its
//! indicator snapshot, and derives a risk multiplier used by the sizer.
use crate::types::{Candle, EmaAlignment, IndicatorSnapshot, Regime, RegimeLabel};
use rust_decimal::prelude::ToPrimitive;

const STDEV_WINDOW: usize = 20;

pub fn detect(candles: &[Candle], snapshot: &IndicatorSnapshot) -> Regime {
    let (label, confidence) = classify(candles, snapshot);
    let risk_multiplier = risk_multiplier(label, confidence, snapshot.adx, snapshot.gk_volatility);

    Regime {
        label,
        confidence,
        risk_multiplier,
        volatility: snapshot.gk_volatility,
        adx: snapshot.adx,
    }
}

fn classify(candles: &[Candle], snapshot: &IndicatorSnapshot) -> (RegimeLabel, f64) {
    if snapshot.gk_volatility > 0.8 {
        return (RegimeLabel::Volatile, 0.9);
    }

    let bullish = matches!(snapshot.ema_alignment_4(), EmaAlignment::Bullish);
    let bearish = matches!(snapshot.ema_alignment_4(), EmaAlignment::Bearish);
    let above_ema50 = snapshot.current_price > snapshot.ema_50;
    let below_ema50 = snapshot.current_price < snapshot.ema_50;

    if snapshot.adx > 35.0 {
        let confidence = (snapshot.adx / 50.0).min(1.0);
        if bullish && above_ema50 {
            return (RegimeLabel::TrendUp, confidence);
        }
        if bearish && below_ema50 {
            return (RegimeLabel::TrendDown, confidence);
        }
    }

    if snapshot.adx > 25.0 {
        let confidence = (snapshot.adx / 40.0).min(1.0);
        if above_ema50 {
            return (RegimeLabel::TrendUp, confidence);
        }
        return (RegimeLabel::TrendDown, confidence);
    }

    if snapshot.adx < 20.0 {
        if let Some(ratio) = close_stdev_ratio(candles) {
            if ratio < 0.02 {
                return (RegimeLabel::Range, 1.0 - snapshot.adx / 20.0);
            }
        }
        return (RegimeLabel::Chop, 0.7);
    }

    (RegimeLabel::Chop, 0.5)
}

fn close_stdev_ratio(candles: &[Candle]) -> Option<f64> {
    if candles.len() < STDEV_WINDOW {
        return None;
    }
    let closes: Vec<f64> = candles[candles.len() - STDEV_WINDOW..]
        .iter()
        .map(|c| c.close.to_f64().unwrap_or(0.0))
        .collect();
    let mean = closes.iter().sum::<f64>() / closes.len() as f64;
    if mean.abs() < f64::EPSILON {
        return None;
    }
    let variance = closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / closes.len() as f64;
    Some(variance.sqrt() / mean)
}

fn risk_multiplier(label: RegimeLabel, confidence: f64, adx: f64, gk_volatility: f64) -> f64 {
    let _ = confidence;
    let mut mult = match label {
        RegimeLabel::TrendUp | RegimeLabel::TrendDown => 1.3,
        RegimeLabel::Range => 0.8,
        RegimeLabel::Chop => 0.4,
        RegimeLabel::Volatile => 0.3,
        RegimeLabel::Unknown => 0.7,
    };

    if label != RegimeLabel::Volatile && gk_volatility > 0.5 {
        mult *= 0.7;
    }
    if label.is_trend() && adx > 40.0 {
        mult *= 1.1;
    }

    mult.clamp(0.3, 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimeFrame, TradingPair};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn flat_candles(n: usize, price: Decimal) -> Vec<Candle> {
        (0..n)
            .map(|_| Candle {
                pair: TradingPair::BTCUSDT,
                timeframe: TimeFrame::M1,
                open_time: Utc::now(),
                close_time: Utc::now(),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: dec!(1),
                quote_volume: dec!(1),
                trades: 1,
                is_closed: true,
            })
            .collect()
    }

    fn snapshot(adx: f64, gk_volatility: f64, current_price: f64, ema_50: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            stoch_k: 50.0,
            stoch_d: 50.0,
            ema_9: current_price,
            ema_20: current_price,
            ema_50,
            ema_200: ema_50,
            sma_20: current_price,
            bb_upper: current_price * 1.02,
            bb_middle: current_price,
            bb_lower: current_price * 0.98,
            bb_width: current_price * 0.04,
            atr: 1.0,
            adx,
            cci: 0.0,
            mfi: 50.0,
            obv: 0.0,
            vwap: current_price,
            mc_probability: 0.5,
            mc_expected_price: current_price,
            gk_volatility,
            z_score: 0.0,
            lr_slope: 0.0,
            current_price,
        }
    }

    #[test]
    fn high_volatility_overrides_everything() {
        let candles = flat_candles(30, dec!(100));
        let snap = snapshot(40.0, 0.85, 105.0, 100.0);
        let regime = detect(&candles, &snap);
        assert_eq!(regime.label, RegimeLabel::Volatile);
        assert!(!regime.tradeable());
    }

    #[test]
    fn flat_closes_below_threshold_classify_as_range() {
        let candles = flat_candles(30, dec!(100));
        let snap = snapshot(10.0, 0.1, 100.0, 100.0);
        let regime = detect(&candles, &snap);
        assert_eq!(regime.label, RegimeLabel::Range);
    }

    #[test]
    fn risk_multiplier_stays_within_bounds() {
        let candles = flat_candles(30, dec!(100));
        for adx in [5.0, 18.0, 30.0, 45.0] {
            for gk in [0.1, 0.6] {
                let snap = snapshot(adx, gk, 105.0, 100.0);
                let regime = detect(&candles, &snap);
                assert!((0.3..=1.5).contains(&regime.risk_multiplier));
            }
        }
    }
}
