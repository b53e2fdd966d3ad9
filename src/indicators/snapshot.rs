#![allow(dead_code)]
//! One-shot batch computation of the fixed-schema [`IndicatorSnapshot`] from a
//! window of candles. Unlike the streaming `Indicator` implementations
//! elsewhere in this module (designed for candle-by-candle incremental
//! updates), the signal pipeline wants a single consistent snapshot computed
//! fresh from each cycle's fetched bar window, so these are plain functions
//! over a `&[Candle]` slice rather than stateful structs.
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;

use crate::types::{Candle, IndicatorSnapshot};

/// Bars required before a snapshot is considered well-formed (covers the
/// longest lookback, `ema_200`).
pub const MIN_BARS: usize = 200;

pub fn build_snapshot(candles: &[Candle]) -> Option<IndicatorSnapshot> {
    if candles.len() < MIN_BARS {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| dec_to_f64(c.close)).collect();
    let highs: Vec<f64> = candles.iter().map(|c| dec_to_f64(c.high)).collect();
    let lows: Vec<f64> = candles.iter().map(|c| dec_to_f64(c.low)).collect();
    let opens: Vec<f64> = candles.iter().map(|c| dec_to_f64(c.open)).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| dec_to_f64(c.volume)).collect();

    let current_price = *closes.last()?;
    let rsi = rsi(&closes, 14)?;
    let (macd, macd_signal, macd_histogram) = macd(&closes, 12, 26, 9)?;
    let (stoch_k, stoch_d) = stochastic(&highs, &lows, &closes, 14, 3)?;
    let ema_9 = ema(&closes, 9)?;
    let ema_20 = ema(&closes, 20)?;
    let ema_50 = ema(&closes, 50)?;
    let ema_200 = ema(&closes, 200)?;
    let sma_20 = sma(&closes, 20)?;
    let (bb_upper, bb_middle, bb_lower) = bollinger(&closes, 20, 2.0)?;
    let bb_width = if bb_middle.abs() > f64::EPSILON {
        (bb_upper - bb_lower) / bb_middle * 100.0
    } else {
        0.0
    };
    let atr = atr(&highs, &lows, &closes, 14)?;
    let adx = adx(&highs, &lows, &closes, 14).unwrap_or(0.0);
    let cci = cci(&highs, &lows, &closes, 20)?;
    let mfi = mfi(&highs, &lows, &closes, &volumes, 14)?;
    let obv = obv(&closes, &volumes);
    let vwap = vwap(&highs, &lows, &closes, &volumes)?;
    let gk_volatility = garman_klass_volatility(&opens, &highs, &lows, &closes, 14)?;
    let z_score = z_score(&closes, 20)?;
    let lr_slope = lr_slope(&closes, 20)?;
    let (mc_probability, mc_expected_price) =
        monte_carlo(&closes, current_price, gk_volatility, 1_000, 10);

    Some(IndicatorSnapshot {
        rsi,
        macd,
        macd_signal,
        macd_histogram,
        stoch_k,
        stoch_d,
        ema_9,
        ema_20,
        ema_50,
        ema_200,
        sma_20,
        bb_upper,
        bb_middle,
        bb_lower,
        bb_width,
        atr,
        adx,
        cci,
        mfi,
        obv,
        vwap,
        mc_probability,
        mc_expected_price,
        gk_volatility,
        z_score,
        lr_slope,
        current_price,
    })
}

fn dec_to_f64(d: rust_decimal::Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period {
        return None;
    }
    let slice = &values[values.len() - period..];
    Some(slice.iter().sum::<f64>() / period as f64)
}

fn stdev(values: &[f64], period: usize) -> Option<f64> {
    let mean = sma(values, period)?;
    let slice = &values[values.len() - period..];
    let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

/// Full-series EMA, seeded with an SMA over the first `period` values, as the
/// teacher's streaming `EMA` does.
fn ema(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period {
        return None;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut value = values[..period].iter().sum::<f64>() / period as f64;
    for &price in &values[period..] {
        value = (price - value) * multiplier + value;
    }
    Some(value)
}

fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses += -change;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss.abs() < f64::EPSILON {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
    if closes.len() < slow + signal {
        return None;
    }
    let mut macd_series = Vec::with_capacity(closes.len() - slow + 1);
    for end in slow..=closes.len() {
        let window = &closes[..end];
        let f = ema(window, fast)?;
        let s = ema(window, slow)?;
        macd_series.push(f - s);
    }
    let macd_line = *macd_series.last()?;
    let signal_line = ema(&macd_series, signal)?;
    Some((macd_line, signal_line, macd_line - signal_line))
}

fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
    smooth: usize,
) -> Option<(f64, f64)> {
    if closes.len() < period + smooth {
        return None;
    }
    let mut k_values = Vec::with_capacity(smooth);
    for i in (closes.len() - smooth)..closes.len() {
        let window_highs = &highs[i + 1 - period..=i];
        let window_lows = &lows[i + 1 - period..=i];
        let highest = window_highs.iter().cloned().fold(f64::MIN, f64::max);
        let lowest = window_lows.iter().cloned().fold(f64::MAX, f64::min);
        let range = highest - lowest;
        let k = if range.abs() < f64::EPSILON {
            50.0
        } else {
            (closes[i] - lowest) / range * 100.0
        };
        k_values.push(k);
    }
    let stoch_k = *k_values.last()?;
    let stoch_d = k_values.iter().sum::<f64>() / k_values.len() as f64;
    Some((stoch_k, stoch_d))
}

fn bollinger(closes: &[f64], period: usize, mult: f64) -> Option<(f64, f64, f64)> {
    let middle = sma(closes, period)?;
    let sd = stdev(closes, period)?;
    Some((middle + mult * sd, middle, middle - mult * sd))
}

fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    let hl = high - low;
    match prev_close {
        Some(pc) => hl.max((high - pc).abs()).max((low - pc).abs()),
        None => hl,
    }
}

fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let trs: Vec<f64> = (0..closes.len())
        .map(|i| {
            let prev = if i == 0 { None } else { Some(closes[i - 1]) };
            true_range(highs[i], lows[i], prev)
        })
        .collect();
    let mut value = trs[1..=period].iter().sum::<f64>() / period as f64;
    for &tr in &trs[period + 1..] {
        value = (value * (period as f64 - 1.0) + tr) / period as f64;
    }
    Some(value)
}

/// Wilder's-smoothing ADX, following the same DX/DM pipeline as
/// `orc2626-tech-sBot9999`'s `indicators::adx::calculate_adx`: directional
/// movement -> Wilder-smoothed +DM/-DM/TR -> DX -> Wilder-smoothed ADX.
fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    let n = closes.len();
    if n < 2 * period + 1 {
        return None;
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    let mut tr = vec![0.0; n];

    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        plus_dm[i] = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        minus_dm[i] = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
        tr[i] = true_range(highs[i], lows[i], Some(closes[i - 1]));
    }

    let mut smooth_plus = plus_dm[1..=period].iter().sum::<f64>();
    let mut smooth_minus = minus_dm[1..=period].iter().sum::<f64>();
    let mut smooth_tr = tr[1..=period].iter().sum::<f64>();

    let mut dx_values = Vec::with_capacity(n - period);
    if let Some(dx) = compute_dx(smooth_plus, smooth_minus, smooth_tr) {
        dx_values.push(dx);
    }

    for i in (period + 1)..n {
        smooth_plus = smooth_plus - smooth_plus / period as f64 + plus_dm[i];
        smooth_minus = smooth_minus - smooth_minus / period as f64 + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period as f64 + tr[i];
        if let Some(dx) = compute_dx(smooth_plus, smooth_minus, smooth_tr) {
            dx_values.push(dx);
        }
    }

    if dx_values.len() < period {
        return dx_values.last().copied();
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period as f64;
    for &dx in &dx_values[period..] {
        adx = (adx * (period as f64 - 1.0) + dx) / period as f64;
    }
    Some(adx)
}

fn compute_dx(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<f64> {
    if smooth_tr.abs() < f64::EPSILON {
        return None;
    }
    let plus_di = 100.0 * smooth_plus_dm / smooth_tr;
    let minus_di = 100.0 * smooth_minus_dm / smooth_tr;
    let sum = plus_di + minus_di;
    if sum.abs() < f64::EPSILON {
        return Some(0.0);
    }
    Some(100.0 * (plus_di - minus_di).abs() / sum)
}

fn cci(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    let n = closes.len();
    let typical: Vec<f64> = (0..n)
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
        .collect();
    let window = &typical[n - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let mean_dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
    if mean_dev.abs() < f64::EPSILON {
        return Some(0.0);
    }
    Some((typical[n - 1] - mean) / (0.015 * mean_dev))
}

fn mfi(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64], period: usize) -> Option<f64> {
    let n = closes.len();
    if n < period + 1 {
        return None;
    }
    let typical: Vec<f64> = (0..n)
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
        .collect();
    let mut positive = 0.0;
    let mut negative = 0.0;
    for i in (n - period)..n {
        let raw_flow = typical[i] * volumes[i];
        if typical[i] > typical[i - 1] {
            positive += raw_flow;
        } else if typical[i] < typical[i - 1] {
            negative += raw_flow;
        }
    }
    if negative.abs() < f64::EPSILON {
        return Some(100.0);
    }
    let ratio = positive / negative;
    Some(100.0 - 100.0 / (1.0 + ratio))
}

fn obv(closes: &[f64], volumes: &[f64]) -> f64 {
    let mut value = 0.0;
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            value += volumes[i];
        } else if closes[i] < closes[i - 1] {
            value -= volumes[i];
        }
    }
    value
}

fn vwap(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64]) -> Option<f64> {
    let n = closes.len();
    if n == 0 {
        return None;
    }
    let mut cum_tp_vol = 0.0;
    let mut cum_vol = 0.0;
    for i in 0..n {
        let tp = (highs[i] + lows[i] + closes[i]) / 3.0;
        cum_tp_vol += tp * volumes[i];
        cum_vol += volumes[i];
    }
    if cum_vol.abs() < f64::EPSILON {
        return Some(closes[n - 1]);
    }
    Some(cum_tp_vol / cum_vol)
}

/// Garman-Klass OHLC volatility estimator over the ATR lookback window.
/// Annualization is intentionally omitted: every consumer in the signal
/// pipeline and regime detector treats this as a relative/threshold
/// quantity, never as a displayed annualized percentage.
fn garman_klass_volatility(
    opens: &[f64],
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Option<f64> {
    let n = closes.len();
    if n < period {
        return None;
    }
    let mut sum = 0.0;
    for i in (n - period)..n {
        let hl = (highs[i] / lows[i]).ln();
        let co = (closes[i] / opens[i]).ln();
        sum += 0.5 * hl.powi(2) - (2.0 * std::f64::consts::LN_2 - 1.0) * co.powi(2);
    }
    Some((sum / period as f64).max(0.0).sqrt())
}

fn z_score(closes: &[f64], period: usize) -> Option<f64> {
    let mean = sma(closes, period)?;
    let sd = stdev(closes, period)?;
    if sd.abs() < f64::EPSILON {
        return Some(0.0);
    }
    Some((closes[closes.len() - 1] - mean) / sd)
}

/// Slope of an OLS fit over the last `period` closes, normalized by the
/// window's mean price so it is comparable across symbols at different
/// price levels.
fn lr_slope(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let n = period as f64;
    let xs: Vec<f64> = (0..period).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = window.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..period {
        num += (xs[i] - x_mean) * (window[i] - y_mean);
        den += (xs[i] - x_mean).powi(2);
    }
    if den.abs() < f64::EPSILON || y_mean.abs() < f64::EPSILON {
        return Some(0.0);
    }
    let slope = num / den;
    Some(slope / y_mean)
}

/// Forward price-path simulation: a geometric random walk seeded from the
/// drift and volatility realized over the snapshot's lookback window.
/// `mc_probability` is the fraction of simulated terminal prices above the
/// current price; `mc_expected_price` is their mean.
fn monte_carlo(
    closes: &[f64],
    current_price: f64,
    realized_vol: f64,
    paths: usize,
    horizon_bars: usize,
) -> (f64, f64) {
    let lookback = 30.min(closes.len().saturating_sub(1));
    let drift = if lookback > 0 {
        let start = closes.len() - 1 - lookback;
        ((closes[closes.len() - 1] / closes[start]).ln()) / lookback as f64
    } else {
        0.0
    };
    let per_step_vol = (realized_vol.max(1e-6)) / (horizon_bars as f64).sqrt();

    let mut rng = rand::rng();
    let mut above = 0usize;
    let mut sum_terminal = 0.0;
    for _ in 0..paths {
        let mut price = current_price;
        for _ in 0..horizon_bars {
            let shock: f64 = rng.random_range(-1.0..1.0) * per_step_vol;
            price *= (drift + shock).exp();
        }
        if price > current_price {
            above += 1;
        }
        sum_terminal += price;
    }

    let probability = above as f64 / paths as f64;
    let expected_price = sum_terminal / paths as f64;
    (probability, expected_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use crate::types::{TimeFrame, TradingPair};

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .map(|&c| Candle {
                pair: TradingPair::BTCUSDT,
                timeframe: TimeFrame::M5,
                open_time: Utc::now(),
                close_time: Utc::now(),
                open: Decimal::try_from(c * 0.999).unwrap(),
                high: Decimal::try_from(c * 1.002).unwrap(),
                low: Decimal::try_from(c * 0.998).unwrap(),
                close: Decimal::try_from(c).unwrap(),
                volume: Decimal::try_from(1000.0).unwrap(),
                quote_volume: Decimal::try_from(1000.0 * c).unwrap(),
                trades: 10,
                is_closed: true,
            })
            .collect()
    }

    #[test]
    fn insufficient_bars_returns_none() {
        let candles = make_candles(&vec![100.0; 50]);
        assert!(build_snapshot(&candles).is_none());
    }

    #[test]
    fn strong_uptrend_yields_high_adx_and_bullish_alignment() {
        let mut closes = Vec::with_capacity(220);
        let mut price = 100.0;
        for _ in 0..220 {
            price *= 1.01;
            closes.push(price);
        }
        let candles = make_candles(&closes);
        let snapshot = build_snapshot(&candles).expect("snapshot");
        assert!(snapshot.adx > 20.0, "adx={}", snapshot.adx);
        assert_eq!(
            snapshot.ema_alignment_3(),
            crate::types::EmaAlignment::Bullish
        );
        assert!(snapshot.rsi > 50.0);
    }

    #[test]
    fn flat_market_yields_low_adx() {
        let candles = make_candles(&vec![100.0; 220]);
        let snapshot = build_snapshot(&candles).expect("snapshot");
        assert!(snapshot.adx < 10.0, "adx={}", snapshot.adx);
        assert_eq!(snapshot.rsi, 100.0);
    }

    #[test]
    fn monte_carlo_probability_in_unit_interval() {
        let mut closes = Vec::with_capacity(220);
        let mut price = 100.0;
        for i in 0..220 {
            price *= 1.0 + if i % 2 == 0 { 0.002 } else { -0.001 };
            closes.push(price);
        }
        let candles = make_candles(&closes);
        let snapshot = build_snapshot(&candles).expect("snapshot");
        assert!(snapshot.mc_probability >= 0.0 && snapshot.mc_probability <= 1.0);
        assert!(snapshot.mc_expected_price > 0.0);
    }
}
