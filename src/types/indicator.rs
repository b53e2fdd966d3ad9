use serde::{Deserialize, Serialize};

/// Fixed-schema derived indicator values for one symbol's bar series.
///
/// All fields are `f64`: the signal pipeline's math (tanh-normalized scores,
/// z-scores, Monte Carlo probabilities) is defined over reals, not fixed-point
/// currency amounts, and keeping it in `f64` all the way through keeps the
/// scoring formulas identical to the constants they were derived from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub ema_9: f64,
    pub ema_20: f64,
    pub ema_50: f64,
    pub ema_200: f64,
    pub sma_20: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub bb_width: f64,
    pub atr: f64,
    pub adx: f64,
    pub cci: f64,
    pub mfi: f64,
    pub obv: f64,
    pub vwap: f64,
    pub mc_probability: f64,
    pub mc_expected_price: f64,
    pub gk_volatility: f64,
    pub z_score: f64,
    pub lr_slope: f64,
    pub current_price: f64,
}

impl IndicatorSnapshot {
    /// (price − bb_middle) / (bb_upper − bb_middle), clamped to [-1, 1].
    /// Zero when the bands have collapsed to a point.
    pub fn bb_position(&self) -> f64 {
        let denom = self.bb_upper - self.bb_middle;
        if denom.abs() < f64::EPSILON {
            0.0
        } else {
            ((self.current_price - self.bb_middle) / denom).clamp(-1.0, 1.0)
        }
    }

    /// True if every 3-EMA pair (9>20>50) confirms a bullish stack.
    /// Used by the V1 scorer and V2 validator; the regime detector uses its
    /// own 4-EMA variant (`ema_alignment_4`) that additionally requires ema200.
    pub fn ema_alignment_3(&self) -> EmaAlignment {
        if self.ema_9 > self.ema_20 && self.ema_20 > self.ema_50 {
            EmaAlignment::Bullish
        } else if self.ema_9 < self.ema_20 && self.ema_20 < self.ema_50 {
            EmaAlignment::Bearish
        } else {
            EmaAlignment::Mixed
        }
    }

    pub fn ema_alignment_4(&self) -> EmaAlignment {
        if self.ema_9 > self.ema_20 && self.ema_20 > self.ema_50 && self.ema_50 > self.ema_200 {
            EmaAlignment::Bullish
        } else if self.ema_9 < self.ema_20 && self.ema_20 < self.ema_50 && self.ema_50 < self.ema_200
        {
            EmaAlignment::Bearish
        } else {
            EmaAlignment::Mixed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmaAlignment {
    Bullish,
    Bearish,
    Mixed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(overrides: impl FnOnce(&mut IndicatorSnapshot)) -> IndicatorSnapshot {
        let mut s = IndicatorSnapshot {
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
        };
        overrides(&mut s);
        s
    }

    #[test]
    fn bb_position_clamped_and_zero_on_flat_bands() {
        let s = snap(|s| {
            s.bb_upper = 100.0;
            s.bb_middle = 100.0;
        });
        assert_eq!(s.bb_position(), 0.0);

        let s = snap(|s| s.current_price = 200.0);
        assert_eq!(s.bb_position(), 1.0);
    }

    #[test]
    fn ema_alignment_requires_full_stack() {
        let bullish = snap(|s| {
            s.ema_9 = 103.0;
            s.ema_20 = 102.0;
            s.ema_50 = 101.0;
            s.ema_200 = 99.0;
        });
        assert_eq!(bullish.ema_alignment_3(), EmaAlignment::Bullish);
        assert_eq!(bullish.ema_alignment_4(), EmaAlignment::Bullish);

        let mixed_at_200 = snap(|s| {
            s.ema_9 = 103.0;
            s.ema_20 = 102.0;
            s.ema_50 = 101.0;
            s.ema_200 = 105.0;
        });
        assert_eq!(mixed_at_200.ema_alignment_3(), EmaAlignment::Bullish);
        assert_eq!(mixed_at_200.ema_alignment_4(), EmaAlignment::Mixed);
    }
}
