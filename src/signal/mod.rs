//! Three-stage signal pipeline: a probabilistic scorer proposes a direction
//! (v1), a rule-based validator cross-checks it against raw indicator
//! thresholds (v2), and the arbiter fuses both into the tradeable signal.
pub mod arbiter;
pub mod v1;
pub mod v2;

use crate::types::{IndicatorSnapshot, Signal, ValidationRecord};

/// Runs all three stages and returns the final signal plus the validator's
/// record, which callers use for telemetry and reasoning.
pub fn generate(symbol: &str, snapshot: &IndicatorSnapshot) -> (Signal, ValidationRecord) {
    let candidate = v1::score(symbol, snapshot);
    let validation = v2::validate(&candidate);
    let final_signal = arbiter::arbitrate(candidate, &validation);
    (final_signal, validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 25.0,
            macd: 1.0,
            macd_signal: 0.2,
            macd_histogram: 8.0,
            stoch_k: 15.0,
            stoch_d: 18.0,
            ema_9: 105.0,
            ema_20: 102.0,
            ema_50: 100.0,
            ema_200: 95.0,
            sma_20: 101.0,
            bb_upper: 105.0,
            bb_middle: 100.0,
            bb_lower: 95.0,
            bb_width: 10.0,
            atr: 1.5,
            adx: 32.0,
            cci: -150.0,
            mfi: 30.0,
            obv: 0.0,
            vwap: 101.0,
            mc_probability: 0.72,
            mc_expected_price: 103.0,
            gk_volatility: 0.2,
            z_score: -2.2,
            lr_slope: 0.003,
            current_price: 100.0,
        }
    }

    #[test]
    fn end_to_end_pipeline_produces_tradeable_long() {
        let (signal, validation) = generate("BTCUSDT", &trending_snapshot());
        assert!(signal.action.is_entry() || signal.action == crate::types::SignalAction::Wait);
        if signal.action.is_entry() {
            assert!(validation.supporting_count > 0);
            assert!(!signal.reasoning.is_empty());
        }
    }
}
