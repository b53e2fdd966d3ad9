//! Dynamic exit manager: evaluates a live position against the ordered set
//! of close conditions, first match wins. Also exposes the breakeven and
//! partial-exit advisories the trading loop can act on without closing.
use rust_decimal::prelude::ToPrimitive;

use crate::risk::portfolio::HedgeAdvisory;
use crate::types::{IndicatorSnapshot, Position, Regime, RegimeLabel, Side};

const TRAILING_STOP_ACTIVATION_PCT: f64 = 1.5;
const BREAKEVEN_ACTIVATION_PCT: f64 = 1.0;
const TIME_LIMIT_PNL_CEILING_PCT: f64 = 3.0;
const REGIME_CHANGE_PNL_CEILING_PCT: f64 = 5.0;
const RANGE_TO_TREND_PNL_CEILING_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    HardStop,
    HardTakeProfit,
    TrailingStop,
    TimeLimit,
    RegimeChange,
    PortfolioRebalance,
    ThesisInvalidation,
}

#[derive(Debug, Clone, Copy)]
pub struct ExitDecision {
    pub reason: Option<ExitReason>,
    pub breakeven_advisory: bool,
}

impl ExitDecision {
    fn close(reason: ExitReason) -> Self {
        Self { reason: Some(reason), breakeven_advisory: false }
    }

    fn hold(breakeven_advisory: bool) -> Self {
        Self { reason: None, breakeven_advisory }
    }

    pub fn should_close(&self) -> bool {
        self.reason.is_some()
    }
}

fn trailing_stop_distance_pct(label: RegimeLabel) -> f64 {
    match label {
        RegimeLabel::TrendUp | RegimeLabel::TrendDown => 2.0,
        RegimeLabel::Range => 1.5,
        RegimeLabel::Chop => 1.0,
        RegimeLabel::Volatile => 2.5,
        RegimeLabel::Unknown => 1.5,
    }
}

fn time_limit_minutes(label: RegimeLabel) -> i64 {
    match label {
        RegimeLabel::TrendUp | RegimeLabel::TrendDown => 240,
        RegimeLabel::Range => 120,
        RegimeLabel::Chop => 60,
        RegimeLabel::Volatile => 30,
        RegimeLabel::Unknown => 180,
    }
}

pub fn evaluate_exit(
    position: &Position,
    regime: &Regime,
    snapshot: &IndicatorSnapshot,
    hedge_advisory: HedgeAdvisory,
) -> ExitDecision {
    if position.should_stop_loss() {
        return ExitDecision::close(ExitReason::HardStop);
    }
    if position.should_take_profit() {
        return ExitDecision::close(ExitReason::HardTakeProfit);
    }

    let pnl_pct = position.pnl_percentage().to_f64().unwrap_or(0.0);

    if pnl_pct > TRAILING_STOP_ACTIVATION_PCT {
        let trail_pct = trailing_stop_distance_pct(regime.label);
        let extreme = match position.side {
            Side::Buy => position.highest_price,
            Side::Sell => position.lowest_price,
        }
        .to_f64()
        .unwrap_or(0.0);
        let current = position.current_price.to_f64().unwrap_or(0.0);
        if extreme > 0.0 {
            let retracement_pct = match position.side {
                Side::Buy => (extreme - current) / extreme * 100.0,
                Side::Sell => (current - extreme) / extreme * 100.0,
            };
            if retracement_pct > trail_pct {
                return ExitDecision::close(ExitReason::TrailingStop);
            }
        }
    }

    let breakeven_advisory = pnl_pct > BREAKEVEN_ACTIVATION_PCT && !position.breakeven_applied;

    if pnl_pct < TIME_LIMIT_PNL_CEILING_PCT {
        let holding_minutes = position.duration().num_minutes();
        if holding_minutes > time_limit_minutes(regime.label) {
            return ExitDecision::close(ExitReason::TimeLimit);
        }
    }

    if let Some(entry_regime) = position.entry_regime {
        if entry_regime != RegimeLabel::Unknown
            && entry_regime != regime.label
            && pnl_pct <= REGIME_CHANGE_PNL_CEILING_PCT
        {
            let exits = match entry_regime {
                RegimeLabel::TrendUp | RegimeLabel::TrendDown => {
                    matches!(regime.label, RegimeLabel::Chop | RegimeLabel::Volatile)
                }
                RegimeLabel::Range => {
                    regime.label.is_trend() && pnl_pct <= RANGE_TO_TREND_PNL_CEILING_PCT
                }
                _ => false,
            };
            if exits {
                return ExitDecision::close(ExitReason::RegimeChange);
            }
        }
    }

    if let HedgeAdvisory::Hedge { overexposed_side } = hedge_advisory {
        if overexposed_side == position.side {
            return ExitDecision::close(ExitReason::PortfolioRebalance);
        }
    }

    let reason_lower = position.entry_reason.to_lowercase();
    if reason_lower.contains("rsi_oversold_long") && snapshot.rsi > 70.0 {
        return ExitDecision::close(ExitReason::ThesisInvalidation);
    }
    if reason_lower.contains("rsi_overbought_short") && snapshot.rsi < 30.0 {
        return ExitDecision::close(ExitReason::ThesisInvalidation);
    }
    if reason_lower.contains("macd_bullish") && snapshot.macd_histogram < -10.0 {
        return ExitDecision::close(ExitReason::ThesisInvalidation);
    }
    if reason_lower.contains("macd_bearish") && snapshot.macd_histogram > 10.0 {
        return ExitDecision::close(ExitReason::ThesisInvalidation);
    }

    ExitDecision::hold(breakeven_advisory)
}

/// Informational scaling-out hint, not wired into the mandatory close path.
pub fn calculate_partial_exit_size(pnl_pct: f64) -> f64 {
    if pnl_pct > 4.0 {
        0.5
    } else if pnl_pct > 2.0 {
        0.25
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionStatus, TradingPair};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn base_position() -> Position {
        Position {
            id: "1".to_string(),
            pair: TradingPair::BTCUSDT,
            side: Side::Buy,
            status: PositionStatus::Open,
            entry_price: dec!(100),
            current_price: dec!(101),
            quantity: dec!(1),
            stop_loss: Some(dec!(98)),
            take_profit: Some(dec!(110)),
            unrealized_pnl: dec!(1),
            realized_pnl: dec!(0),
            peak_pnl_pct: dec!(1),
            opened_at: Utc::now(),
            closed_at: None,
            strategy_id: "core".to_string(),
            order_ids: Vec::new(),
            oco_order_id: None,
            entry_regime: Some(RegimeLabel::TrendUp),
            highest_price: dec!(101),
            lowest_price: dec!(100),
            entry_reason: "rsi_oversold_long".to_string(),
            ai_confidence: dec!(0.6),
            breakeven_applied: false,
        }
    }

    fn regime(label: RegimeLabel) -> Regime {
        Regime { label, confidence: 0.8, risk_multiplier: 1.0, volatility: 0.2, adx: 30.0 }
    }

    fn neutral_snapshot() -> IndicatorSnapshot {
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
            adx: 30.0,
            cci: 0.0,
            mfi: 50.0,
            obv: 0.0,
            vwap: 100.0,
            mc_probability: 0.5,
            mc_expected_price: 100.0,
            gk_volatility: 0.2,
            z_score: 0.0,
            lr_slope: 0.0,
            current_price: 101.0,
        }
    }

    #[test]
    fn hard_stop_wins_over_everything() {
        let mut position = base_position();
        position.current_price = dec!(97);
        let decision = evaluate_exit(&position, &regime(RegimeLabel::TrendUp), &neutral_snapshot(), HedgeAdvisory::None);
        assert_eq!(decision.reason, Some(ExitReason::HardStop));
    }

    #[test]
    fn thesis_invalidation_fires_on_rsi_reversal() {
        let position = base_position();
        let mut snapshot = neutral_snapshot();
        snapshot.rsi = 75.0;
        let decision = evaluate_exit(&position, &regime(RegimeLabel::TrendUp), &snapshot, HedgeAdvisory::None);
        assert_eq!(decision.reason, Some(ExitReason::ThesisInvalidation));
    }

    #[test]
    fn breakeven_advisory_without_closing() {
        let mut position = base_position();
        position.current_price = dec!(102);
        position.unrealized_pnl = dec!(2);
        let decision = evaluate_exit(&position, &regime(RegimeLabel::TrendUp), &neutral_snapshot(), HedgeAdvisory::None);
        assert!(!decision.should_close());
        assert!(decision.breakeven_advisory);
    }

    #[test]
    fn partial_exit_scales_with_pnl() {
        assert_eq!(calculate_partial_exit_size(5.0), 0.5);
        assert_eq!(calculate_partial_exit_size(3.0), 0.25);
        assert_eq!(calculate_partial_exit_size(1.0), 0.0);
    }
}
