//! The external advisory veto: a second opinion consulted after the signal
//! pipeline and before sizing. Only ever narrows a trade down (reject or
//! low-confidence approve), never widens one.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{IndicatorSnapshot, Signal};

pub const MIN_ADVISOR_CONFIDENCE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvisorDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub decision: AdvisorDecision,
    pub confidence: f64,
    pub reasoning: String,
}

impl Advice {
    /// A reject, or an approve below the confidence floor, vetoes the trade.
    pub fn passes(&self) -> bool {
        self.decision == AdvisorDecision::Approve && self.confidence >= MIN_ADVISOR_CONFIDENCE
    }

    fn rejected(reasoning: impl Into<String>) -> Self {
        Self { decision: AdvisorDecision::Reject, confidence: 0.0, reasoning: reasoning.into() }
    }
}

#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, signal: &Signal, snapshot: &IndicatorSnapshot) -> anyhow::Result<Advice>;
}

/// Calls a fallible `Advisor` and converts failure or timeout into a
/// reject-with-zero-confidence advice, per the veto contract: advisor
/// unavailability skips the trade but never touches the circuit breaker.
pub async fn consult(
    advisor: &dyn Advisor,
    signal: &Signal,
    snapshot: &IndicatorSnapshot,
    timeout: std::time::Duration,
) -> Advice {
    match tokio::time::timeout(timeout, advisor.advise(signal, snapshot)).await {
        Ok(Ok(advice)) => advice,
        Ok(Err(err)) => Advice::rejected(format!("advisor error: {err}")),
        Err(_) => Advice::rejected("advisor timed out"),
    }
}

/// Always approves at full confidence. Lets the trading loop run end to end
/// without a live LLM backend wired in.
pub struct NoOpAdvisor;

#[async_trait]
impl Advisor for NoOpAdvisor {
    async fn advise(&self, _signal: &Signal, _snapshot: &IndicatorSnapshot) -> anyhow::Result<Advice> {
        Ok(Advice {
            decision: AdvisorDecision::Approve,
            confidence: 1.0,
            reasoning: "no-op advisor: default approve".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn noop_advisor_always_passes() {
        let advisor = NoOpAdvisor;
        let snapshot = neutral_snapshot();
        let signal = Signal::waiting("BTCUSDT", snapshot);
        let advice = consult(&advisor, &signal, &snapshot, std::time::Duration::from_secs(1)).await;
        assert!(advice.passes());
    }

    #[test]
    fn reject_below_floor_does_not_pass() {
        let advice = Advice { decision: AdvisorDecision::Approve, confidence: 0.2, reasoning: String::new() };
        assert!(!advice.passes());
    }

    #[test]
    fn reject_decision_never_passes_even_at_full_confidence() {
        let advice = Advice { decision: AdvisorDecision::Reject, confidence: 1.0, reasoning: String::new() };
        assert!(!advice.passes());
    }
}
