//! Five-state circuit breaker guarding trade execution: escalates on
//! latency/failure/slippage/loss telemetry, recovers one step at a time once
//! cooldown and health checks pass. Grounded in the trading engine's
//! graduated safety layer.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::types::SignalAction;

const TRAILING_WINDOW: usize = 10;
const HEALTH_CHECK_WINDOW: usize = 5;

pub const ALERT_LATENCY_MS: f64 = 500.0;
pub const THROTTLE_LATENCY_MS: f64 = 1000.0;
pub const HALT_LATENCY_MS: f64 = 3000.0;

pub const ALERT_CONSECUTIVE_FAILURES: u32 = 2;
pub const THROTTLE_CONSECUTIVE_FAILURES: u32 = 3;
pub const HALT_CONSECUTIVE_FAILURES: u32 = 5;
const SHUTDOWN_FAILURES: u32 = 10;

pub const ALERT_SLIPPAGE_PCT: f64 = 0.1;
pub const THROTTLE_SLIPPAGE_PCT: f64 = 0.3;
pub const HALT_SLIPPAGE_PCT: f64 = 0.5;

pub const HALT_UNEXPECTED_LOSS_PCT: f64 = 5.0;

const ALERT_COOLDOWN_SECS: i64 = 60;
const THROTTLE_COOLDOWN_SECS: i64 = 300;
const HALT_COOLDOWN_SECS: i64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Alert,
    Throttle,
    Halt,
    Shutdown,
}

impl CircuitState {
    fn cooldown_secs(self) -> Option<i64> {
        match self {
            CircuitState::Alert => Some(ALERT_COOLDOWN_SECS),
            CircuitState::Throttle => Some(THROTTLE_COOLDOWN_SECS),
            CircuitState::Halt => Some(HALT_COOLDOWN_SECS),
            _ => None,
        }
    }

    fn step_down(self) -> Option<CircuitState> {
        match self {
            CircuitState::Alert => Some(CircuitState::Closed),
            CircuitState::Throttle => Some(CircuitState::Alert),
            CircuitState::Halt => Some(CircuitState::Throttle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    Allow,
    AllowExitOnly,
    Deny,
}

impl ExecutionDecision {
    pub fn permits(&self, action: SignalAction) -> bool {
        match self {
            ExecutionDecision::Allow => true,
            ExecutionDecision::AllowExitOnly => {
                matches!(action, SignalAction::ExitLong | SignalAction::ExitShort)
            }
            ExecutionDecision::Deny => false,
        }
    }
}

struct Inner {
    state: CircuitState,
    last_state_change: DateTime<Utc>,
    latencies: VecDeque<f64>,
    slippages: VecDeque<f64>,
    consecutive_failures: u32,
    manual_override: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            last_state_change: Utc::now(),
            latencies: VecDeque::with_capacity(TRAILING_WINDOW),
            slippages: VecDeque::with_capacity(TRAILING_WINDOW),
            consecutive_failures: 0,
            manual_override: false,
        }
    }

    fn push_window(window: &mut VecDeque<f64>, value: f64) {
        window.push_back(value);
        while window.len() > TRAILING_WINDOW {
            window.pop_front();
        }
    }

    fn trailing_avg(window: &VecDeque<f64>, take: usize) -> Option<f64> {
        if window.is_empty() {
            return None;
        }
        let n = take.min(window.len());
        let sum: f64 = window.iter().rev().take(n).sum();
        Some(sum / n as f64)
    }

    /// Escalation only ever moves severity up: a report for a state at or
    /// below the current one is a no-op, regardless of which signal raised it.
    fn escalate(&mut self, target: CircuitState, reason: &str) -> bool {
        let moved_up = self.state < target;
        if moved_up {
            warn!(from = ?self.state, to = ?target, reason, "circuit breaker escalating");
            self.state = target;
            self.last_state_change = Utc::now();
        }
        moved_up
    }
}

pub struct CircuitBreaker {
    inner: RwLock<Inner>,
    state_tx: broadcast::Sender<CircuitState>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(32);
        Self { inner: RwLock::new(Inner::new()), state_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CircuitState> {
        self.state_tx.subscribe()
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    pub async fn execution_decision(&self) -> ExecutionDecision {
        let inner = self.inner.read().await;
        if inner.manual_override {
            return ExecutionDecision::Deny;
        }
        match inner.state {
            CircuitState::Shutdown | CircuitState::Halt => ExecutionDecision::AllowExitOnly,
            _ => ExecutionDecision::Allow,
        }
    }

    /// THROTTLE additionally requires a stricter confidence floor, enforced
    /// by the trading loop rather than the breaker itself.
    pub async fn is_throttled(&self) -> bool {
        self.inner.read().await.state == CircuitState::Throttle
    }

    pub async fn report_api_latency(&self, latency_ms: f64) {
        let mut inner = self.inner.write().await;
        Inner::push_window(&mut inner.latencies, latency_ms);
        let avg = Inner::trailing_avg(&inner.latencies, TRAILING_WINDOW).unwrap_or(0.0);

        if avg > HALT_LATENCY_MS {
            inner.escalate(CircuitState::Halt, "api latency");
        } else if avg > THROTTLE_LATENCY_MS {
            inner.escalate(CircuitState::Throttle, "api latency");
        } else if avg > ALERT_LATENCY_MS {
            inner.escalate(CircuitState::Alert, "api latency");
        }
        self.broadcast_state(&inner);
    }

    pub async fn report_order_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.consecutive_failures += 1;
        let failures = inner.consecutive_failures;

        if failures >= SHUTDOWN_FAILURES {
            inner.escalate(CircuitState::Shutdown, "consecutive order failures");
        } else if failures >= HALT_CONSECUTIVE_FAILURES {
            inner.escalate(CircuitState::Halt, "consecutive order failures");
        } else if failures >= THROTTLE_CONSECUTIVE_FAILURES {
            inner.escalate(CircuitState::Throttle, "consecutive order failures");
        } else if failures >= ALERT_CONSECUTIVE_FAILURES {
            inner.escalate(CircuitState::Alert, "consecutive order failures");
        }
        self.broadcast_state(&inner);
    }

    pub async fn report_order_success(&self) {
        let mut inner = self.inner.write().await;
        inner.consecutive_failures = 0;
        if matches!(inner.state, CircuitState::Alert | CircuitState::Throttle) {
            self.try_recover(&mut inner);
        }
        self.broadcast_state(&inner);
    }

    pub async fn report_slippage_pct(&self, slippage_pct: f64) {
        let mut inner = self.inner.write().await;
        Inner::push_window(&mut inner.slippages, slippage_pct);

        if slippage_pct > HALT_SLIPPAGE_PCT {
            inner.escalate(CircuitState::Halt, "slippage");
        } else if slippage_pct > THROTTLE_SLIPPAGE_PCT {
            inner.escalate(CircuitState::Throttle, "slippage");
        } else if slippage_pct > ALERT_SLIPPAGE_PCT {
            inner.escalate(CircuitState::Alert, "slippage");
        }
        self.broadcast_state(&inner);
    }

    pub async fn report_unexpected_loss_pct(&self, loss_pct: f64) {
        let mut inner = self.inner.write().await;
        if loss_pct > HALT_UNEXPECTED_LOSS_PCT {
            inner.escalate(CircuitState::Halt, "unexpected loss");
        }
        self.broadcast_state(&inner);
    }

    pub async fn report_critical_error(&self, tag: &str) {
        let mut inner = self.inner.write().await;
        inner.escalate(CircuitState::Shutdown, tag);
        self.broadcast_state(&inner);
    }

    fn try_recover(&self, inner: &mut Inner) {
        let Some(cooldown) = inner.state.cooldown_secs() else { return };
        let elapsed = (Utc::now() - inner.last_state_change).num_seconds();
        if elapsed < cooldown {
            return;
        }
        if !self.is_healthy(inner) {
            return;
        }
        if let Some(next) = inner.state.step_down() {
            info!(from = ?inner.state, to = ?next, "circuit breaker recovering");
            inner.state = next;
            inner.last_state_change = Utc::now();
        }
    }

    fn is_healthy(&self, inner: &Inner) -> bool {
        if inner.consecutive_failures > 0 {
            return false;
        }
        if let Some(avg) = Inner::trailing_avg(&inner.latencies, HEALTH_CHECK_WINDOW) {
            if avg > ALERT_LATENCY_MS {
                return false;
            }
        }
        if let Some(avg) = Inner::trailing_avg(&inner.slippages, HEALTH_CHECK_WINDOW) {
            if avg > ALERT_SLIPPAGE_PCT {
                return false;
            }
        }
        true
    }

    /// Attempts a step-down recovery if cooldown and health allow it; a
    /// caller (e.g. a periodic trading-loop tick) drives this independently
    /// of telemetry reports.
    pub async fn tick_recovery(&self) {
        let mut inner = self.inner.write().await;
        if matches!(inner.state, CircuitState::Alert | CircuitState::Throttle | CircuitState::Halt) {
            self.try_recover(&mut inner);
        }
        self.broadcast_state(&inner);
    }

    /// Manually forces a recovery to CLOSED, overriding cooldown/health
    /// gating. SHUTDOWN is terminal except through this explicit call.
    pub async fn force_recovery(&self, operator: &str) {
        let mut inner = self.inner.write().await;
        warn!(operator, "circuit breaker force-recovered to CLOSED by manual override");
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_state_change = Utc::now();
        self.broadcast_state(&inner);
    }

    pub async fn set_manual_override(&self, enabled: bool, operator: &str) {
        let mut inner = self.inner.write().await;
        warn!(operator, enabled, "circuit breaker manual override changed");
        inner.manual_override = enabled;
    }

    fn broadcast_state(&self, inner: &Inner) {
        let _ = self.state_tx.send(inner.state);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_failures_escalate_through_levels() {
        let breaker = CircuitBreaker::new();
        for _ in 0..2 {
            breaker.report_order_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Alert);

        for _ in 0..1 {
            breaker.report_order_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Throttle);
    }

    #[tokio::test]
    async fn shutdown_is_terminal_except_by_force_recovery() {
        let breaker = CircuitBreaker::new();
        breaker.report_critical_error("memory_error").await;
        assert_eq!(breaker.state().await, CircuitState::Shutdown);

        breaker.report_order_success().await;
        assert_eq!(breaker.state().await, CircuitState::Shutdown);

        breaker.force_recovery("operator@example").await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn halt_denies_entries_but_allows_exits() {
        let breaker = CircuitBreaker::new();
        for _ in 0..HALT_CONSECUTIVE_FAILURES {
            breaker.report_order_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Halt);
        let decision = breaker.execution_decision().await;
        assert!(!decision.permits(SignalAction::EnterLong));
        assert!(decision.permits(SignalAction::ExitLong));
    }

    #[tokio::test]
    async fn manual_override_blocks_everything() {
        let breaker = CircuitBreaker::new();
        breaker.set_manual_override(true, "operator@example").await;
        let decision = breaker.execution_decision().await;
        assert!(!decision.permits(SignalAction::ExitLong));
    }

    #[tokio::test]
    async fn alert_does_not_downgrade_from_throttle() {
        let breaker = CircuitBreaker::new();
        for _ in 0..THROTTLE_CONSECUTIVE_FAILURES {
            breaker.report_order_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Throttle);
        breaker.report_api_latency(ALERT_LATENCY_MS + 1.0).await;
        assert_eq!(breaker.state().await, CircuitState::Throttle);
    }
}
