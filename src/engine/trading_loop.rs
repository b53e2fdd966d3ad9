//! The live cycle: fetch bars, score/validate/arbitrate a signal per symbol,
//! gate the best candidate through the breaker/advisor/sizer/portfolio/safety
//! chain, submit orders, then sweep open positions through the exit manager.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::advisor::{consult, Advisor};
use crate::circuit::{CircuitBreaker, CircuitState};
use crate::config::RuntimeConfigManager;
use crate::engine::controller::BotController;
use crate::errors::CoreError;
use crate::expectancy::{compute_stats, detect_degradation};
use crate::notifications::{AlertType, NotificationManager};
use crate::regime;
use crate::risk::exit_manager::{evaluate_exit, ExitReason};
use crate::risk::portfolio::{
    admit_candidate, exposure_breakdown, open_exposures, should_hedge_portfolio,
};
use crate::risk::sizer::{
    size_position, stop_and_target_distance, validate_risk, RiskPreflightInput, SizingInput,
};
use crate::signal;
use crate::store::ClosedTradeStore;
use crate::types::{ClosedTrade, Position, PositionStatus, Side, SignalAction, TradingPair};
use crate::venue::VenueAdapter;

const ADVISOR_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONCURRENT_FETCHES: usize = 8;

pub struct TradingLoop {
    venue: Arc<dyn VenueAdapter>,
    advisor: Arc<dyn Advisor>,
    store: Arc<dyn ClosedTradeStore>,
    breaker: Arc<CircuitBreaker>,
    config: Arc<RuntimeConfigManager>,
    notifications: Arc<NotificationManager>,
    controller: Arc<BotController>,
    positions: RwLock<Vec<Position>>,
    cycle_count: RwLock<u64>,
}

struct Candidate {
    pair: TradingPair,
    signal: crate::types::Signal,
    regime: crate::types::Regime,
}

impl TradingLoop {
    pub fn new(
        venue: Arc<dyn VenueAdapter>,
        advisor: Arc<dyn Advisor>,
        store: Arc<dyn ClosedTradeStore>,
        breaker: Arc<CircuitBreaker>,
        config: Arc<RuntimeConfigManager>,
        notifications: Arc<NotificationManager>,
        controller: Arc<BotController>,
    ) -> Self {
        Self {
            venue,
            advisor,
            store,
            breaker,
            config,
            notifications,
            controller,
            positions: RwLock::new(Vec::new()),
            cycle_count: RwLock::new(0),
        }
    }

    /// Drives cycles until the controller is stopped, then closes every
    /// open position best-effort before returning.
    pub async fn run(&self) {
        loop {
            if !self.controller.is_running() {
                break;
            }
            if let Err(err) = self.run_cycle().await {
                warn!("cycle failed: {err}");
            }

            let cycle_period = self.config.get_config().await.loop_settings.cycle_period_seconds;
            tokio::time::sleep(Duration::from_secs(cycle_period)).await;
        }

        info!("shutdown signal received, closing open positions");
        self.close_all_positions_best_effort().await;
    }

    /// Runs exactly one scan-and-report cycle without sleeping; used by the
    /// CLI dry-run subcommand and by `run`'s loop body.
    pub async fn run_cycle(&self) -> anyhow::Result<()> {
        if self.breaker.state().await == CircuitState::Shutdown {
            return Err(CoreError::Shutdown.into());
        }

        let config = self.config.get_config().await;
        let mut cycle_count = self.cycle_count.write().await;
        *cycle_count += 1;
        let this_cycle = *cycle_count;
        drop(cycle_count);

        if this_cycle % config.loop_settings.strategy_monitor_interval_cycles as u64 == 0 {
            self.check_expectancy_degradation().await;
        }

        let best = self.scan_for_best_candidate(&config.universe_pairs()).await;

        if let Some(candidate) = best {
            if candidate.signal.confidence >= config.risk.min_confidence {
                self.try_open_position(candidate, &config).await;
            }
        }

        self.sweep_open_positions().await;

        Ok(())
    }

    async fn scan_for_best_candidate(&self, universe: &[TradingPair]) -> Option<Candidate> {
        let timeframe = self.config.get_config().await.timeframe();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let mut handles = Vec::new();

        for pair in universe.iter().copied() {
            let venue = Arc::clone(&self.venue);
            let semaphore = Arc::clone(&semaphore);
            let breaker = Arc::clone(&self.breaker);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok()?;
                let started = std::time::Instant::now();
                let candles = venue.fetch_ohlcv(pair, timeframe, 200).await.ok()?;
                breaker.report_api_latency(started.elapsed().as_millis() as f64).await;
                let snapshot = crate::indicators::build_snapshot(&candles)?;
                let (sig, _validation) = signal::generate(pair.as_str(), &snapshot);
                if sig.action == SignalAction::Wait {
                    return None;
                }
                let regime = regime::detect(&candles, &snapshot);
                if !regime.tradeable() {
                    return None;
                }
                Some(Candidate { pair, signal: sig, regime })
            }));
        }

        let mut best: Option<Candidate> = None;
        for handle in handles {
            if let Ok(Some(candidate)) = handle.await {
                let replace = best.as_ref().map_or(true, |b| candidate.signal.confidence > b.signal.confidence);
                if replace {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    async fn try_open_position(&self, candidate: Candidate, config: &crate::config::RuntimeConfig) {
        let decision = self.breaker.execution_decision().await;
        if !decision.permits(candidate.signal.action) {
            self.reject(candidate.pair, "circuit_breaker", "execution denied by breaker").await;
            return;
        }
        if self.breaker.is_throttled().await && candidate.signal.confidence < config.risk.min_confidence + 0.15
        {
            self.reject(candidate.pair, "circuit_breaker", "throttled: confidence below raised floor").await;
            return;
        }

        let advice = consult(
            self.advisor.as_ref(),
            &candidate.signal,
            &candidate.signal.indicator_snapshot,
            ADVISOR_TIMEOUT,
        )
        .await;
        if !advice.passes() {
            self.reject(candidate.pair, "advisor", &advice.reasoning).await;
            return;
        }

        let balance = match self.venue.fetch_balance().await {
            Ok(b) => b.free.to_f64().unwrap_or(0.0),
            Err(err) => {
                self.reject(candidate.pair, "venue", &format!("balance fetch failed: {err}")).await;
                return;
            }
        };

        let side = if candidate.signal.action == SignalAction::EnterLong { Side::Buy } else { Side::Sell };
        let (sl_distance, tp_distance) = stop_and_target_distance(
            candidate.signal.indicator_snapshot.atr,
            &candidate.regime,
        );
        let stop = match side {
            Side::Buy => candidate.signal.price - sl_distance,
            Side::Sell => candidate.signal.price + sl_distance,
        };

        let recent_trades = self
            .store
            .recent(Some(candidate.pair.as_str()), 500)
            .await
            .unwrap_or_default();
        let expectancy = compute_stats(&recent_trades, Some(candidate.pair.as_str()));

        let sizing = size_position(&SizingInput {
            balance,
            entry: candidate.signal.price,
            stop,
            leverage: config.risk.max_leverage as f64,
            regime: candidate.regime,
            confidence: candidate.signal.confidence,
            expectancy: Some(expectancy),
        });

        if sizing.size <= 0.0 {
            self.reject(candidate.pair, "sizer", "sizing produced zero size").await;
            return;
        }

        let positions = self.positions.read().await;
        let open_positions: Vec<Position> = positions
            .iter()
            .filter(|p| p.status == PositionStatus::Open)
            .cloned()
            .collect();
        drop(positions);

        let exposures = open_exposures(&open_positions);
        let candidate_value = sizing.size * candidate.signal.price;
        let admission = admit_candidate(&exposures, candidate.pair, candidate_value, balance);
        if !admission.admitted {
            self.reject(candidate.pair, "portfolio", admission.reason.unwrap_or("admission denied")).await;
            return;
        }

        if let Err(reason) = validate_risk(&RiskPreflightInput {
            open_position_count: open_positions.len(),
            max_open_positions: config.risk.max_open_positions,
            size: sizing.size,
            entry: candidate.signal.price,
            balance,
            leverage: config.risk.max_leverage as f64,
        }) {
            self.reject(candidate.pair, "safety_preflight", reason).await;
            return;
        }

        let entry_price_dec = Decimal::try_from(candidate.signal.price).unwrap_or(Decimal::ZERO);
        let quantity = Decimal::try_from(sizing.size)
            .unwrap_or(Decimal::ZERO)
            .round_dp(candidate.pair.quantity_precision());
        if quantity.is_zero() {
            self.reject(candidate.pair, "sizer", "quantity rounded to zero").await;
            return;
        }

        let order = match self
            .venue
            .create_market_order(candidate.pair, side, quantity, config.risk.max_leverage)
            .await
        {
            Ok(order) => order,
            Err(err) => {
                self.breaker.report_order_failure().await;
                self.reject(candidate.pair, "venue", &format!("order submission failed: {err}")).await;
                return;
            }
        };
        self.breaker.report_order_success().await;

        let fill_price = order.average_fill_price.or(order.price).unwrap_or(entry_price_dec);
        let stop_price = Decimal::try_from(stop).unwrap_or(fill_price);

        if let Err(err) = self
            .venue
            .create_stop_loss_order(candidate.pair, side.opposite(), quantity, stop_price)
            .await
        {
            warn!("stop-loss order failed for {}: {}", candidate.pair, err);
        }

        let take_profit_price = match side {
            Side::Buy => candidate.signal.price + tp_distance,
            Side::Sell => candidate.signal.price - tp_distance,
        };
        let take_profit = (tp_distance > 0.0)
            .then(|| Decimal::try_from(take_profit_price).ok())
            .flatten();
        let mut position = Position::new(candidate.pair, side, fill_price, quantity, "core".to_string())
            .with_stop_loss(stop_price)
            .with_entry_context(
                candidate.regime.label,
                candidate.signal.reasoning.clone(),
                Decimal::try_from(candidate.signal.confidence).unwrap_or(Decimal::ZERO),
            );
        if let Some(tp) = take_profit {
            position = position.with_take_profit(tp);
        }
        position.order_ids.push(order.id.clone());

        self.notifications
            .notify(AlertType::ComplianceRecordFiled {
                pair: candidate.pair,
                action: "open".to_string(),
                trade_id: order.id.clone(),
            })
            .await;
        self.notifications
            .notify(AlertType::PositionOpened {
                pair: candidate.pair,
                side: side.as_str().to_string(),
                quantity: quantity.to_string(),
                entry_price: fill_price.to_string(),
            })
            .await;

        self.positions.write().await.push(position);
    }

    async fn reject(&self, pair: TradingPair, stage: &str, reason: &str) {
        debug!("rejected candidate for {} at {}: {}", pair, stage, reason);
        self.notifications
            .notify(AlertType::PolicyRejected { pair, stage: stage.to_string(), reason: reason.to_string() })
            .await;
    }

    async fn sweep_open_positions(&self) {
        let config = self.config.get_config().await;
        let mut positions = self.positions.write().await;
        let exposures = open_exposures(positions.as_slice());
        let balance = self.venue.fetch_balance().await.ok().map(|b| b.free.to_f64().unwrap_or(0.0)).unwrap_or(0.0);
        let breakdown = exposure_breakdown(&exposures, balance);
        let hedge_advisory = should_hedge_portfolio(&breakdown, &exposures, balance, 0.0);

        let mut to_close: Vec<(usize, ExitReason, Decimal)> = Vec::new();

        for (idx, position) in positions.iter_mut().enumerate() {
            if position.status != PositionStatus::Open {
                continue;
            }

            let ticker = match self.venue.fetch_ticker(position.pair).await {
                Ok(t) => t,
                Err(err) => {
                    warn!("ticker fetch failed for {}: {}", position.pair, err);
                    continue;
                }
            };
            position.update_price(ticker.last);

            let still_open = self
                .venue
                .fetch_positions(Some(position.pair))
                .await
                .map(|ps| !ps.is_empty())
                .unwrap_or(true);
            if !still_open {
                to_close.push((idx, ExitReason::HardStop, ticker.last));
                continue;
            }

            let candles = match self.venue.fetch_ohlcv(position.pair, config.timeframe(), 200).await {
                Ok(c) => c,
                Err(_) => continue,
            };
            let Some(snapshot) = crate::indicators::build_snapshot(&candles) else { continue };
            let regime = regime::detect(&candles, &snapshot);

            let decision = evaluate_exit(position, &regime, &snapshot, hedge_advisory);
            if decision.breakeven_advisory && !position.breakeven_applied {
                position.breakeven_applied = true;
                self.notifications
                    .notify(AlertType::BreakEvenStopSet { pair: position.pair, entry_price: position.entry_price.to_string() })
                    .await;
            }
            if let Some(reason) = decision.reason {
                to_close.push((idx, reason, ticker.last));
            }
        }

        for (idx, reason, exit_price) in to_close {
            let position = &mut positions[idx];
            if let Err(err) = self.venue.close_position(position.pair).await {
                warn!("close_position failed for {}: {}", position.pair, err);
                continue;
            }
            position.close(exit_price);

            let trade = ClosedTrade::new(
                position.pair.as_str(),
                position.side,
                position.entry_price.to_f64().unwrap_or(0.0),
                exit_price.to_f64().unwrap_or(0.0),
                position.quantity.to_f64().unwrap_or(0.0),
                position.opened_at,
                format!("{reason:?}"),
            );
            if let Err(err) = self.store.append(trade).await {
                warn!("failed to persist closed trade: {}", err);
            }

            self.notifications
                .notify(AlertType::ComplianceRecordFiled {
                    pair: position.pair,
                    action: "close".to_string(),
                    trade_id: position.id.clone(),
                })
                .await;
            self.notifications
                .notify(AlertType::PositionClosed {
                    pair: position.pair,
                    pnl: position.realized_pnl.to_string(),
                    pnl_pct: position.pnl_percentage().to_string(),
                    reason: format!("{reason:?}"),
                })
                .await;
        }

        positions.retain(|p| p.status == PositionStatus::Open);
    }

    async fn check_expectancy_degradation(&self) {
        let trades = self.store.recent(None, 500).await.unwrap_or_default();
        let mut by_symbol: HashMap<String, Vec<ClosedTrade>> = HashMap::new();
        for trade in trades {
            by_symbol.entry(trade.symbol.clone()).or_default().push(trade);
        }
        for (symbol, trades) in by_symbol {
            let report = detect_degradation(&trades, Some(symbol.as_str()));
            if report.is_degrading {
                warn!("expectancy degradation detected for {}: {}", symbol, report.reason);
                self.breaker.report_order_failure().await;
            }
        }
    }

    async fn close_all_positions_best_effort(&self) {
        let positions = self.positions.read().await;
        for position in positions.iter().filter(|p| p.status == PositionStatus::Open) {
            if let Err(err) = self.venue.close_position(position.pair).await {
                warn!("shutdown: failed to close {}: {}", position.pair, err);
            } else {
                info!("shutdown: closed {}", position.pair);
            }
        }
    }
}
