//! Rolling win-rate/payoff/expectancy statistics over closed trades, and the
//! Kelly inputs the risk sizer consumes once enough history has accumulated.
use serde::{Deserialize, Serialize};

use crate::types::{ClosedTrade, KellyInputs};

const MIN_SAMPLE_SIZE: usize = 30;
const ROLLING_WINDOWS: [usize; 3] = [30, 100, 500];
const DEGRADATION_SHORT_WINDOW: usize = 30;
const DEGRADATION_LONG_WINDOW: usize = 100;
const WIN_RATE_DEGRADATION_THRESHOLD: f64 = 0.20;
const EXPECTANCY_DEGRADATION_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectancyStats {
    pub sample_size: usize,
    pub win_rate: Option<f64>,
    pub payoff_ratio: Option<f64>,
    pub expectancy: f64,
    pub kelly_fraction_raw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingMetrics {
    pub window: usize,
    pub stats: ExpectancyStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationReport {
    pub is_degrading: bool,
    pub reason: String,
    pub win_rate_drop: Option<f64>,
    pub expectancy_drop: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Option<f64>,
    pub payoff_ratio: Option<f64>,
    pub expectancy: f64,
    pub kelly_fraction_raw: f64,
    pub rolling: Vec<RollingMetrics>,
    pub degradation: DegradationReport,
    pub ready_for_kelly: bool,
}

/// Computes the core statistics over a trade slice, most-recent-last.
/// `symbol` filters to one market when set; `None` pools all symbols.
pub fn compute_stats(trades: &[ClosedTrade], symbol: Option<&str>) -> ExpectancyStats {
    let filtered: Vec<&ClosedTrade> = trades
        .iter()
        .filter(|t| symbol.map_or(true, |s| t.symbol == s))
        .collect();
    stats_from_slice(&filtered)
}

fn stats_from_slice(trades: &[&ClosedTrade]) -> ExpectancyStats {
    let sample_size = trades.len();
    let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_win())
        .map(|t| t.pnl.abs())
        .collect();

    let win_rate = if sample_size >= MIN_SAMPLE_SIZE {
        Some(wins.len() as f64 / sample_size as f64)
    } else {
        None
    };

    let avg_win = mean(&wins);
    let avg_loss = mean(&losses);
    let payoff_ratio = match (avg_win, avg_loss) {
        (Some(w), Some(l)) if l.abs() > f64::EPSILON => Some(w / l),
        _ => None,
    };

    let (expectancy, kelly_fraction_raw) = match (win_rate, payoff_ratio, avg_win, avg_loss) {
        (Some(p), Some(b), Some(w), Some(l)) => {
            let loss_rate = 1.0 - p;
            let expectancy = p * w - loss_rate * l;
            let kelly = ((p * b - loss_rate) / b).max(0.0);
            (expectancy, kelly)
        }
        _ => (0.0, 0.0),
    };

    ExpectancyStats {
        sample_size,
        win_rate,
        payoff_ratio,
        expectancy,
        kelly_fraction_raw,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Bundles the statistics into `KellyInputs` only once the sample is large
/// enough for the sizer to trust it.
pub fn kelly_inputs(trades: &[ClosedTrade], symbol: Option<&str>) -> Option<KellyInputs> {
    let stats = compute_stats(trades, symbol);
    if stats.sample_size < MIN_SAMPLE_SIZE {
        return None;
    }
    Some(KellyInputs {
        win_rate: stats.win_rate?,
        payoff_ratio: stats.payoff_ratio.unwrap_or(0.0),
        sample_size: stats.sample_size,
        kelly_fraction_raw: stats.kelly_fraction_raw,
        confidence_interval: (stats.sample_size as f64 / 100.0).min(1.0),
        expectancy: stats.expectancy,
    })
}

pub fn rolling_metrics(trades: &[ClosedTrade], symbol: Option<&str>) -> Vec<RollingMetrics> {
    let filtered: Vec<&ClosedTrade> = trades
        .iter()
        .filter(|t| symbol.map_or(true, |s| t.symbol == s))
        .collect();

    ROLLING_WINDOWS
        .iter()
        .filter(|&&window| filtered.len() >= window)
        .map(|&window| {
            let slice = &filtered[filtered.len() - window..];
            RollingMetrics {
                window,
                stats: stats_from_slice(slice),
            }
        })
        .collect()
}

pub fn detect_degradation(trades: &[ClosedTrade], symbol: Option<&str>) -> DegradationReport {
    let filtered: Vec<&ClosedTrade> = trades
        .iter()
        .filter(|t| symbol.map_or(true, |s| t.symbol == s))
        .collect();

    if filtered.len() < DEGRADATION_LONG_WINDOW {
        return DegradationReport {
            is_degrading: false,
            reason: "insufficient_data".to_string(),
            win_rate_drop: None,
            expectancy_drop: None,
        };
    }

    let short = stats_from_slice(&filtered[filtered.len() - DEGRADATION_SHORT_WINDOW..]);
    let long = stats_from_slice(&filtered[filtered.len() - DEGRADATION_LONG_WINDOW..]);

    let win_rate_drop = match (short.win_rate, long.win_rate) {
        (Some(s), Some(l)) if l.abs() > f64::EPSILON => Some((l - s) / l),
        _ => None,
    };
    let expectancy_drop = if long.expectancy.abs() > f64::EPSILON {
        Some((long.expectancy - short.expectancy) / long.expectancy)
    } else {
        None
    };

    let win_rate_degraded = win_rate_drop.is_some_and(|d| d > WIN_RATE_DEGRADATION_THRESHOLD);
    let expectancy_degraded =
        expectancy_drop.is_some_and(|d| d > EXPECTANCY_DEGRADATION_THRESHOLD);

    let is_degrading = win_rate_degraded || expectancy_degraded;
    let reason = if win_rate_degraded && expectancy_degraded {
        "win_rate and expectancy both degraded"
    } else if win_rate_degraded {
        "win_rate degraded"
    } else if expectancy_degraded {
        "expectancy degraded"
    } else {
        "stable"
    };

    DegradationReport {
        is_degrading,
        reason: reason.to_string(),
        win_rate_drop,
        expectancy_drop,
    }
}

pub fn performance_summary(trades: &[ClosedTrade], symbol: Option<&str>) -> PerformanceSummary {
    let filtered: Vec<&ClosedTrade> = trades
        .iter()
        .filter(|t| symbol.map_or(true, |s| t.symbol == s))
        .collect();

    let stats = stats_from_slice(&filtered);
    let winning_trades = filtered.iter().filter(|t| t.is_win()).count();

    PerformanceSummary {
        total_trades: stats.sample_size,
        winning_trades,
        losing_trades: stats.sample_size - winning_trades,
        win_rate: stats.win_rate,
        payoff_ratio: stats.payoff_ratio,
        expectancy: stats.expectancy,
        kelly_fraction_raw: stats.kelly_fraction_raw,
        rolling: rolling_metrics(trades, symbol),
        degradation: detect_degradation(trades, symbol),
        ready_for_kelly: stats.sample_size >= MIN_SAMPLE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::types::Side;

    fn trade(pnl: f64) -> ClosedTrade {
        let side = Side::Buy;
        let entry = 100.0;
        let exit = if pnl >= 0.0 { entry + pnl } else { entry + pnl };
        ClosedTrade::new("BTCUSDT", side, entry, exit, 1.0, Utc::now(), "test")
    }

    fn sample_trades(wins: usize, losses: usize, win_pnl: f64, loss_pnl: f64) -> Vec<ClosedTrade> {
        let mut trades = Vec::new();
        for _ in 0..wins {
            trades.push(trade(win_pnl));
        }
        for _ in 0..losses {
            trades.push(trade(-loss_pnl));
        }
        trades
    }

    #[test]
    fn below_minimum_sample_has_no_win_rate() {
        let trades = sample_trades(5, 5, 10.0, 5.0);
        let stats = compute_stats(&trades, None);
        assert!(stats.win_rate.is_none());
        assert!(kelly_inputs(&trades, None).is_none());
    }

    #[test]
    fn sufficient_sample_yields_kelly_inputs() {
        let trades = sample_trades(24, 16, 10.0, 5.0);
        let inputs = kelly_inputs(&trades, None).expect("expected kelly inputs");
        assert_eq!(inputs.sample_size, 40);
        assert!((inputs.win_rate - 0.6).abs() < 1e-9);
        assert!(inputs.kelly_fraction_raw >= 0.0);
    }

    #[test]
    fn degradation_flags_insufficient_data_under_long_window() {
        let trades = sample_trades(20, 20, 10.0, 5.0);
        let report = detect_degradation(&trades, None);
        assert!(!report.is_degrading);
        assert_eq!(report.reason, "insufficient_data");
    }

    #[test]
    fn rolling_metrics_only_include_satisfied_windows() {
        let trades = sample_trades(20, 20, 10.0, 5.0);
        let rolling = rolling_metrics(&trades, None);
        assert_eq!(rolling.len(), 1);
        assert_eq!(rolling[0].window, 30);
    }
}
