//! Portfolio admission checks (single-asset, correlated-group, and sector
//! exposure caps) plus the exposure breakdown and hedge advisory the exit
//! manager's rebalance check consults.
use std::collections::HashMap;

use crate::types::{PositionStatus, Side, TradingPair, HIGH_CORRELATION_THRESHOLD};

const SINGLE_ASSET_CAP_PCT: f64 = 0.40;
const CORRELATED_GROUP_CAP_PCT: f64 = 0.60;
const SECTOR_CAP_PCT: f64 = 0.50;

const HEDGE_EXPOSURE_THRESHOLD_PCT: f64 = 0.80;
const HEDGE_HEAT_THRESHOLD_PCT: f64 = 0.20;
const HEDGE_DRAWDOWN_THRESHOLD_PCT: f64 = -0.05;
const HEDGE_DRAWDOWN_EXPOSURE_FLOOR_PCT: f64 = 0.40;
const HEDGE_NET_EXPOSURE_THRESHOLD_PCT: f64 = 0.50;

pub struct OpenExposure {
    pub pair: TradingPair,
    pub side: Side,
    pub notional: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionDecision {
    pub admitted: bool,
    pub reason: Option<&'static str>,
}

pub fn admit_candidate(
    existing: &[OpenExposure],
    candidate_pair: TradingPair,
    candidate_value: f64,
    balance: f64,
) -> AdmissionDecision {
    if balance <= 0.0 {
        return AdmissionDecision { admitted: false, reason: Some("no balance") };
    }

    let single_asset_exposure: f64 = existing
        .iter()
        .filter(|e| e.pair == candidate_pair)
        .map(|e| e.notional)
        .sum();
    if (single_asset_exposure + candidate_value) / balance > SINGLE_ASSET_CAP_PCT {
        return AdmissionDecision { admitted: false, reason: Some("single asset cap exceeded") };
    }

    let correlated_exposure: f64 = existing
        .iter()
        .filter(|e| {
            TradingPair::correlation_between(e.pair, candidate_pair) >= HIGH_CORRELATION_THRESHOLD
        })
        .map(|e| e.notional)
        .sum();
    if (correlated_exposure + candidate_value) / balance > CORRELATED_GROUP_CAP_PCT {
        return AdmissionDecision { admitted: false, reason: Some("correlated group cap exceeded") };
    }

    let sector_exposure: f64 = existing
        .iter()
        .filter(|e| e.pair.sector() == candidate_pair.sector())
        .map(|e| e.notional)
        .sum();
    if (sector_exposure + candidate_value) / balance > SECTOR_CAP_PCT {
        return AdmissionDecision { admitted: false, reason: Some("sector cap exceeded") };
    }

    AdmissionDecision { admitted: true, reason: None }
}

/// `simple_heat · (1 + avg_pairwise_correlation)`. Defaults to a 1.0
/// multiplier with at most one open position; unknown pairs default to 0.5.
pub fn correlation_adjusted_heat(existing: &[OpenExposure], balance: f64) -> f64 {
    let simple_heat = if balance > 0.0 {
        existing.iter().map(|e| e.notional).sum::<f64>() / balance
    } else {
        0.0
    };

    if existing.len() <= 1 {
        return simple_heat;
    }

    let mut pair_count = 0usize;
    let mut correlation_sum = 0.0;
    for i in 0..existing.len() {
        for j in (i + 1)..existing.len() {
            correlation_sum += TradingPair::correlation_between(existing[i].pair, existing[j].pair);
            pair_count += 1;
        }
    }
    let avg_correlation = if pair_count > 0 {
        correlation_sum / pair_count as f64
    } else {
        0.5
    };

    simple_heat * (1.0 + avg_correlation)
}

#[derive(Debug, Clone, Default)]
pub struct ExposureBreakdown {
    pub by_symbol: HashMap<String, f64>,
    pub by_symbol_pct: HashMap<String, f64>,
    pub by_sector: HashMap<String, f64>,
    pub by_sector_pct: HashMap<String, f64>,
    pub long_notional: f64,
    pub short_notional: f64,
    pub net_notional: f64,
    pub net_pct: f64,
    pub total_pct: f64,
}

pub fn exposure_breakdown(existing: &[OpenExposure], balance: f64) -> ExposureBreakdown {
    let mut breakdown = ExposureBreakdown::default();
    if existing.is_empty() {
        return breakdown;
    }

    for exposure in existing {
        let symbol = exposure.pair.as_str().to_string();
        *breakdown.by_symbol.entry(symbol.clone()).or_insert(0.0) += exposure.notional;
        *breakdown.by_sector.entry(exposure.pair.sector().to_string()).or_insert(0.0) +=
            exposure.notional;
        match exposure.side {
            Side::Buy => breakdown.long_notional += exposure.notional,
            Side::Sell => breakdown.short_notional += exposure.notional,
        }
    }

    breakdown.net_notional = breakdown.long_notional - breakdown.short_notional;
    if balance > 0.0 {
        for (symbol, notional) in &breakdown.by_symbol {
            breakdown.by_symbol_pct.insert(symbol.clone(), notional / balance);
        }
        for (sector, notional) in &breakdown.by_sector {
            breakdown.by_sector_pct.insert(sector.clone(), notional / balance);
        }
        breakdown.net_pct = breakdown.net_notional / balance;
        breakdown.total_pct = (breakdown.long_notional + breakdown.short_notional) / balance;
    }

    breakdown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeAdvisory {
    None,
    Hedge { overexposed_side: Side },
}

pub fn should_hedge_portfolio(
    breakdown: &ExposureBreakdown,
    existing: &[OpenExposure],
    balance: f64,
    drawdown_pct: f64,
) -> HedgeAdvisory {
    let heat = correlation_adjusted_heat(existing, balance);

    let overexposed_side = if breakdown.net_notional >= 0.0 { Side::Buy } else { Side::Sell };
    let net_magnitude_pct = breakdown.net_pct.abs();

    let triggered = breakdown.total_pct > HEDGE_EXPOSURE_THRESHOLD_PCT
        || heat > HEDGE_HEAT_THRESHOLD_PCT
        || (drawdown_pct < HEDGE_DRAWDOWN_THRESHOLD_PCT
            && breakdown.total_pct > HEDGE_DRAWDOWN_EXPOSURE_FLOOR_PCT)
        || net_magnitude_pct > HEDGE_NET_EXPOSURE_THRESHOLD_PCT;

    if triggered {
        HedgeAdvisory::Hedge { overexposed_side }
    } else {
        HedgeAdvisory::None
    }
}

/// Filters a position list down to the `OpenExposure` slice the admission
/// and hedge checks operate over.
pub fn open_exposures(positions: &[crate::types::Position]) -> Vec<OpenExposure> {
    positions
        .iter()
        .filter(|p| p.status == PositionStatus::Open)
        .map(|p| OpenExposure {
            pair: p.pair,
            side: p.side,
            notional: rust_decimal::prelude::ToPrimitive::to_f64(&p.notional_value())
                .unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_asset_cap_blocks_over_concentration() {
        let existing = vec![OpenExposure { pair: TradingPair::BTCUSDT, side: Side::Buy, notional: 3_500.0 }];
        let decision = admit_candidate(&existing, TradingPair::BTCUSDT, 1_000.0, 10_000.0);
        assert!(!decision.admitted);
    }

    #[test]
    fn correlated_group_cap_blocks_across_symbols() {
        let existing = vec![OpenExposure { pair: TradingPair::BTCUSDT, side: Side::Buy, notional: 5_000.0 }];
        let decision = admit_candidate(&existing, TradingPair::ETHUSDT, 1_500.0, 10_000.0);
        assert!(!decision.admitted);
    }

    #[test]
    fn unrelated_symbols_are_admitted() {
        let existing = vec![OpenExposure { pair: TradingPair::DOGEUSDT, side: Side::Buy, notional: 1_000.0 }];
        let decision = admit_candidate(&existing, TradingPair::BTCUSDT, 1_000.0, 10_000.0);
        assert!(decision.admitted);
    }

    #[test]
    fn heat_defaults_to_simple_heat_with_one_position() {
        let existing = vec![OpenExposure { pair: TradingPair::BTCUSDT, side: Side::Buy, notional: 1_000.0 }];
        let heat = correlation_adjusted_heat(&existing, 10_000.0);
        assert!((heat - 0.1).abs() < 1e-9);
    }

    #[test]
    fn hedge_advisory_fires_on_large_one_sided_exposure() {
        let existing = vec![OpenExposure { pair: TradingPair::BTCUSDT, side: Side::Buy, notional: 6_000.0 }];
        let breakdown = exposure_breakdown(&existing, 10_000.0);
        let advisory = should_hedge_portfolio(&breakdown, &existing, 10_000.0, 0.0);
        assert_eq!(advisory, HedgeAdvisory::Hedge { overexposed_side: Side::Buy });
    }
}
