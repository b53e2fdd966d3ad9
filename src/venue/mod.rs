//! The venue boundary the trading loop trades against: candle/ticker/balance
//! reads and order placement, abstracted behind an `async_trait` so the
//! default REST implementation can be swapped for paper or test doubles.
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Candle, Order, Side, TimeFrame, TradingPair};

pub mod binance;
pub use binance::BinanceVenueAdapter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenueBalance {
    pub total: Decimal,
    pub free: Decimal,
    pub used: Decimal,
    pub currency: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenueTicker {
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub ts_ms: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenuePosition {
    pub pair: TradingPair,
    pub side: Side,
    pub contracts: Decimal,
    pub entry_price: Decimal,
}

#[async_trait]
pub trait VenueAdapter: Send + Sync {
    async fn fetch_ohlcv(
        &self,
        pair: TradingPair,
        timeframe: TimeFrame,
        limit: u32,
    ) -> anyhow::Result<Vec<Candle>>;

    async fn fetch_balance(&self) -> anyhow::Result<VenueBalance>;

    async fn fetch_ticker(&self, pair: TradingPair) -> anyhow::Result<VenueTicker>;

    /// Must report the filled price (or the nearest available proxy) so the
    /// caller can compute slippage against the signal's intended entry.
    async fn create_market_order(
        &self,
        pair: TradingPair,
        side: Side,
        amount: Decimal,
        leverage: u32,
    ) -> anyhow::Result<Order>;

    async fn create_stop_loss_order(
        &self,
        pair: TradingPair,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
    ) -> anyhow::Result<Order>;

    async fn fetch_positions(&self, pair: Option<TradingPair>) -> anyhow::Result<Vec<VenuePosition>>;

    async fn close_position(&self, pair: TradingPair) -> anyhow::Result<Order>;

    async fn set_leverage(&self, pair: TradingPair, leverage: u32) -> anyhow::Result<()>;
}
