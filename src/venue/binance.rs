//! `VenueAdapter` backed by the Binance.US REST client. Spot margin is used
//! as the leverage proxy since the client signs against `/api/v3`, not the
//! USDT-M futures surface; `set_leverage` and position tracking are therefore
//! best-effort and logged, not authoritative.
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::VenueError;
use crate::exchange::binance::BinanceClient;
use crate::types::{Candle, Order, OrderRequest, OrderType, Side, TimeFrame, TradingPair};
use crate::venue::{VenueAdapter, VenueBalance, VenuePosition, VenueTicker};

pub struct BinanceVenueAdapter {
    client: BinanceClient,
    quote_asset: &'static str,
}

impl BinanceVenueAdapter {
    pub fn new(api_key: String, secret_key: String, use_testnet: bool) -> Self {
        Self {
            client: BinanceClient::new(api_key, secret_key, use_testnet),
            quote_asset: "USDT",
        }
    }
}

#[async_trait]
impl VenueAdapter for BinanceVenueAdapter {
    async fn fetch_ohlcv(
        &self,
        pair: TradingPair,
        timeframe: TimeFrame,
        limit: u32,
    ) -> anyhow::Result<Vec<Candle>> {
        self.client.get_candles(pair, timeframe, limit).await
    }

    async fn fetch_balance(&self) -> anyhow::Result<VenueBalance> {
        let balances = self.client.get_all_balances().await?;
        let (free, locked) = balances
            .get(self.quote_asset)
            .copied()
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        Ok(VenueBalance {
            total: free + locked,
            free,
            used: locked,
            currency: self.quote_asset,
        })
    }

    async fn fetch_ticker(&self, pair: TradingPair) -> anyhow::Result<VenueTicker> {
        let ticker = self.client.get_ticker(pair).await?;
        Ok(VenueTicker {
            last: ticker.price,
            bid: ticker.bid,
            ask: ticker.ask,
            ts_ms: ticker.timestamp.timestamp_millis(),
        })
    }

    async fn create_market_order(
        &self,
        pair: TradingPair,
        side: Side,
        amount: Decimal,
        leverage: u32,
    ) -> anyhow::Result<Order> {
        if leverage > 1 {
            warn!(
                "venue adapter requested {}x leverage on {} but the spot client cannot apply it",
                leverage, pair
            );
        }
        let request = OrderRequest::market(pair, side, amount);
        self.client.place_order(&request).await
    }

    async fn create_stop_loss_order(
        &self,
        pair: TradingPair,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
    ) -> anyhow::Result<Order> {
        let request = OrderRequest {
            client_order_id: uuid::Uuid::new_v4().to_string(),
            pair,
            side,
            order_type: OrderType::StopLoss,
            quantity: amount,
            price: None,
            stop_price: Some(stop_price),
            time_in_force: None,
        };
        self.client.place_order(&request).await
    }

    async fn fetch_positions(&self, pair: Option<TradingPair>) -> anyhow::Result<Vec<VenuePosition>> {
        // The spot account has no native position concept; base-asset
        // balances above dust are reported as synthetic long positions.
        let balances = self.client.get_all_balances().await?;
        let mut positions = Vec::new();
        for (asset, (free, locked)) in balances {
            if asset == self.quote_asset {
                continue;
            }
            let contracts = free + locked;
            if contracts.is_zero() {
                continue;
            }
            let Some(candidate) = TradingPair::all().into_iter().find(|p| p.base_asset() == asset)
            else {
                continue;
            };
            if let Some(filter) = pair {
                if filter != candidate {
                    continue;
                }
            }
            let ticker = self.client.get_ticker(candidate).await?;
            positions.push(VenuePosition {
                pair: candidate,
                side: Side::Buy,
                contracts,
                entry_price: ticker.price,
            });
        }
        Ok(positions)
    }

    async fn close_position(&self, pair: TradingPair) -> anyhow::Result<Order> {
        let positions = self.fetch_positions(Some(pair)).await?;
        let position = positions
            .into_iter()
            .next()
            .ok_or_else(|| VenueError::NoOpenPosition(pair.to_string()))?;
        let request = OrderRequest::market(pair, position.side.opposite(), position.contracts);
        self.client.place_order(&request).await
    }

    async fn set_leverage(&self, pair: TradingPair, leverage: u32) -> anyhow::Result<()> {
        warn!(
            "set_leverage({}, {}x) is a no-op on the spot venue adapter",
            pair, leverage
        );
        Ok(())
    }
}
