//! Trade-history persistence: the only state the core touches that survives
//! a restart. Append-only, keyed by trade id for idempotent replays.
use async_trait::async_trait;

use crate::types::ClosedTrade;

#[async_trait]
pub trait ClosedTradeStore: Send + Sync {
    async fn append(&self, trade: ClosedTrade) -> anyhow::Result<()>;

    async fn recent(&self, symbol: Option<&str>, limit: usize) -> anyhow::Result<Vec<ClosedTrade>>;
}

/// `sled`-backed store. Keys are the trade's UUID so `append` is idempotent
/// under retry; values are JSON-encoded `ClosedTrade` records.
pub struct SledTradeStore {
    db: sled::Db,
}

impl SledTradeStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        Ok(Self { db: sled::open(path)? })
    }

    fn all_trades(&self) -> anyhow::Result<Vec<ClosedTrade>> {
        let mut trades = Vec::new();
        for entry in self.db.iter() {
            let (_, value) = entry?;
            trades.push(serde_json::from_slice::<ClosedTrade>(&value)?);
        }
        Ok(trades)
    }
}

#[async_trait]
impl ClosedTradeStore for SledTradeStore {
    async fn append(&self, trade: ClosedTrade) -> anyhow::Result<()> {
        let key = trade.id.as_bytes();
        if self.db.contains_key(key)? {
            return Ok(());
        }
        let value = serde_json::to_vec(&trade)?;
        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn recent(&self, symbol: Option<&str>, limit: usize) -> anyhow::Result<Vec<ClosedTrade>> {
        let mut trades = self.all_trades()?;
        if let Some(symbol) = symbol {
            trades.retain(|t| t.symbol == symbol);
        }
        trades.sort_by(|a, b| b.exit_time.cmp(&a.exit_time));
        trades.truncate(limit);
        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use chrono::Utc;

    fn temp_store() -> SledTradeStore {
        let path = std::env::temp_dir().join(format!("scalp_core_test_{}", uuid::Uuid::new_v4()));
        SledTradeStore::open(path).unwrap()
    }

    #[tokio::test]
    async fn append_then_recent_round_trips() {
        let store = temp_store();
        let trade = ClosedTrade::new("BTCUSDT", Side::Buy, 100.0, 110.0, 1.0, Utc::now(), "take_profit");
        store.append(trade.clone()).await.unwrap();
        let recent = store.recent(Some("BTCUSDT"), 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, trade.id);
    }

    #[tokio::test]
    async fn append_is_idempotent_by_id() {
        let store = temp_store();
        let trade = ClosedTrade::new("ETHUSDT", Side::Sell, 100.0, 90.0, 1.0, Utc::now(), "hard_stop");
        store.append(trade.clone()).await.unwrap();
        store.append(trade.clone()).await.unwrap();
        let recent = store.recent(None, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn recent_filters_by_symbol_and_respects_limit() {
        let store = temp_store();
        for _ in 0..3 {
            store
                .append(ClosedTrade::new("BTCUSDT", Side::Buy, 100.0, 105.0, 1.0, Utc::now(), "tp"))
                .await
                .unwrap();
        }
        store
            .append(ClosedTrade::new("ETHUSDT", Side::Buy, 50.0, 55.0, 1.0, Utc::now(), "tp"))
            .await
            .unwrap();
        let recent = store.recent(Some("BTCUSDT"), 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|t| t.symbol == "BTCUSDT"));
    }
}
