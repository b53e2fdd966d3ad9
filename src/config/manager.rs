#![allow(dead_code)]
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use serde::Serialize;
use tracing::info;

use super::runtime::{CircuitThresholds, LoopSettings, RiskSettings, RuntimeConfig};

#[derive(Debug, Clone, Serialize)]
pub enum ConfigChangeEvent {
    RiskUpdated(RiskSettings),
    LoopUpdated(LoopSettings),
    CircuitUpdated(CircuitThresholds),
    UniverseUpdated(Vec<String>),
    FullConfigUpdated,
}

pub struct RuntimeConfigManager {
    config: Arc<RwLock<RuntimeConfig>>,
    change_tx: broadcast::Sender<ConfigChangeEvent>,
}

impl RuntimeConfigManager {
    pub fn new(initial: RuntimeConfig) -> Self {
        let (change_tx, _) = broadcast::channel(32);
        Self {
            config: Arc::new(RwLock::new(initial)),
            change_tx,
        }
    }

    pub async fn get_config(&self) -> RuntimeConfig {
        self.config.read().await.clone()
    }

    pub async fn update_risk(&self, settings: RiskSettings) -> Result<(), String> {
        let mut config = self.config.write().await;
        let old = config.risk.clone();
        config.risk = settings.clone();

        if let Err(errors) = config.validate() {
            config.risk = old;
            return Err(errors.join(", "));
        }

        info!(
            "risk settings updated: max_open_positions={} min_confidence={}",
            settings.max_open_positions, settings.min_confidence
        );
        let _ = self.change_tx.send(ConfigChangeEvent::RiskUpdated(settings));
        Ok(())
    }

    pub async fn update_loop_settings(&self, settings: LoopSettings) -> Result<(), String> {
        let mut config = self.config.write().await;
        let old = config.loop_settings.clone();
        config.loop_settings = settings.clone();

        if let Err(errors) = config.validate() {
            config.loop_settings = old;
            return Err(errors.join(", "));
        }

        info!("loop settings updated: cycle_period_seconds={}", settings.cycle_period_seconds);
        let _ = self.change_tx.send(ConfigChangeEvent::LoopUpdated(settings));
        Ok(())
    }

    pub async fn update_circuit_thresholds(&self, thresholds: CircuitThresholds) -> Result<(), String> {
        let mut config = self.config.write().await;
        config.circuit = thresholds.clone();

        info!("circuit breaker thresholds updated");
        let _ = self.change_tx.send(ConfigChangeEvent::CircuitUpdated(thresholds));
        Ok(())
    }

    pub async fn update_universe(&self, universe: Vec<String>) -> Result<(), String> {
        let mut config = self.config.write().await;
        let old = config.universe.clone();
        config.universe = universe.clone();

        if let Err(errors) = config.validate() {
            config.universe = old;
            return Err(errors.join(", "));
        }

        info!("universe updated: {:?}", universe);
        let _ = self.change_tx.send(ConfigChangeEvent::UniverseUpdated(universe));
        Ok(())
    }

    pub async fn update_full(&self, new_config: RuntimeConfig) -> Result<(), String> {
        if let Err(errors) = new_config.validate() {
            return Err(errors.join(", "));
        }

        let mut config = self.config.write().await;
        *config = new_config;

        info!("full configuration updated");
        let _ = self.change_tx.send(ConfigChangeEvent::FullConfigUpdated);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.change_tx.subscribe()
    }

    pub fn config_arc(&self) -> Arc<RwLock<RuntimeConfig>> {
        Arc::clone(&self.config)
    }
}

impl Clone for RuntimeConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            change_tx: self.change_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_update_is_rejected_and_prior_config_retained() {
        let manager = RuntimeConfigManager::new(RuntimeConfig::default());
        let mut bad_risk = manager.get_config().await.risk;
        bad_risk.max_open_positions = 0;
        let result = manager.update_risk(bad_risk).await;
        assert!(result.is_err());
        assert_eq!(manager.get_config().await.risk.max_open_positions, 3);
    }

    #[tokio::test]
    async fn valid_update_is_broadcast() {
        let manager = RuntimeConfigManager::new(RuntimeConfig::default());
        let mut rx = manager.subscribe();
        let mut risk = manager.get_config().await.risk;
        risk.max_open_positions = 5;
        manager.update_risk(risk).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ConfigChangeEvent::RiskUpdated(_)));
    }
}
