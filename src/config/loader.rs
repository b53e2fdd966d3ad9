//! Layers `config.toml` (if present) with `SCALP_`-prefixed environment
//! variable overrides, falling back to defaults when neither source parses
//! into a complete `RuntimeConfig`.
use config::{Config, Environment, File};
use tracing::warn;

use super::runtime::RuntimeConfig;

pub fn load_runtime_config(path: &str) -> RuntimeConfig {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::with_prefix("SCALP").separator("__"));

    match builder.build() {
        Ok(settings) => settings.try_deserialize().unwrap_or_else(|err| {
            warn!("config at {path} present but incomplete ({err}), using defaults");
            RuntimeConfig::default()
        }),
        Err(err) => {
            warn!("failed to build layered config ({err}), using defaults");
            RuntimeConfig::default()
        }
    }
}
