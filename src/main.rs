mod errors;
mod types;
mod indicators;
mod signal;
mod regime;
mod expectancy;
mod circuit;
mod exchange;
mod engine;
mod risk;
mod venue;
mod advisor;
mod store;
mod config;
mod notifications;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use advisor::{Advisor, NoOpAdvisor};
use circuit::CircuitBreaker;
use config::{load_runtime_config, RuntimeConfig, RuntimeConfigManager};
use engine::controller::BotController;
use engine::trading_loop::TradingLoop;
use notifications::NotificationManager;
use store::{ClosedTradeStore, SledTradeStore};
use venue::{BinanceVenueAdapter, VenueAdapter};

#[derive(Parser)]
#[command(name = "scalp-core")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Autonomous trading decision core for perpetual-futures scalping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML), layered with SCALP_-prefixed env overrides
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live trading loop until stopped (Ctrl-C)
    Run,
    /// Run a single scan-and-report cycle and exit
    DryRun,
    /// Print the fully resolved runtime configuration and exit
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("scalp-core v0.1.0");

    let resolved_config = load_runtime_config(&cli.config);
    let validation = resolved_config.validate();
    if let Err(problems) = &validation {
        warn!("resolved configuration has validation problems: {}", problems.join(", "));
    }

    match cli.command {
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&resolved_config)?);
        }
        Commands::DryRun => {
            validation.map_err(|errs| anyhow::anyhow!(errs.join(", ")))?;
            let (trading_loop, _controller) = build_trading_loop(resolved_config).await?;
            trading_loop.run_cycle().await?;
            info!("dry run cycle complete");
        }
        Commands::Run => {
            validation.map_err(|errs| anyhow::anyhow!(errs.join(", ")))?;
            let (trading_loop, controller) = build_trading_loop(resolved_config).await?;
            info!("starting live trading loop");
            let loop_handle = tokio::spawn(async move { trading_loop.run().await });

            if tokio::signal::ctrl_c().await.is_err() {
                error!("failed to install ctrl-c handler, stopping immediately");
            } else {
                info!("stop signal received, finishing in-flight cycle");
            }
            controller.stop().await.ok();
            let _ = loop_handle.await;
        }
    }

    Ok(())
}

/// Wires the default runtime: a Binance.US-backed venue adapter (spot,
/// leverage-unaware), a no-op advisor, and a sled-backed trade store.
/// Production deployments supply their own `Advisor`.
async fn build_trading_loop(
    config: RuntimeConfig,
) -> Result<(Arc<TradingLoop>, Arc<BotController>)> {
    let api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
    let secret_key = std::env::var("BINANCE_SECRET_KEY").unwrap_or_default();
    let use_testnet = std::env::var("BINANCE_TESTNET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    if api_key.is_empty() || secret_key.is_empty() {
        warn!("BINANCE_API_KEY / BINANCE_SECRET_KEY not set; order submission will fail");
    }

    let venue: Arc<dyn VenueAdapter> =
        Arc::new(BinanceVenueAdapter::new(api_key, secret_key, use_testnet));
    let advisor: Arc<dyn Advisor> = Arc::new(NoOpAdvisor);
    let store_path = std::env::var("SCALP_TRADE_STORE_PATH").unwrap_or_else(|_| "data/closed_trades.sled".to_string());
    let store: Arc<dyn ClosedTradeStore> = Arc::new(SledTradeStore::open(&store_path)?);
    let breaker = Arc::new(CircuitBreaker::new());
    let config_manager = Arc::new(RuntimeConfigManager::new(config));
    let notifications = Arc::new(NotificationManager::new());
    let controller = Arc::new(BotController::new_running());

    let trading_loop = Arc::new(TradingLoop::new(
        venue,
        advisor,
        store,
        breaker,
        config_manager,
        notifications,
        Arc::clone(&controller),
    ));

    Ok((trading_loop, controller))
}
