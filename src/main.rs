//! Scalping Strategy Engine
//!
//! Turns a stream of price bars into entry/exit decisions using RSI,
//! Bollinger Bands, and support/resistance confluence, with mode-dependent
//! position sizing and hard daily risk limits.

mod analysis;
mod bot;
mod broker;
mod error;
mod events;
mod models;
mod trading;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::bot::{EngineSettings, Runner, RunnerConfig};
use crate::broker::{CsvBarFeed, PaperBroker};
use crate::trading::{ControllerConfig, ModeTable, StrategyController, TradingMode};

/// Scalping strategy engine CLI.
#[derive(Parser)]
#[command(name = "scalpbot")]
#[command(about = "Vote-based scalping engine with mode-dependent risk limits", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine over a recorded bar file with a paper broker
    Run {
        /// Symbol to trade
        #[arg(short, long)]
        symbol: String,

        /// CSV file of bars (timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        bars: PathBuf,

        /// Trading mode
        #[arg(short, long, value_enum, default_value = "conservative")]
        mode: TradingMode,

        /// Evaluation interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Paper broker starting cash
        #[arg(short, long, default_value = "10000")]
        cash: Decimal,

        /// Override the capital base instead of using live equity
        #[arg(long)]
        custom_portfolio: Option<Decimal>,

        /// Use a fixed per-trade notional instead of percentage sizing
        #[arg(long)]
        fixed_amount: Option<Decimal>,

        /// Log order intents without submitting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the parameter table for every trading mode
    Modes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            symbol,
            bars,
            mode,
            interval,
            cash,
            custom_portfolio,
            fixed_amount,
            dry_run,
        } => {
            let mut settings = EngineSettings::new(mode);
            if let Some(value) = custom_portfolio {
                settings.overrides.custom_portfolio_enabled = true;
                settings.overrides.custom_portfolio_value = value;
            }
            if let Some(value) = fixed_amount {
                settings.overrides.fixed_trade_amount_enabled = true;
                settings.overrides.fixed_trade_amount = value;
            }

            let controller = StrategyController::new(ControllerConfig::new(symbol.clone()))?;
            let feed = CsvBarFeed::from_path(symbol.clone(), &bars)?;
            let broker = Arc::new(PaperBroker::new(cash));

            info!(symbol = %symbol, mode = %mode, bars = feed.len(), "Engine configured");

            let config = RunnerConfig {
                poll_interval_secs: interval,
                dry_run,
                halt_when_exhausted: true,
                close_on_shutdown: true,
            };

            let mut runner = Runner::new(
                config,
                controller,
                Arc::new(feed),
                broker.clone(),
                Arc::new(RwLock::new(settings)),
            );
            runner.run().await?;

            let stats = runner.stats();
            println!("\nSession summary");
            println!("  Cycles:       {}", stats.cycles);
            println!("  Entries:      {}", stats.entries);
            println!("  Exits:        {}", stats.exits);
            println!("  Blocked:      {}", stats.blocked);
            println!("  Realized PnL: {}", stats.realized_pnl);
            println!("  Final cash:   {}", broker.cash().await);
        }

        Commands::Modes => {
            let table = ModeTable::builtin();

            println!(
                "\n{:<14} {:>8} {:>8} {:>7} {:>7} {:>7} {:>8} {:>9} {:>9} {:>9}",
                "MODE", "SIZE", "STOP", "TAKE", "TRADES", "LOSS", "RSI", "MIN VOL", "VOL THR", "CONFIRMS"
            );
            println!("{}", "-".repeat(96));

            for mode in TradingMode::all() {
                let p = table.params(mode);
                println!(
                    "{:<14} {:>7}% {:>7}% {:>6}% {:>7} {:>6}% {:>3}/{:<3} {:>9} {:>8}% {:>9}",
                    mode.to_string(),
                    p.position_fraction() * Decimal::from(100),
                    p.stop_loss_pct * Decimal::from(100),
                    p.take_profit_pct * Decimal::from(100),
                    p.max_daily_trades,
                    p.max_daily_loss_pct * Decimal::from(100),
                    p.rsi_oversold,
                    p.rsi_overbought,
                    p.min_volume,
                    p.volatility_threshold * 100.0,
                    p.confirmations
                );
            }
        }
    }

    Ok(())
}
