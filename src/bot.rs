//! Engine runner: the polling loop that wires feed, controller, and broker.
//!
//! Handles:
//! - Pulling the latest bar and account equity each cycle
//! - Evaluating the strategy controller
//! - Submitting orders and confirming fills back into the controller
//! - Emitting per-cycle reports to an optional observer channel
//! - Graceful shutdown, optionally flattening the open position

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, MarketData, OrderSide};
use crate::events::{CycleReport, Decision};
use crate::trading::{
    CycleInput, ModeParameters, ModeTable, OverrideSettings, StrategyController, TradingMode,
};

/// Runtime-adjustable settings, shared with whatever drives reconfiguration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub mode: TradingMode,
    pub mode_table: ModeTable,
    pub overrides: OverrideSettings,
}

impl EngineSettings {
    pub fn new(mode: TradingMode) -> Self {
        Self {
            mode,
            mode_table: ModeTable::builtin(),
            overrides: OverrideSettings::default(),
        }
    }

    /// Parameters for the currently selected mode.
    pub fn params(&self) -> ModeParameters {
        self.mode_table.params(self.mode)
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Seconds between evaluation cycles.
    pub poll_interval_secs: u64,

    /// Log order intents without submitting them.
    pub dry_run: bool,

    /// Stop the loop when the feed yields no bar (replay feeds); live feeds
    /// return nothing transiently and should keep polling.
    pub halt_when_exhausted: bool,

    /// Flatten any open position on shutdown.
    pub close_on_shutdown: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            dry_run: false,
            halt_when_exhausted: false,
            close_on_shutdown: true,
        }
    }
}

/// Aggregate counters for the shutdown summary.
#[derive(Debug, Default, Clone)]
pub struct RunnerStats {
    pub cycles: u64,
    pub entries: u64,
    pub exits: u64,
    pub blocked: u64,
    pub realized_pnl: Decimal,
}

/// Main engine runner.
pub struct Runner {
    config: RunnerConfig,
    controller: StrategyController,
    market_data: Arc<dyn MarketData>,
    broker: Arc<dyn Broker>,
    settings: Arc<RwLock<EngineSettings>>,
    reports: Option<mpsc::Sender<CycleReport>>,
    stats: RunnerStats,
    shutdown: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(
        config: RunnerConfig,
        controller: StrategyController,
        market_data: Arc<dyn MarketData>,
        broker: Arc<dyn Broker>,
        settings: Arc<RwLock<EngineSettings>>,
    ) -> Self {
        Self {
            config,
            controller,
            market_data,
            broker,
            settings,
            reports: None,
            stats: RunnerStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach an observer channel. Reports are dropped, never awaited, when
    /// the observer falls behind.
    pub fn with_reports(mut self, sender: mpsc::Sender<CycleReport>) -> Self {
        self.reports = Some(sender);
        self
    }

    /// Get shutdown signal for external control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> &RunnerStats {
        &self.stats
    }

    /// Main run loop.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            symbol = self.controller.symbol(),
            dry_run = self.config.dry_run,
            poll_interval = self.config.poll_interval_secs,
            "Starting engine run loop"
        );

        let mut poll_interval = interval(Duration::from_secs(self.config.poll_interval_secs));

        // Register shutdown handler
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        while !self.shutdown.load(Ordering::SeqCst) {
            poll_interval.tick().await;

            match self.tick().await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Bar feed exhausted, stopping");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error in engine tick");
                    // Transient feed/broker failures should not kill the loop
                }
            }
        }

        self.finish().await?;
        Ok(())
    }

    /// Single evaluation cycle. Returns `false` when the loop should stop.
    async fn tick(&mut self) -> Result<bool> {
        self.stats.cycles += 1;
        debug!(cycle = self.stats.cycles, "Engine tick");

        let (params, overrides) = {
            let settings = self.settings.read().await;
            (settings.params(), settings.overrides.clone())
        };

        let symbol = self.controller.symbol().to_string();
        let bar = self
            .market_data
            .latest_bar(&symbol)
            .await
            .context("bar feed failed")?;
        let exhausted = bar.is_none();

        let equity = match self.broker.account_equity().await {
            Ok(equity) => equity,
            Err(e) => {
                warn!(error = %e, "Equity query failed, falling back to last valid");
                None
            }
        };

        // Replay determinism: the bar's own timestamp drives day rollover
        let now = bar.as_ref().map(|b| b.timestamp).unwrap_or_else(Utc::now);

        let report = self.controller.evaluate(CycleInput {
            bar,
            equity,
            params: params.clone(),
            overrides,
            now,
        });

        for warning in &report.warnings {
            warn!(symbol = %symbol, "{warning}");
        }

        match &report.decision {
            Decision::Enter {
                quantity,
                notional,
                price,
            } => {
                info!(
                    symbol = %symbol,
                    quantity = %quantity,
                    notional = %notional,
                    price = %price,
                    "Entry signal"
                );
                if self.config.dry_run {
                    info!("Dry run: order not submitted");
                } else {
                    match self
                        .broker
                        .submit_order(&symbol, OrderSide::Buy, *quantity, *price)
                        .await
                    {
                        Ok(receipt) => {
                            self.stats.entries += 1;
                            self.controller.confirm_entry(
                                receipt.quantity,
                                receipt.fill_price,
                                &params,
                                now,
                            );
                        }
                        Err(e) => {
                            // Leave the controller idle; next cycle re-evaluates
                            error!(error = %e, "Entry order rejected");
                        }
                    }
                }
            }
            Decision::Exit { reason, price } => {
                info!(symbol = %symbol, reason = %reason, price = %price, "Exit signal");
                if !self.config.dry_run {
                    self.close_position(*price).await;
                }
            }
            Decision::Hold { reason } => {
                debug!(symbol = %symbol, reason = %reason, "Holding");
            }
            Decision::Blocked { reason } => {
                self.stats.blocked += 1;
                warn!(symbol = %symbol, reason = %reason, "Entry blocked");
            }
        }

        self.emit(report);
        Ok(!(exhausted && self.config.halt_when_exhausted))
    }

    /// Sell the open position and record the realized result.
    async fn close_position(&mut self, price: Decimal) {
        let Some(quantity) = self.controller.open_position().map(|p| p.quantity) else {
            return;
        };
        let symbol = self.controller.symbol().to_string();

        match self
            .broker
            .submit_order(&symbol, OrderSide::Sell, quantity, price)
            .await
        {
            Ok(receipt) => {
                let pnl = self.controller.confirm_exit(receipt.fill_price);
                self.stats.exits += 1;
                self.stats.realized_pnl += pnl;
                info!(symbol = %symbol, pnl = %pnl, "Realized exit");
            }
            Err(e) => {
                error!(error = %e, "Exit order rejected, position remains open");
            }
        }
    }

    fn emit(&self, report: CycleReport) {
        if let Some(sender) = &self.reports {
            if sender.try_send(report).is_err() {
                debug!("Report channel full or closed, dropping report");
            }
        }
    }

    /// Graceful shutdown: optionally flatten, then log the session summary.
    async fn finish(&mut self) -> Result<()> {
        if self.config.close_on_shutdown && !self.config.dry_run {
            if let Some(Decision::Exit { price, reason }) = self.controller.emergency_close() {
                info!(price = %price, reason = %reason, "Flattening open position on shutdown");
                self.close_position(price).await;
            }
        }

        info!(
            cycles = self.stats.cycles,
            entries = self.stats.entries,
            exits = self.stats.exits,
            blocked = self.stats.blocked,
            realized_pnl = %self.stats.realized_pnl,
            "Engine stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::PaperBroker;
    use crate::models::PriceBar;
    use crate::trading::ControllerConfig;
    use chrono::{DateTime, Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Feed that hands out a scripted bar sequence.
    struct ScriptedFeed {
        bars: Mutex<VecDeque<PriceBar>>,
    }

    impl ScriptedFeed {
        fn new(bars: Vec<PriceBar>) -> Self {
            Self {
                bars: Mutex::new(bars.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketData for ScriptedFeed {
        async fn latest_bar(&self, _symbol: &str) -> Result<Option<PriceBar>> {
            Ok(self.bars.lock().await.pop_front())
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap()
    }

    fn bar_at(minute: i64, close: Decimal) -> PriceBar {
        PriceBar {
            timestamp: base_time() + Duration::minutes(minute),
            open: close + dec!(0.05),
            high: close + dec!(0.2),
            low: close - dec!(0.2),
            close,
            volume: dec!(50000),
        }
    }

    /// Steady decline pins RSI at 0 and keeps the close on the lower band,
    /// so the aggressive mode enters as soon as indicators warm up.
    fn decline_bars(count: i64) -> Vec<PriceBar> {
        (0..count)
            .map(|i| bar_at(i, dec!(100) - dec!(0.1) * Decimal::from(i)))
            .collect()
    }

    fn runner_with(bars: Vec<PriceBar>, config: RunnerConfig) -> (Runner, Arc<PaperBroker>) {
        let controller = StrategyController::new(ControllerConfig::new("AAPL")).unwrap();
        let broker = Arc::new(PaperBroker::new(dec!(10000)));
        let settings = Arc::new(RwLock::new(EngineSettings::new(TradingMode::Aggressive)));
        let runner = Runner::new(
            config,
            controller,
            Arc::new(ScriptedFeed::new(bars)),
            broker.clone(),
            settings,
        );
        (runner, broker)
    }

    #[tokio::test]
    async fn test_entry_fill_opens_position_and_spends_cash() {
        let (mut runner, broker) = runner_with(decline_bars(21), RunnerConfig::default());

        for _ in 0..21 {
            assert!(runner.tick().await.unwrap());
        }

        // Entry at close 98.0: 50% of $10_000 equity buys 51 shares
        let position = runner.controller.open_position().unwrap();
        assert_eq!(position.quantity, dec!(51));
        assert_eq!(broker.cash().await, dec!(10000) - dec!(51) * dec!(98.0));
        assert_eq!(runner.stats.entries, 1);
    }

    #[tokio::test]
    async fn test_stop_loss_exit_realizes_loss() {
        let mut bars = decline_bars(21);
        bars.push(bar_at(21, dec!(95.0))); // pierces the 3% stop from 98

        let (mut runner, _broker) = runner_with(bars, RunnerConfig::default());
        for _ in 0..22 {
            runner.tick().await.unwrap();
        }

        assert!(runner.controller.open_position().is_none());
        assert_eq!(runner.stats.exits, 1);
        assert_eq!(runner.stats.realized_pnl, dec!(-153.0));
    }

    #[tokio::test]
    async fn test_dry_run_never_touches_broker() {
        let config = RunnerConfig {
            dry_run: true,
            ..RunnerConfig::default()
        };
        let (mut runner, broker) = runner_with(decline_bars(25), config);

        for _ in 0..25 {
            runner.tick().await.unwrap();
        }

        assert!(runner.controller.open_position().is_none());
        assert_eq!(broker.cash().await, dec!(10000));
        assert_eq!(runner.stats.entries, 0);
    }

    #[tokio::test]
    async fn test_exhausted_feed_signals_halt() {
        let config = RunnerConfig {
            halt_when_exhausted: true,
            ..RunnerConfig::default()
        };
        let (mut runner, _broker) = runner_with(decline_bars(2), config);

        assert!(runner.tick().await.unwrap());
        assert!(runner.tick().await.unwrap());
        assert!(!runner.tick().await.unwrap());
    }

    #[tokio::test]
    async fn test_reports_drop_when_observer_lags() {
        let (sender, mut receiver) = mpsc::channel(1);
        let (runner, _broker) = runner_with(decline_bars(3), RunnerConfig::default());
        let mut runner = runner.with_reports(sender);

        for _ in 0..3 {
            runner.tick().await.unwrap();
        }

        // Capacity 1: the first report sticks, later ones are dropped
        let report = receiver.try_recv().unwrap();
        assert_eq!(report.symbol, "AAPL");
        assert!(receiver.try_recv().is_err());
    }
}
