//! Cycle orchestration: one bar in, one decision out.
//!
//! `StrategyController` owns the bar window, the open-position slot, and the
//! daily risk counters. `evaluate` is pure with respect to the position: it
//! proposes entries and exits but only `confirm_entry`/`confirm_exit` (called
//! after the broker acknowledges a fill) change what the controller believes
//! it holds. Feeding the same bar sequence through a fresh controller always
//! reproduces the same decisions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::analysis::{IndicatorConfig, IndicatorEngine, LevelConfig, LevelDetector};
use crate::error::EngineError;
use crate::events::{CycleReport, Decision, PositionState};
use crate::models::{trading_day, BarWindow, DailyRiskCounters, Position, PriceBar, SignalDirection};

use super::{
    ModeParameters, OverrideSettings, PortfolioResolver, PositionSizer, RiskManager, RiskVerdict,
    SignalConfig, SignalGenerator, SizingOutcome,
};

// ==================== Configuration ====================

/// Static controller configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub symbol: String,

    /// Bars retained for analysis. Must cover the indicator warm-up.
    pub window_capacity: usize,

    pub indicators: IndicatorConfig,
    pub levels: LevelConfig,
    pub signals: SignalConfig,

    /// Decimal places for order quantities. 0 = whole shares.
    pub quantity_precision: u32,

    /// Exchange clock offset from UTC, for daily counter rollover.
    pub day_offset_hours: i32,
}

impl ControllerConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            window_capacity: 50,
            indicators: IndicatorConfig::default(),
            levels: LevelConfig::default(),
            signals: SignalConfig::default(),
            quantity_precision: 0,
            day_offset_hours: -5,
        }
    }
}

/// Everything one evaluation cycle needs from the outside world.
#[derive(Debug, Clone)]
pub struct CycleInput {
    /// Latest bar, if the feed produced one.
    pub bar: Option<PriceBar>,

    /// Live account equity, if the broker reported one.
    pub equity: Option<Decimal>,

    pub params: ModeParameters,
    pub overrides: OverrideSettings,

    /// Wall clock (or replay clock) for daily rollover.
    pub now: DateTime<Utc>,
}

// ==================== Controller ====================

pub struct StrategyController {
    config: ControllerConfig,
    indicators: IndicatorEngine,
    detector: LevelDetector,
    signals: SignalGenerator,
    sizer: PositionSizer,
    risk: RiskManager,
    resolver: PortfolioResolver,
    window: BarWindow,
    position: Option<Position>,
    counters: DailyRiskCounters,
}

impl StrategyController {
    pub fn new(config: ControllerConfig) -> Result<Self, EngineError> {
        let indicators = IndicatorEngine::new(config.indicators.clone())?;
        if config.window_capacity < indicators.min_bars() {
            return Err(EngineError::InvalidConfig(format!(
                "window capacity {} below indicator warm-up of {} bars",
                config.window_capacity,
                indicators.min_bars()
            )));
        }

        let day = trading_day(Utc::now(), config.day_offset_hours);
        Ok(Self {
            indicators,
            detector: LevelDetector::new(config.levels.clone()),
            signals: SignalGenerator::new(config.signals.clone()),
            sizer: PositionSizer::new(config.quantity_precision),
            risk: RiskManager::new(),
            resolver: PortfolioResolver::new(),
            window: BarWindow::new(config.window_capacity),
            position: None,
            counters: DailyRiskCounters::new(day),
            config,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn last_close(&self) -> Option<Decimal> {
        self.window.last().map(|b| b.close)
    }

    pub fn counters(&self) -> &DailyRiskCounters {
        &self.counters
    }

    /// Run one evaluation cycle. Never fails: feed problems and rejected
    /// proposals degrade to `Hold` or `Blocked` decisions in the report.
    pub fn evaluate(&mut self, input: CycleInput) -> CycleReport {
        self.counters
            .roll(trading_day(input.now, self.config.day_offset_hours));

        let Some(bar) = input.bar else {
            return self.report(
                input.now,
                Decision::Hold {
                    reason: "no market data".to_string(),
                },
                self.resolver.last_valid(),
                Vec::new(),
            );
        };

        let timestamp = bar.timestamp;
        let close = bar.close;

        if let Err(err) = self.window.push(bar.clone()) {
            warn!(symbol = %self.config.symbol, error = %err, "Rejected bar");
            return self.report(
                input.now,
                Decision::Hold {
                    reason: format!("rejected bar: {err}"),
                },
                self.resolver.last_valid(),
                vec![err.to_string()],
            );
        }

        let snapshot = self.indicators.compute(&self.window);
        let levels = self.detector.detect(&self.window);

        let resolution = self.resolver.resolve(input.equity, &input.overrides);
        let warnings: Vec<String> = resolution.warning.into_iter().collect();

        let decision = match &self.position {
            Some(position) => {
                // Risk prices outrank any vote to keep holding
                if let Some(breach) = self.risk.check_position(position, close) {
                    info!(
                        symbol = %self.config.symbol,
                        kind = %breach,
                        close = %close,
                        "Forced exit"
                    );
                    Decision::Exit {
                        reason: breach.to_string(),
                        price: close,
                    }
                } else {
                    let signal = self.signals.exit_signal(&snapshot, &levels, &bar, &input.params);
                    if signal.direction == SignalDirection::ExitLong {
                        Decision::Exit {
                            reason: signal.reason(),
                            price: close,
                        }
                    } else {
                        Decision::Hold {
                            reason: "holding position".to_string(),
                        }
                    }
                }
            }
            None => {
                let signal = self.signals.entry_signal(&snapshot, &levels, &bar, &input.params);
                if signal.direction == SignalDirection::EnterLong {
                    match self.risk.validate_entry(
                        &self.counters,
                        &input.params,
                        resolution.capital_base,
                    ) {
                        RiskVerdict::Blocked { reason } => Decision::Blocked { reason },
                        RiskVerdict::Approved => match self.sizer.size_order(
                            resolution.capital_base,
                            &input.params,
                            &input.overrides,
                            close,
                        ) {
                            SizingOutcome::Sized { quantity, notional } => Decision::Enter {
                                quantity,
                                notional,
                                price: close,
                            },
                            SizingOutcome::InsufficientCapital => Decision::Blocked {
                                reason: "insufficient capital for a single share".to_string(),
                            },
                        },
                    }
                } else {
                    Decision::Hold {
                        reason: signal.reason(),
                    }
                }
            }
        };

        self.report(timestamp, decision, resolution.capital_base, warnings)
    }

    fn report(
        &self,
        timestamp: DateTime<Utc>,
        decision: Decision,
        capital_base: Decimal,
        warnings: Vec<String>,
    ) -> CycleReport {
        let position_state = if self.position.is_some() {
            PositionState::InPosition
        } else {
            PositionState::Idle
        };
        CycleReport {
            symbol: self.config.symbol.clone(),
            timestamp,
            decision,
            position_state,
            capital_base,
            warnings,
        }
    }

    /// Record a confirmed entry fill. Counts against the daily trade cap.
    pub fn confirm_entry(
        &mut self,
        quantity: Decimal,
        fill_price: Decimal,
        params: &ModeParameters,
        now: DateTime<Utc>,
    ) {
        let position = Position::open(
            &self.config.symbol,
            quantity,
            fill_price,
            now,
            params.stop_loss_pct,
            params.take_profit_pct,
        );
        info!(
            symbol = %self.config.symbol,
            quantity = %quantity,
            entry = %fill_price,
            stop = %position.stop_loss_price,
            take = %position.take_profit_price,
            "Position opened"
        );
        self.position = Some(position);
        self.counters.record_trade();
    }

    /// Immediate exit intent at the newest close, for shutdown flattening.
    /// `None` when idle or before any bar has arrived.
    pub fn emergency_close(&self) -> Option<Decision> {
        self.position.as_ref()?;
        let price = self.last_close()?;
        Some(Decision::Exit {
            reason: "emergency close".to_string(),
            price,
        })
    }

    /// Record a confirmed exit fill and return the realized PnL.
    pub fn confirm_exit(&mut self, fill_price: Decimal) -> Decimal {
        let pnl = self
            .position
            .take()
            .map(|p| p.unrealized_pnl(fill_price))
            .unwrap_or(Decimal::ZERO);
        self.counters.record_pnl(pnl);
        info!(symbol = %self.config.symbol, pnl = %pnl, "Position closed");
        pnl
    }
}

// ==================== Tests ====================
