//! Market-data and order-execution seams.
//!
//! The engine core never talks to a venue directly; it sees these two traits.
//! `PaperBroker` fills orders against an in-memory ledger and `CsvBarFeed`
//! replays recorded bars, which together make the whole engine runnable
//! without credentials.

mod paper;
mod replay;

pub use paper::PaperBroker;
pub use replay::CsvBarFeed;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Acknowledged fill returned by a broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub fill_price: Decimal,
}

/// Source of price bars for one symbol.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest bar for the symbol, or `None` when the feed has nothing new.
    async fn latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>>;
}

/// Order execution and account state.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Current account equity, or `None` when the venue cannot report one.
    async fn account_equity(&self) -> Result<Option<Decimal>>;

    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderReceipt>;
}
