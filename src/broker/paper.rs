//! In-memory broker that fills every order instantly at the requested price.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{Broker, OrderReceipt, OrderSide};

#[derive(Debug, Clone)]
struct Holding {
    quantity: Decimal,
    avg_price: Decimal,
}

#[derive(Debug)]
struct PaperState {
    cash: Decimal,
    holdings: HashMap<String, Holding>,
}

/// Paper-trading broker backed by a cash + holdings ledger.
///
/// Equity marks holdings at cost basis; the engine cares about fills and
/// cash limits, not mark-to-market accounting.
pub struct PaperBroker {
    state: RwLock<PaperState>,
}

impl PaperBroker {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            state: RwLock::new(PaperState {
                cash: starting_cash,
                holdings: HashMap::new(),
            }),
        }
    }

    pub async fn cash(&self) -> Decimal {
        self.state.read().await.cash
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn account_equity(&self) -> Result<Option<Decimal>> {
        let state = self.state.read().await;
        let held: Decimal = state
            .holdings
            .values()
            .map(|h| h.quantity * h.avg_price)
            .sum();
        Ok(Some(state.cash + held))
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderReceipt> {
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            bail!("order must have positive quantity and price");
        }

        let mut state = self.state.write().await;
        let notional = quantity * price;

        match side {
            OrderSide::Buy => {
                if notional > state.cash {
                    bail!(
                        "insufficient cash: need {} but have {}",
                        notional,
                        state.cash
                    );
                }
                state.cash -= notional;
                let holding = state.holdings.entry(symbol.to_string()).or_insert(Holding {
                    quantity: Decimal::ZERO,
                    avg_price: Decimal::ZERO,
                });
                let total_cost = holding.quantity * holding.avg_price + notional;
                holding.quantity += quantity;
                holding.avg_price = total_cost / holding.quantity;
            }
            OrderSide::Sell => {
                let holding = state
                    .holdings
                    .get_mut(symbol)
                    .filter(|h| h.quantity >= quantity);
                let Some(holding) = holding else {
                    bail!("insufficient holdings of {} to sell {}", symbol, quantity);
                };
                holding.quantity -= quantity;
                state.cash += notional;
                if state.holdings[symbol].quantity.is_zero() {
                    state.holdings.remove(symbol);
                }
            }
        }

        let receipt = OrderReceipt {
            order_id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            fill_price: price,
        };
        info!(
            order_id = %receipt.order_id,
            symbol = symbol,
            side = ?side,
            quantity = %quantity,
            price = %price,
            cash = %state.cash,
            "Paper fill"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_round_trip_restores_cash() {
        let broker = PaperBroker::new(dec!(10000));

        broker
            .submit_order("AAPL", OrderSide::Buy, dec!(25), dec!(100))
            .await
            .unwrap();
        assert_eq!(broker.cash().await, dec!(7500));
        assert_eq!(broker.account_equity().await.unwrap(), Some(dec!(10000)));

        broker
            .submit_order("AAPL", OrderSide::Sell, dec!(25), dec!(102))
            .await
            .unwrap();
        assert_eq!(broker.cash().await, dec!(10050));
    }

    #[tokio::test]
    async fn test_buy_rejected_without_cash() {
        let broker = PaperBroker::new(dec!(100));
        let result = broker
            .submit_order("AAPL", OrderSide::Buy, dec!(5), dec!(100))
            .await;
        assert!(result.is_err());
        // Ledger untouched after the rejection
        assert_eq!(broker.cash().await, dec!(100));
    }

    #[tokio::test]
    async fn test_sell_rejected_without_holdings() {
        let broker = PaperBroker::new(dec!(10000));
        let result = broker
            .submit_order("AAPL", OrderSide::Sell, dec!(1), dec!(100))
            .await;
        assert!(result.is_err());
    }
}
