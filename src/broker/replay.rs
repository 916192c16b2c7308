//! Bar replay from a CSV recording.
//!
//! Expected header: `timestamp,open,high,low,close,volume` with RFC 3339
//! timestamps. Each `latest_bar` call yields the next row, so one feed drives
//! exactly one evaluation loop.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::MarketData;
use crate::models::PriceBar;

pub struct CsvBarFeed {
    symbol: String,
    bars: Vec<PriceBar>,
    cursor: Mutex<usize>,
}

impl CsvBarFeed {
    pub fn from_path(symbol: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open bar file {}", path.display()))?;

        let mut bars = Vec::new();
        for row in reader.deserialize() {
            let bar: PriceBar = row.with_context(|| format!("bad bar row in {}", path.display()))?;
            bars.push(bar);
        }

        let symbol = symbol.into();
        info!(symbol = %symbol, bars = bars.len(), path = %path.display(), "Loaded bar recording");
        Ok(Self {
            symbol,
            bars,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[async_trait]
impl MarketData for CsvBarFeed {
    async fn latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>> {
        if symbol != self.symbol {
            return Ok(None);
        }
        let mut cursor = self.cursor.lock().await;
        match self.bars.get(*cursor) {
            Some(bar) => {
                *cursor += 1;
                Ok(Some(bar.clone()))
            }
            None => Ok(None),
        }
    }
}
