//! Market data abstractions for crypto prices

use crate::core::metadata::CurrencyMetadata;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single point of a price series: unix timestamp in milliseconds and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(pub i64, pub f64);

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Top `limit` coins by market cap.
    async fn top_markets(&self, limit: usize) -> Result<Vec<CurrencyMetadata>>;

    /// Current price of `id` quoted in `vs_currency`. `Ok(None)` when the
    /// provider answers without a numeric price for the pair.
    async fn simple_price(&self, id: &str, vs_currency: &str) -> Result<Option<f64>>;

    /// Price series for the last `days` days.
    async fn market_chart(&self, id: &str, vs_currency: &str, days: u32)
    -> Result<Vec<PricePoint>>;
}
