//! Fiat exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;

/// A source of USD based fiat exchange rates.
#[async_trait]
pub trait FiatRateProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Units of `code` per one USD. `code` is uppercase. `Ok(None)` means the
    /// provider answered but had no rate for `code`.
    async fn usd_rate(&self, code: &str) -> Result<Option<f64>>;
}
