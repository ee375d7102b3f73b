//! Crypto/fiat conversion with direct lookup and USD mediated fallback

use crate::core::cache::CryptoSymbolCache;
use crate::core::market::{MarketDataProvider, PricePoint};
use crate::core::metadata::FiatTable;
use crate::core::rates::FiatRateResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const HISTORY_DAYS: u32 = 7;

/// How the quoted price was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Direct,
    ViaUsd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub converted: f64,
    pub price: f64,
    pub history: Vec<PricePoint>,
    pub source: RateSource,
}

/// Failures reported back to the caller. Provider errors never surface here;
/// they only push the conversion onto its next strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Invalid currency pair")]
    InvalidCurrencyPair,
    #[error("Conversion failed")]
    ConversionFailed,
}

/// One side of a requested pair after classification.
#[derive(Debug, Clone)]
struct Leg {
    id: String,
    crypto: bool,
    fiat: bool,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn parse_amount(raw: &str) -> Result<f64, ConversionError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or(ConversionError::InvalidAmount)
}

pub struct Converter {
    markets: Arc<dyn MarketDataProvider>,
    crypto: Arc<CryptoSymbolCache>,
    fiat: Arc<FiatTable>,
    rates: Arc<FiatRateResolver>,
}

impl Converter {
    pub fn new(
        markets: Arc<dyn MarketDataProvider>,
        crypto: Arc<CryptoSymbolCache>,
        fiat: Arc<FiatTable>,
        rates: Arc<FiatRateResolver>,
    ) -> Self {
        Self {
            markets,
            crypto,
            fiat,
            rates,
        }
    }

    #[instrument(name = "Convert", skip(self))]
    pub async fn convert(
        &self,
        base: &str,
        target: &str,
        amount: &str,
    ) -> Result<ConversionResult, ConversionError> {
        let amount = parse_amount(amount)?;

        let (base, target) = self.classify(base, target).await;
        info!(amount, base = %base.id, target = %target.id, "Attempting conversion");

        // Whichever side is crypto is priced in whichever side is fiat,
        // preferring the target as the quote currency.
        let crypto_id = if base.crypto { &base.id } else { &target.id };
        let quote = if target.fiat { &target.id } else { &base.id };

        let (price, source) = match self.direct_price(crypto_id, quote).await {
            Some(price) => (price, RateSource::Direct),
            None => {
                warn!("Direct price not found, trying USD fallback");
                let price = self.via_usd(&base, &target).await?;
                (price, RateSource::ViaUsd)
            }
        };

        if !price.is_finite() {
            return Err(ConversionError::ConversionFailed);
        }
        let converted = round_to(price * amount, 6);
        if !converted.is_finite() {
            warn!(price, amount, "Converted amount overflowed");
            return Err(ConversionError::InvalidAmount);
        }
        let history = self.history(crypto_id, quote).await;

        Ok(ConversionResult {
            converted,
            price: round_to(price, 6),
            history,
            source,
        })
    }

    async fn classify(&self, base: &str, target: &str) -> (Leg, Leg) {
        let coins = self.crypto.get().await;
        let leg = |raw: &str| {
            let id = raw.trim().to_lowercase();
            Leg {
                crypto: coins.contains_key(&id),
                fiat: self.fiat.contains(&id),
                id,
            }
        };
        let (base, target) = (leg(base), leg(target));
        debug!(?base, ?target, "Classified currency pair");
        (base, target)
    }

    async fn direct_price(&self, crypto_id: &str, quote: &str) -> Option<f64> {
        if crypto_id.is_empty() || quote.is_empty() {
            return None;
        }
        match self.markets.simple_price(crypto_id, quote).await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, "Direct price fetch failed");
                None
            }
        }
    }

    async fn usd_price(&self, crypto_id: &str) -> Option<f64> {
        match self.markets.simple_price(crypto_id, "usd").await {
            Ok(Some(price)) if price > 0.0 => Some(price),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, crypto_id, "USD price fetch failed");
                None
            }
        }
    }

    async fn via_usd(&self, base: &Leg, target: &Leg) -> Result<f64, ConversionError> {
        if base.crypto && target.fiat {
            let usd_price = self.usd_price(&base.id).await;
            debug!(?usd_price, "USD price");
            let usd_price = usd_price.ok_or(ConversionError::ConversionFailed)?;

            let usd_to_fiat = self.rates.usd_to_fiat(&target.id).await;
            debug!(?usd_to_fiat, "USD to fiat rate");
            let usd_to_fiat = usd_to_fiat.ok_or(ConversionError::ConversionFailed)?;

            Ok(usd_price * usd_to_fiat)
        } else if base.fiat && target.crypto {
            let usd_price = self.usd_price(&target.id).await;
            debug!(?usd_price, "USD price");
            let usd_price = usd_price.ok_or(ConversionError::ConversionFailed)?;

            let fiat_to_usd = self.rates.fiat_to_usd(&base.id).await;
            debug!(?fiat_to_usd, "Fiat to USD rate");
            let fiat_to_usd = fiat_to_usd.ok_or(ConversionError::ConversionFailed)?;

            Ok(fiat_to_usd / usd_price)
        } else {
            Err(ConversionError::InvalidCurrencyPair)
        }
    }

    /// Best effort; any failure yields an empty series.
    async fn history(&self, crypto_id: &str, quote: &str) -> Vec<PricePoint> {
        match self
            .markets
            .market_chart(crypto_id, quote, HISTORY_DAYS)
            .await
        {
            Ok(points) => points
                .into_iter()
                .map(|PricePoint(ts, price)| PricePoint(ts, round_to(price, 4)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "History fetch failed");
                Vec::new()
            }
        }
    }
}
