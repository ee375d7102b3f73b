//! USD to fiat rate resolution over an ordered chain of providers

use crate::core::config::ProvidersConfig;
use crate::core::currency::FiatRateProvider;
use crate::providers::currencylayer::CurrencyLayerProvider;
use crate::providers::exchangerate_host::ExchangeRateHostProvider;
use crate::providers::exchangerates_api::ExchangeRatesApiProvider;
use tracing::{debug, info, instrument, warn};

/// Tries each provider in order and returns the first usable rate.
pub struct FiatRateResolver {
    providers: Vec<Box<dyn FiatRateProvider>>,
}

impl FiatRateResolver {
    pub fn new(providers: Vec<Box<dyn FiatRateProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from configuration. Keyed providers are left out of
    /// the chain entirely when their key is not set.
    pub fn from_config(config: &ProvidersConfig, client: &reqwest::Client) -> Self {
        let mut providers: Vec<Box<dyn FiatRateProvider>> = Vec::new();

        if let Some(key) = config.currencylayer.api_key() {
            providers.push(Box::new(CurrencyLayerProvider::new(
                &config.currencylayer.base_url,
                key,
                client.clone(),
            )));
        }
        if let Some(key) = config.exchangerates_api.api_key() {
            providers.push(Box::new(ExchangeRatesApiProvider::new(
                &config.exchangerates_api.base_url,
                key,
                client.clone(),
            )));
        }
        providers.push(Box::new(ExchangeRateHostProvider::new(
            &config.exchangerate_host.base_url,
            client.clone(),
        )));

        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        info!(?names, "Fiat rate provider chain");
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Units of `code` per one USD, or `None` when every provider failed.
    #[instrument(name = "UsdToFiat", skip(self))]
    pub async fn usd_to_fiat(&self, code: &str) -> Option<f64> {
        let code = code.trim().to_uppercase();
        for provider in &self.providers {
            match provider.usd_rate(&code).await {
                Ok(Some(rate)) if rate.is_finite() && rate > 0.0 => {
                    debug!(provider = provider.name(), rate, "Resolved fiat rate");
                    return Some(rate);
                }
                Ok(_) => {
                    warn!(provider = provider.name(), %code, "No rate from provider");
                }
                Err(e) => {
                    warn!(provider = provider.name(), %code, error = %e, "Fiat rate provider failed");
                }
            }
        }
        warn!(%code, "All fiat rate providers exhausted");
        None
    }

    /// USD per one unit of `code`.
    pub async fn fiat_to_usd(&self, code: &str) -> Option<f64> {
        self.usd_to_fiat(code).await.map(|rate| 1.0 / rate)
    }
}
