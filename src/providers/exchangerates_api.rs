use super::util::{build_url, fetch_json};
use crate::core::currency::FiatRateProvider;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// apilayer Exchange Rates Data API. The key travels in the `apikey` header.
pub struct ExchangeRatesApiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExchangeRatesApiProvider {
    pub fn new(base_url: &str, api_key: &str, client: reqwest::Client) -> Self {
        ExchangeRatesApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl FiatRateProvider for ExchangeRatesApiProvider {
    fn name(&self) -> &'static str {
        "exchangerates_data"
    }

    #[instrument(name = "ExchangeRatesApiRate", skip(self))]
    async fn usd_rate(&self, code: &str) -> Result<Option<f64>> {
        let url = build_url(
            &self.base_url,
            &["exchangerates_data", "latest"],
            &[("base", "USD"), ("symbols", code)],
        )?;
        debug!("Requesting latest rate for {}", code);

        let request = self.client.get(url).header("apikey", &self.api_key);
        let data: LatestResponse = fetch_json(request, &format!("USD/{code}")).await?;
        Ok(data.rates.and_then(|rates| rates.get(code).copied()))
    }
}
