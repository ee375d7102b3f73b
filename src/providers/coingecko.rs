use super::util::{build_url, fetch_json};
use crate::core::market::{MarketDataProvider, PricePoint};
use crate::core::metadata::CurrencyMetadata;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// CoinGecko market data client.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    id: String,
    name: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoMarkets", skip(self))]
    async fn top_markets(&self, limit: usize) -> Result<Vec<CurrencyMetadata>> {
        let per_page = limit.to_string();
        let url = build_url(
            &self.base_url,
            &["coins", "markets"],
            &[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
            ],
        )?;
        debug!("Requesting market listing from {}", url);

        let entries: Vec<MarketEntry> = fetch_json(self.client.get(url), "market listing").await?;
        Ok(entries
            .into_iter()
            .map(|entry| CurrencyMetadata {
                code: entry.id.to_lowercase(),
                name: entry.name,
                icon: entry.image,
            })
            .collect())
    }

    #[instrument(name = "CoinGeckoPrice", skip(self))]
    async fn simple_price(&self, id: &str, vs_currency: &str) -> Result<Option<f64>> {
        let url = build_url(
            &self.base_url,
            &["simple", "price"],
            &[("ids", id), ("vs_currencies", vs_currency)],
        )?;
        debug!("Requesting price from {}", url);

        let data: Value = fetch_json(self.client.get(url), &format!("{id}/{vs_currency}")).await?;
        let price = data
            .get(id)
            .and_then(|quotes| quotes.get(vs_currency))
            .and_then(Value::as_f64);
        debug!(?price, "Simple price");
        Ok(price)
    }

    #[instrument(name = "CoinGeckoChart", skip(self))]
    async fn market_chart(
        &self,
        id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>> {
        let days = days.to_string();
        let url = build_url(
            &self.base_url,
            &["coins", id, "market_chart"],
            &[("vs_currency", vs_currency), ("days", days.as_str())],
        )?;
        debug!("Requesting price history from {}", url);

        let chart: MarketChart = fetch_json(
            self.client.get(url),
            &format!("{id}/{vs_currency} history"),
        )
        .await?;
        Ok(chart
            .prices
            .into_iter()
            .map(|(ts, price)| PricePoint(ts as i64, price))
            .collect())
    }
}
