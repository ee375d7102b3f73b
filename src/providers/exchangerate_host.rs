use super::util::{build_url, fetch_json};
use crate::core::currency::FiatRateProvider;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// exchangerate.host public rates, the last resort of the chain.
pub struct ExchangeRateHostProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        ExchangeRateHostProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[async_trait]
impl FiatRateProvider for ExchangeRateHostProvider {
    fn name(&self) -> &'static str {
        "exchangerate.host"
    }

    #[instrument(name = "ExchangeRateHostRate", skip(self))]
    async fn usd_rate(&self, code: &str) -> Result<Option<f64>> {
        let url = build_url(
            &self.base_url,
            &["latest"],
            &[("base", "USD"), ("symbols", code)],
        )?;
        debug!("Requesting public rate for {}", code);

        let data: LatestResponse = fetch_json(self.client.get(url), &format!("USD/{code}")).await?;
        if !data.success {
            return Ok(None);
        }
        Ok(data.rates.get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::util::http_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "JPY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_public_rate() {
        let mock_server =
            create_mock_server(r#"{"success": true, "base": "USD", "rates": {"JPY": 149.5}}"#)
                .await;
        let provider = ExchangeRateHostProvider::new(&mock_server.uri(), http_client().unwrap());

        let rate = provider.usd_rate("JPY").await.unwrap();
        assert_eq!(rate, Some(149.5));
    }

    #[tokio::test]
    async fn test_success_flag_required() {
        let mock_server = create_mock_server(r#"{"rates": {"JPY": 149.5}}"#).await;
        let provider = ExchangeRateHostProvider::new(&mock_server.uri(), http_client().unwrap());

        let rate = provider.usd_rate("JPY").await.unwrap();
        assert_eq!(rate, None);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let provider =
            ExchangeRateHostProvider::new("http://127.0.0.1:9", http_client().unwrap());

        let result = provider.usd_rate("JPY").await;
        assert!(result.unwrap_err().to_string().starts_with("Request error"));
    }
}
