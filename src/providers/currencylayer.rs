use super::util::{build_url, fetch_json};
use crate::core::currency::FiatRateProvider;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// currencylayer.com live quotes. Requires an access key.
pub struct CurrencyLayerProvider {
    base_url: String,
    access_key: String,
    client: reqwest::Client,
}

impl CurrencyLayerProvider {
    pub fn new(base_url: &str, access_key: &str, client: reqwest::Client) -> Self {
        CurrencyLayerProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    quotes: HashMap<String, f64>,
}

#[async_trait]
impl FiatRateProvider for CurrencyLayerProvider {
    fn name(&self) -> &'static str {
        "currencylayer"
    }

    #[instrument(name = "CurrencyLayerRate", skip(self))]
    async fn usd_rate(&self, code: &str) -> Result<Option<f64>> {
        let url = build_url(
            &self.base_url,
            &["live"],
            &[
                ("access_key", self.access_key.as_str()),
                ("currencies", code),
                ("format", "1"),
            ],
        )?;
        debug!("Requesting live quote for {}", code);

        let data: LiveResponse = fetch_json(self.client.get(url), &format!("USD{code}")).await?;
        if !data.success {
            debug!("Quote request for {} was not successful", code);
            return Ok(None);
        }
        Ok(data.quotes.get(&format!("USD{code}")).copied())
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
            .and(path("/live"))
            .and(query_param("access_key", "secret"))
            .and(query_param("currencies", "EUR"))
            .and(query_param("format", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> CurrencyLayerProvider {
        CurrencyLayerProvider::new(&mock_server.uri(), "secret", http_client().unwrap())
    }

    #[tokio::test]
    async fn test_live_quote() {
        let mock_server =
            create_mock_server(r#"{"success": true, "source": "USD", "quotes": {"USDEUR": 0.91}}"#)
                .await;

        let rate = provider(&mock_server).usd_rate("EUR").await.unwrap();
        assert_eq!(rate, Some(0.91));
    }

    #[tokio::test]
    async fn test_unsuccessful_response() {
        let mock_server = create_mock_server(
            r#"{"success": false, "error": {"code": 101, "info": "invalid access key"}}"#,
        )
        .await;

        let rate = provider(&mock_server).usd_rate("EUR").await.unwrap();
        assert_eq!(rate, None);
    }

    #[tokio::test]
    async fn test_missing_quote_key() {
        let mock_server =
            create_mock_server(r#"{"success": true, "quotes": {"USDGBP": 0.79}}"#).await;

        let rate = provider(&mock_server).usd_rate("EUR").await.unwrap();
        assert_eq!(rate, None);
    }
}
