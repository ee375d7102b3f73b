use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Builds the HTTP client shared by every provider.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("coinfx/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Joins `segments` onto `base_url` and appends `params` as the query string.
/// Segments and parameter values are percent-encoded.
pub fn build_url(base_url: &str, segments: &[&str], params: &[(&str, &str)]) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid provider base URL: {base_url}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Provider base URL cannot have a path: {base_url}"))?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Sends `request` and decodes the JSON body. Transport failures, non-2xx
/// statuses and undecodable bodies are all errors.
pub async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| anyhow!("Request error: {} for {}", e, what))?;

    debug!(status = %response.status(), "Received response for {}", what);
    if !response.status().is_success() {
        return Err(anyhow!("HTTP error: {} for {}", response.status(), what));
    }

    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to get response text for {what}"))?;

    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", what, e))
}
