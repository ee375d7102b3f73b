use crate::core::{ConversionError, ConversionResult, CurrencyMetadata};
use crate::server::AppState;
use axum::{
    extract::{Json, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::fmt::Write;
use tracing::{debug, info, instrument, warn};

/// Query parameters for /convert
#[derive(Debug, Deserialize, Clone)]
pub struct ConvertQuery {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub target: String,
    /// Defaults to 1 when absent
    pub amount: Option<String>,
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

impl IntoResponse for ConversionError {
    fn into_response(self) -> Response {
        bad_request(self.to_string())
    }
}

/// GET /convert - Convert between a crypto id and a fiat code
///
/// Examples:
/// - /convert?base=bitcoin&target=usd&amount=2
/// - /convert?base=eur&target=ethereum
#[instrument(skip(state))]
pub async fn convert_handler(
    State(state): State<AppState>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> Result<Json<ConversionResult>, Response> {
    let Query(params) = query.map_err(|rejection| {
        warn!(error = %rejection, "Malformed query string");
        bad_request(rejection.body_text())
    })?;
    let amount = params.amount.as_deref().unwrap_or("1");
    match state
        .converter
        .convert(&params.base, &params.target, amount)
        .await
    {
        Ok(result) => {
            info!(
                converted = result.converted,
                source = ?result.source,
                "Conversion succeeded"
            );
            Ok(Json(result))
        }
        Err(e) => {
            warn!(error = %e, "Conversion rejected");
            Err(e.into_response())
        }
    }
}

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET / - Landing page listing the currencies that can be converted
pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let coins = state.crypto.get().await;
    let mut crypto: Vec<&CurrencyMetadata> = coins.values().collect();
    crypto.sort_by(|a, b| a.code.cmp(&b.code));
    let fiat = state.fiat.sorted();
    debug!(crypto = crypto.len(), fiat = fiat.len(), "Rendering landing page");

    Html(render_index(&crypto, &fiat))
}

fn render_index(crypto: &[&CurrencyMetadata], fiat: &[&CurrencyMetadata]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>coinfx</title></head>\n<body>\n\
         <h1>coinfx</h1>\n\
         <p>Convert with <code>/convert?base=bitcoin&amp;target=usd&amp;amount=1</code></p>\n",
    );
    render_section(&mut page, "Crypto", crypto);
    render_section(&mut page, "Fiat", fiat);
    page.push_str("</body>\n</html>\n");
    page
}

fn render_section(page: &mut String, title: &str, entries: &[&CurrencyMetadata]) {
    let _ = writeln!(page, "<h2>{} ({})</h2>\n<ul>", title, entries.len());
    for entry in entries {
        let icon = entry
            .icon
            .as_deref()
            .filter(|icon| icon.starts_with("http"))
            .map(|src| format!("<img src=\"{}\" alt=\"\" width=\"16\"> ", escape(src)))
            .unwrap_or_default();
        let _ = writeln!(
            page,
            "<li>{}<code>{}</code> {}</li>",
            icon,
            escape(&entry.code),
            escape(&entry.name)
        );
    }
    page.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
