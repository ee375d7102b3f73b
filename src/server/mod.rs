pub mod api;

use crate::core::config::AppConfig;
use crate::core::{Converter, CryptoSymbolCache, FiatRateResolver, FiatTable, MarketDataProvider};
use crate::providers::{coingecko::CoinGeckoProvider, util::http_client};
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    pub crypto: Arc<CryptoSymbolCache>,
    pub fiat: Arc<FiatTable>,
}

impl AppState {
    /// Wires providers, caches and the converter from configuration. Fails
    /// when the fiat metadata file cannot be loaded.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fiat = Arc::new(FiatTable::load(&config.fiat_metadata)?);
        let client = http_client()?;

        let markets: Arc<dyn MarketDataProvider> = Arc::new(CoinGeckoProvider::new(
            &config.providers.coingecko.base_url,
            client.clone(),
        ));
        let crypto = Arc::new(CryptoSymbolCache::new(
            Arc::clone(&markets),
            config.crypto_cache.ttl(),
            config.crypto_cache.size,
        ));
        let rates = Arc::new(FiatRateResolver::from_config(&config.providers, &client));
        let converter = Arc::new(Converter::new(
            markets,
            Arc::clone(&crypto),
            Arc::clone(&fiat),
            rates,
        ));

        Ok(AppState {
            converter,
            crypto,
            fiat,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index_handler))
        .route("/convert", get(api::convert_handler))
        .route("/health", get(api::health_handler))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve_on(listener, state).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Registering routes:");
    info!("  GET /");
    info!("  GET /convert?base=bitcoin&target=usd&amount=1");
    info!("  GET /health");
    info!(%addr, "Server listening");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
