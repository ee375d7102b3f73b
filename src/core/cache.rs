use crate::core::market::MarketDataProvider;
use crate::core::metadata::CurrencyMetadata;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Source of the current instant. Injected so expiry can be driven by tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Crypto id (lowercase) to display metadata.
pub type CryptoMap = Arc<HashMap<String, CurrencyMetadata>>;

struct Snapshot {
    coins: CryptoMap,
    last_updated: Option<Instant>,
}

/// Lazily refreshed list of the top crypto currencies by market cap.
///
/// The whole map is replaced on refresh, never patched. A failed refresh
/// leaves the cache empty so the next call tries again.
pub struct CryptoSymbolCache {
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    size: usize,
    inner: RwLock<Snapshot>,
}

impl CryptoSymbolCache {
    pub fn new(provider: Arc<dyn MarketDataProvider>, ttl: Duration, size: usize) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock), ttl, size)
    }

    pub fn with_clock(
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        size: usize,
    ) -> Self {
        Self {
            provider,
            clock,
            ttl,
            size,
            inner: RwLock::new(Snapshot {
                coins: Arc::new(HashMap::new()),
                last_updated: None,
            }),
        }
    }

    /// Returns the cached map, refreshing first when it is empty or older
    /// than the TTL. Never fails; an unreachable provider yields an empty map.
    pub async fn get(&self) -> CryptoMap {
        {
            let snapshot = self.inner.read().await;
            if !snapshot.coins.is_empty() && !self.is_stale(snapshot.last_updated) {
                debug!("Crypto cache HIT");
                return Arc::clone(&snapshot.coins);
            }
        }
        debug!("Crypto cache MISS");
        self.force_refresh().await
    }

    pub async fn force_refresh(&self) -> CryptoMap {
        match self.provider.top_markets(self.size).await {
            Ok(listing) => {
                let coins: HashMap<String, CurrencyMetadata> = listing
                    .into_iter()
                    .map(|mut coin| {
                        coin.code = coin.code.to_lowercase();
                        (coin.code.clone(), coin)
                    })
                    .collect();
                let coins = Arc::new(coins);

                let mut snapshot = self.inner.write().await;
                snapshot.coins = Arc::clone(&coins);
                snapshot.last_updated = Some(self.clock.now());
                info!(count = coins.len(), "Refreshed crypto symbol cache");
                coins
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch crypto list");
                let mut snapshot = self.inner.write().await;
                snapshot.coins = Arc::new(HashMap::new());
                Arc::clone(&snapshot.coins)
            }
        }
    }

    fn is_stale(&self, last_updated: Option<Instant>) -> bool {
        match last_updated {
            Some(at) => self.clock.now().saturating_duration_since(at) > self.ttl,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::PricePoint;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    struct MockMarkets {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockMarkets {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockMarkets {
        async fn top_markets(&self, limit: usize) -> Result<Vec<CurrencyMetadata>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(limit, 100);
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow!("connection refused"));
            }
            Ok(vec![
                CurrencyMetadata {
                    code: "Bitcoin".to_string(),
                    name: "Bitcoin".to_string(),
                    icon: Some("btc.png".to_string()),
                },
                CurrencyMetadata {
                    code: "ethereum".to_string(),
                    name: "Ethereum".to_string(),
                    icon: None,
                },
            ])
        }

        async fn simple_price(&self, _id: &str, _vs: &str) -> Result<Option<f64>> {
            unimplemented!()
        }

        async fn market_chart(&self, _id: &str, _vs: &str, _days: u32) -> Result<Vec<PricePoint>> {
            unimplemented!()
        }
    }

    fn setup() -> (Arc<MockMarkets>, Arc<ManualClock>, CryptoSymbolCache) {
        let markets = Arc::new(MockMarkets::new());
        let clock = Arc::new(ManualClock::new());
        let cache = CryptoSymbolCache::with_clock(
            markets.clone(),
            clock.clone(),
            Duration::from_secs(600),
            100,
        );
        (markets, clock, cache)
    }

    #[tokio::test]
    async fn test_first_call_populates_cache() {
        let (markets, _clock, cache) = setup();

        let coins = cache.get().await;
        assert_eq!(coins.len(), 2);
        assert!(coins.contains_key("bitcoin"));
        assert_eq!(coins["bitcoin"].icon.as_deref(), Some("btc.png"));
        assert_eq!(markets.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_within_ttl_reuses_cache() {
        let (markets, clock, cache) = setup();

        cache.get().await;
        clock.advance(Duration::from_secs(599));
        let coins = cache.get().await;

        assert_eq!(coins.len(), 2);
        assert_eq!(markets.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_after_ttl_refreshes_once() {
        let (markets, clock, cache) = setup();

        cache.get().await;
        clock.advance(Duration::from_secs(601));
        cache.get().await;
        assert_eq!(markets.calls.load(Ordering::SeqCst), 2);

        cache.get().await;
        assert_eq!(markets.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_resets_to_empty() {
        let (markets, clock, cache) = setup();

        assert_eq!(cache.get().await.len(), 2);

        markets.failing.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(601));
        assert!(cache.get().await.is_empty());

        // Empty cache is retried on the very next call
        markets.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.get().await.len(), 2);
        assert_eq!(markets.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_ttl() {
        let (markets, _clock, cache) = setup();

        cache.get().await;
        cache.force_refresh().await;
        assert_eq!(markets.calls.load(Ordering::SeqCst), 2);
    }
}
