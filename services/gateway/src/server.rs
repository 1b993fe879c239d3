//! Shared server state (§3). Handlers close over this; it owns the
//! registry, caches, rate limiter, key registry, and ws quota accountant.
//! Each `ChainBackend` owns its own `RelayStateMachine` and
//! `CircuitBreaker` inside `gw_relay::BackendRegistry`.

use std::sync::Arc;
use std::time::Instant;

use gw_breaker::BreakerRegistry;
use gw_cache::CacheStore;
use gw_config::GatewayConfig;
use gw_keystore::KeystoreManager;
use gw_ratelimit::{ApiKeyRegistry, TokenBucketLimiter, WsQuotaAccountant};
use gw_relay::{BackendRegistry, FastpathSnapshot};
use gw_types::{Clock, RandomSource, RealClock};

use crate::middleware::ConcurrencyLimiter;

pub struct Server {
    pub config: GatewayConfig,
    pub admin_key: String,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub started_at: Instant,

    pub api_keys: Arc<ApiKeyRegistry>,
    pub rate_limiter: Arc<TokenBucketLimiter>,
    pub ws_quota: Arc<WsQuotaAccountant>,
    pub breakers: Arc<BreakerRegistry>,
    pub cache: Arc<CacheStore>,
    pub backends: Arc<BackendRegistry>,
    pub keystore: Arc<KeystoreManager>,
    pub concurrency: Arc<ConcurrencyLimiter>,

    pub fastpath_latest: Arc<FastpathSnapshot>,
    pub fastpath_status: Arc<FastpathSnapshot>,
}

impl Server {
    pub fn new(
        config: GatewayConfig,
        random: Arc<dyn RandomSource>,
        keystore: Arc<KeystoreManager>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(RealClock);
        let now = gw_types::unix_now();
        let admin_key = config.server.admin_key.clone();

        Self {
            api_keys: Arc::new(ApiKeyRegistry::new(random.clone(), now)),
            rate_limiter: Arc::new(TokenBucketLimiter::new(clock.clone())),
            ws_quota: Arc::new(WsQuotaAccountant::new(10_000)),
            breakers: Arc::new(BreakerRegistry::new(clock.clone())),
            cache: Arc::new(CacheStore::new(clock.clone(), 10_000)),
            backends: Arc::new(BackendRegistry::new()),
            keystore,
            concurrency: Arc::new(ConcurrencyLimiter::new()),
            fastpath_latest: Arc::new(FastpathSnapshot::empty()),
            fastpath_status: Arc::new(FastpathSnapshot::empty()),
            config,
            admin_key,
            clock,
            random,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
