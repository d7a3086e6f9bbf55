use super::aggregator::{QuoteError, RouteAggregator, VenueScan};
use super::resolver::PoolResolver;
use super::types::{Quote, RouteSelection};
use crate::data_sync::{SwapRouterConfig, VenueDescriptor, VenueRegistry, VenueSource};
use crate::utils::constants::DEFAULT_SLIPPAGE_BPS;
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// QuoteEngine is the caller-facing side of the logic layer.
///
/// It owns the venue registry and the aggregator built over one venue source, and answers
/// `get_quotes` / `best_route`. Queries are read-only and may run concurrently.
pub struct QuoteEngine<S: ?Sized> {
    registry: VenueRegistry,
    aggregator: RouteAggregator<S>,
    default_slippage_bps: u64,
}

impl<S: VenueSource + ?Sized> QuoteEngine<S> {
    pub fn new(registry: VenueRegistry, aggregator: RouteAggregator<S>, default_slippage_bps: u64) -> Self {
        info!(
            "Quote engine over {} venues ({} executable), venue timeout {:?}",
            registry.len(),
            registry.iter().filter(|venue| venue.router.is_some()).count(),
            aggregator.venue_timeout()
        );
        Self { registry, aggregator, default_slippage_bps }
    }

    pub fn registry(&self) -> &VenueRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &RouteAggregator<S> {
        &self.aggregator
    }

    pub fn default_slippage_bps(&self) -> u64 {
        self.default_slippage_bps
    }

    /// Quotes from every configured venue, best first.
    pub async fn get_quotes(&self, token_in: Address, token_out: Address, amount_in: U256) -> Result<Vec<Quote>, QuoteError> {
        self.aggregator.get_quotes(token_in, token_out, amount_in, &self.registry).await
    }

    /// Per-venue report of one aggregation pass.
    pub async fn scan(&self, token_in: Address, token_out: Address, amount_in: U256) -> Vec<VenueScan> {
        self.aggregator.scan(token_in, token_out, amount_in, &self.registry).await
    }

    /// Best quote among venues that have a router, ready for execution. `None` is "no route".
    pub async fn best_route(&self, token_in: Address, token_out: Address, amount_in: U256) -> Result<Option<RouteSelection>, QuoteError> {
        let executable: Vec<VenueDescriptor> = self.registry.iter().filter(|venue| venue.router.is_some()).cloned().collect();
        let quotes = self.aggregator.get_quotes(token_in, token_out, amount_in, &executable).await?;

        let Some(best) = quotes.into_iter().next() else {
            debug!("No executable route for {:#} -> {:#}", token_in, token_out);
            return Ok(None);
        };
        // only venues with a router were scanned
        Ok(RouteSelection::for_quote(best, &self.registry).ok())
    }

    /// Mid price of `token_in` in `token_out` on the named venue, scaled by 1e18.
    pub async fn get_price(&self, venue: &str, token_in: Address, token_out: Address) -> Result<Option<U256>, QuoteError> {
        let venue = self.venue(venue)?;
        self.aggregator.venue_price(venue, token_in, token_out).await
    }

    /// Size-aware quote from the named venue only.
    pub async fn quote_venue(&self, venue: &str, token_in: Address, token_out: Address, amount_in: U256) -> Result<Option<Quote>, QuoteError> {
        let venue = self.venue(venue)?;
        self.aggregator.venue_quote(venue, token_in, token_out, amount_in).await
    }

    fn venue(&self, name: &str) -> Result<&VenueDescriptor, QuoteError> {
        self.registry.get(name).ok_or_else(|| QuoteError::UnknownVenue(name.to_string()))
    }

    /// Drop expired pool lookups. Returns how many were evicted.
    pub fn cleanup_pools(&self) -> usize {
        self.aggregator.resolver().cache().map(|cache| cache.cleanup_expired()).unwrap_or_default()
    }

    /// Forget every cached pool lookup.
    pub fn invalidate_pools(&self) {
        if let Some(cache) = self.aggregator.resolver().cache() {
            cache.clear();
        }
    }

    pub fn get_statistics(&self) -> QuoteEngineStats {
        let cache = self.aggregator.resolver().cache();
        QuoteEngineStats {
            venue_count: self.registry.len(),
            executable_venue_count: self.registry.iter().filter(|venue| venue.router.is_some()).count(),
            venue_timeout: self.aggregator.venue_timeout(),
            pool_cache_enabled: cache.is_some(),
            pool_cache_entries: cache.map(|cache| cache.len()).unwrap_or_default(),
            pool_cache_hit_rate: cache.map(|cache| cache.stats.hit_rate()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteEngineStats {
    pub venue_count: usize,
    pub executable_venue_count: usize,
    pub venue_timeout: Duration,
    pub pool_cache_enabled: bool,
    pub pool_cache_entries: usize,
    pub pool_cache_hit_rate: f64,
}

/// Builder pattern for creating and configuring a QuoteEngine
pub struct QuoteEngineBuilder<S: ?Sized> {
    source: Arc<S>,
    registry: VenueRegistry,
    venue_timeout: Duration,
    pool_cache_ttl: Option<Duration>,
    default_slippage_bps: u64,
}

impl<S: VenueSource + ?Sized> QuoteEngineBuilder<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            registry: VenueRegistry::ethereum_mainnet(),
            venue_timeout: Duration::from_millis(2_000),
            pool_cache_ttl: None,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }

    pub fn with_registry(mut self, registry: VenueRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_venue_timeout(mut self, timeout: Duration) -> Self {
        self.venue_timeout = timeout;
        self
    }

    pub fn with_pool_cache(mut self, ttl: Duration) -> Self {
        self.pool_cache_ttl = Some(ttl);
        self
    }

    pub fn with_default_slippage_bps(mut self, slippage_bps: u64) -> Self {
        self.default_slippage_bps = slippage_bps;
        self
    }

    pub fn with_config(mut self, config: &SwapRouterConfig) -> Self {
        self.registry = config.registry.clone();
        self.venue_timeout = config.aggregator.venue_timeout();
        self.pool_cache_ttl = config.aggregator.pool_cache_ttl();
        self.default_slippage_bps = config.aggregator.default_slippage_bps;
        self
    }

    pub fn build(self) -> QuoteEngine<S> {
        let mut resolver = PoolResolver::new(self.source);
        if let Some(ttl) = self.pool_cache_ttl {
            resolver = resolver.with_cache(ttl);
        }
        let aggregator = RouteAggregator::new(Arc::new(resolver), self.venue_timeout);
        QuoteEngine::new(self.registry, aggregator, self.default_slippage_bps)
    }
}
