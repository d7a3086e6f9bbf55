use super::types::PoolHandle;
use crate::data_sync::{VenueDescriptor, VenueError, VenueSource};
use crate::utils::cache::PoolCache;
use alloy_primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Locates the pool of a token pair on a venue.
///
/// Lookups are side-effect free apart from the optional pool cache, so one resolver is shared
/// across concurrent aggregations.
pub struct PoolResolver<S: ?Sized> {
    source: Arc<S>,
    cache: Option<PoolCache>,
}

impl<S: VenueSource + ?Sized> PoolResolver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source, cache: None }
    }

    /// Remember pool lookups (found and not found) for `ttl`.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(PoolCache::new(ttl));
        self
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn cache(&self) -> Option<&PoolCache> {
        self.cache.as_ref()
    }

    /// Resolve the pool for `(token_a, token_b)` on `venue`.
    ///
    /// `Ok(None)` means the venue has no pool for the pair. The result does not depend on the
    /// argument order.
    pub async fn resolve(&self, venue: &VenueDescriptor, token_a: Address, token_b: Address) -> Result<Option<PoolHandle>, VenueError> {
        if token_a == token_b {
            return Ok(None);
        }
        let (token0, token1) = sort_tokens(token_a, token_b);

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(venue.factory, token0, token1)) {
            return Ok(cached);
        }

        let handle = self.lookup(venue, token0, token1).await?;

        if let Some(cache) = &self.cache {
            cache.insert(venue.factory, token0, token1, handle.clone());
        }
        Ok(handle)
    }

    async fn lookup(&self, venue: &VenueDescriptor, token0: Address, token1: Address) -> Result<Option<PoolHandle>, VenueError> {
        let Some(pair) = self.source.get_pair(venue.factory, token0, token1).await? else {
            debug!("{}: no pool for {:#}/{:#}", venue.name, token0, token1);
            return Ok(None);
        };

        // The pool's own order is authoritative for decoding reserves.
        let (pool_token0, pool_token1) = self.source.get_pair_tokens(pair).await?;
        let expected = [token0, token1];
        if !expected.contains(&pool_token0) || !expected.contains(&pool_token1) || pool_token0 == pool_token1 {
            return Err(VenueError::Decode(format!("pool {pair:#} holds {pool_token0:#}/{pool_token1:#}, not the requested pair")));
        }

        Ok(Some(PoolHandle::new(venue.factory, pair, pool_token0, pool_token1)))
    }

    pub fn invalidate(&self, venue: &VenueDescriptor, token_a: Address, token_b: Address) {
        if let Some(cache) = &self.cache {
            cache.invalidate(venue.factory, token_a, token_b);
        }
    }

    pub fn invalidate_venue(&self, venue: &VenueDescriptor) {
        if let Some(cache) = &self.cache {
            cache.invalidate_factory(venue.factory);
        }
    }
}

/// Uniswap V2 factories key pairs by ascending address.
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) }
}
