use super::pricing::{PricingEngine, PricingError};
use super::resolver::PoolResolver;
use super::types::{PoolHandle, Quote};
use crate::data_sync::{Reserves, VenueDescriptor, VenueError, VenueSource};
use alloy_primitives::{Address, U256};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("amount in must be greater than zero")]
    InvalidAmount,
    #[error("token in and token out are the same token {0}")]
    IdenticalTokens(Address),
    #[error("no venue named {0}")]
    UnknownVenue(String),
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// What happened on one venue during a scan. Only `Quoted` contributes to the result; the
/// other branches are dropped so one bad venue never aborts the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenueOutcome {
    Quoted { quote: Quote, reserves: Reserves },
    NoPool,
    Failed(VenueError),
    Unpriceable(PricingError),
}

impl VenueOutcome {
    pub fn is_quoted(&self) -> bool {
        matches!(self, VenueOutcome::Quoted { .. })
    }
}

#[derive(Clone, Debug)]
pub struct VenueScan {
    pub venue: String,
    pub outcome: VenueOutcome,
    pub elapsed: Duration,
}

/// Best-available quote across whichever venues answer.
pub struct RouteAggregator<S: ?Sized> {
    resolver: Arc<PoolResolver<S>>,
    venue_timeout: Duration,
}

impl<S: VenueSource + ?Sized> RouteAggregator<S> {
    pub fn new(resolver: Arc<PoolResolver<S>>, venue_timeout: Duration) -> Self {
        Self { resolver, venue_timeout }
    }

    pub fn resolver(&self) -> &Arc<PoolResolver<S>> {
        &self.resolver
    }

    pub fn venue_timeout(&self) -> Duration {
        self.venue_timeout
    }

    /// Quote every venue concurrently, each bounded by the venue timeout.
    ///
    /// The returned scans are in `venues` order.
    pub async fn scan(&self, token_in: Address, token_out: Address, amount_in: U256, venues: &[VenueDescriptor]) -> Vec<VenueScan> {
        let scans = venues.iter().map(|venue| async move {
            let started = Instant::now();
            let outcome =
                match tokio::time::timeout(self.venue_timeout, self.quote_venue(venue, token_in, token_out, amount_in)).await {
                    Ok(outcome) => outcome,
                    Err(_) => VenueOutcome::Failed(VenueError::TimedOut(self.venue_timeout)),
                };
            VenueScan { venue: venue.name.clone(), outcome, elapsed: started.elapsed() }
        });
        join_all(scans).await
    }

    async fn quote_venue(&self, venue: &VenueDescriptor, token_in: Address, token_out: Address, amount_in: U256) -> VenueOutcome {
        let pool = match self.resolver.resolve(venue, token_in, token_out).await {
            Ok(Some(pool)) => pool,
            Ok(None) => return VenueOutcome::NoPool,
            Err(e) => return VenueOutcome::Failed(e),
        };
        let reserves = match self.resolver.source().get_reserves(pool.address).await {
            Ok(reserves) => reserves,
            Err(e) => return VenueOutcome::Failed(e),
        };
        match PricingEngine::for_venue(venue).quote(&venue.name, &pool, &reserves, token_in, token_out, amount_in) {
            Ok(quote) => VenueOutcome::Quoted { quote, reserves },
            Err(e) => VenueOutcome::Unpriceable(e),
        }
    }

    /// Mid price of `token_in` in `token_out` on one venue, scaled by 1e18. `None` when the
    /// venue has no pool for the pair.
    pub async fn venue_price(&self, venue: &VenueDescriptor, token_in: Address, token_out: Address) -> Result<Option<U256>, QuoteError> {
        if token_in == token_out {
            return Err(QuoteError::IdenticalTokens(token_in));
        }
        let Some((pool, reserves)) = self.bounded(venue, self.pool_snapshot(venue, token_in, token_out)).await? else {
            return Ok(None);
        };
        if reserves.is_empty() {
            return Err(PricingError::InsufficientLiquidity.into());
        }
        let (reserve_in, reserve_out) =
            pool.oriented_reserves(&reserves, token_in, token_out).ok_or(PricingError::TokenNotInPool(token_in, pool.address))?;
        Ok(Some(PricingEngine::spot_price(reserve_in, reserve_out)?))
    }

    /// Enriched quote from one venue alone. `None` when the venue has no pool for the pair.
    pub async fn venue_quote(
        &self,
        venue: &VenueDescriptor,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<Quote>, QuoteError> {
        if amount_in.is_zero() {
            return Err(QuoteError::InvalidAmount);
        }
        if token_in == token_out {
            return Err(QuoteError::IdenticalTokens(token_in));
        }
        let Some((pool, reserves)) = self.bounded(venue, self.pool_snapshot(venue, token_in, token_out)).await? else {
            return Ok(None);
        };
        let quote = PricingEngine::for_venue(venue).quote(&venue.name, &pool, &reserves, token_in, token_out, amount_in)?;
        Ok(Some(PricingEngine::enrich(&quote, &reserves)?))
    }

    async fn pool_snapshot(
        &self,
        venue: &VenueDescriptor,
        token_in: Address,
        token_out: Address,
    ) -> Result<Option<(PoolHandle, Reserves)>, VenueError> {
        let Some(pool) = self.resolver.resolve(venue, token_in, token_out).await? else {
            return Ok(None);
        };
        let reserves = self.resolver.source().get_reserves(pool.address).await?;
        Ok(Some((pool, reserves)))
    }

    async fn bounded<T>(&self, venue: &VenueDescriptor, call: impl Future<Output = Result<T, VenueError>>) -> Result<T, VenueError> {
        match tokio::time::timeout(self.venue_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{}: no answer within {:?}", venue.name, self.venue_timeout);
                Err(VenueError::TimedOut(self.venue_timeout))
            }
        }
    }

    /// All usable quotes, best first. Empty when no venue has a pool for the pair.
    ///
    /// Ranking is by `amount_out` descending; equal outputs keep the order of `venues`, so the
    /// first configured venue wins a tie. Only the best quote gets price and impact fields.
    pub async fn get_quotes(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        venues: &[VenueDescriptor],
    ) -> Result<Vec<Quote>, QuoteError> {
        if amount_in.is_zero() {
            return Err(QuoteError::InvalidAmount);
        }
        if token_in == token_out {
            return Err(QuoteError::IdenticalTokens(token_in));
        }

        let scans = self.scan(token_in, token_out, amount_in, venues).await;

        let mut candidates: Vec<(Quote, Reserves)> = Vec::with_capacity(scans.len());
        for scan in scans {
            match scan.outcome {
                VenueOutcome::Quoted { quote, reserves } => candidates.push((quote, reserves)),
                VenueOutcome::NoPool => debug!("{}: no pool", scan.venue),
                VenueOutcome::Failed(e) => warn!("{}: skipped after {:?}: {}", scan.venue, scan.elapsed, e),
                VenueOutcome::Unpriceable(e) => warn!("{}: skipped, cannot price: {}", scan.venue, e),
            }
        }

        // stable sort keeps configuration order among equal outputs
        candidates.sort_by(|a, b| b.0.amount_out.cmp(&a.0.amount_out));

        let mut quotes = Vec::with_capacity(candidates.len());
        for (idx, (quote, reserves)) in candidates.into_iter().enumerate() {
            if idx == 0 {
                let best = match PricingEngine::enrich(&quote, &reserves) {
                    Ok(enriched) => enriched,
                    Err(e) => {
                        warn!("{}: returning best quote without price fields: {}", quote.venue, e);
                        quote
                    }
                };
                info!("Best route {} (impact {:?} bps)", best, best.price_impact_bps);
                quotes.push(best);
            } else {
                quotes.push(quote);
            }
        }

        if quotes.is_empty() {
            info!("No route for {:#} -> {:#} across {} venues", token_in, token_out, venues.len());
        }
        Ok(quotes)
    }
}
