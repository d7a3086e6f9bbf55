use crate::data_sync::{Reserves, VenueRegistry};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Which of the pool's two stored positions a token occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenSlot {
    Token0,
    Token1,
}

impl TokenSlot {
    pub fn other(self) -> Self {
        match self {
            TokenSlot::Token0 => TokenSlot::Token1,
            TokenSlot::Token1 => TokenSlot::Token0,
        }
    }
}

/// A resolved pool: its address and the token order it stores reserves in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolHandle {
    pub factory: Address,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl Display for PoolHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pool({:#}: {:#}/{:#})", self.address, self.token0, self.token1)
    }
}

impl PoolHandle {
    pub fn new(factory: Address, address: Address, token0: Address, token1: Address) -> Self {
        Self { factory, address, token0, token1 }
    }

    pub fn slot_of(&self, token: Address) -> Option<TokenSlot> {
        if token == self.token0 {
            Some(TokenSlot::Token0)
        } else if token == self.token1 {
            Some(TokenSlot::Token1)
        } else {
            None
        }
    }

    pub fn contains(&self, token: Address) -> bool {
        self.slot_of(token).is_some()
    }

    /// `(reserve_in, reserve_out)` for a swap from `token_in` to `token_out`, regardless of which
    /// of them the pool stores first.
    pub fn oriented_reserves(&self, reserves: &Reserves, token_in: Address, token_out: Address) -> Option<(U256, U256)> {
        let slot_in = self.slot_of(token_in)?;
        if self.slot_of(token_out)? != slot_in.other() {
            return None;
        }
        Some(match slot_in {
            TokenSlot::Token0 => (reserves.reserve0, reserves.reserve1),
            TokenSlot::Token1 => (reserves.reserve1, reserves.reserve0),
        })
    }
}

/// Expected result of swapping `amount_in` on one venue.
///
/// `price` (1e18 fixed point, mid price), `spot_out` and `price_impact_bps` are only filled in
/// for the best quote of an aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub venue: String,
    pub pool: PoolHandle,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub price: Option<U256>,
    pub spot_out: Option<U256>,
    pub price_impact_bps: Option<u64>,
}

impl Display for Quote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {} via {}", self.venue, self.amount_in, self.amount_out, self.pool)
    }
}

impl Quote {
    pub fn is_enriched(&self) -> bool {
        self.price.is_some() && self.price_impact_bps.is_some()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("venue {0} is not configured")]
    UnknownVenue(String),
    #[error("venue {0} has no router to execute through")]
    NoRouter(String),
}

/// The quote chosen for execution plus where to execute it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSelection {
    pub quote: Quote,
    pub router: Address,
    /// Token path handed to the router, `[token_in, .., token_out]`.
    pub path: Vec<Address>,
}

impl RouteSelection {
    pub fn new(quote: Quote, router: Address) -> Self {
        let path = vec![quote.token_in, quote.token_out];
        Self { quote, router, path }
    }

    pub fn for_quote(quote: Quote, registry: &VenueRegistry) -> Result<Self, RouteError> {
        let venue = registry.get(&quote.venue).ok_or_else(|| RouteError::UnknownVenue(quote.venue.clone()))?;
        let router = venue.router.ok_or_else(|| RouteError::NoRouter(quote.venue.clone()))?;
        Ok(Self::new(quote, router))
    }

    pub fn token_in(&self) -> Option<Address> {
        self.path.first().copied()
    }

    pub fn token_out(&self) -> Option<Address> {
        self.path.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_reserves_both_orders() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let pool = PoolHandle::new(Address::repeat_byte(9), Address::repeat_byte(10), b, a);
        let reserves = Reserves::new(U256::from(100u64), U256::from(300u64), 0);

        // b is token0 here
        assert_eq!(pool.oriented_reserves(&reserves, b, a), Some((U256::from(100u64), U256::from(300u64))));
        assert_eq!(pool.oriented_reserves(&reserves, a, b), Some((U256::from(300u64), U256::from(100u64))));
        assert_eq!(pool.oriented_reserves(&reserves, a, a), None);
        assert_eq!(pool.oriented_reserves(&reserves, a, Address::repeat_byte(3)), None);
    }

    #[test]
    fn test_route_for_quote_needs_router() {
        let registry = VenueRegistry::ethereum_mainnet();
        let quote = Quote {
            venue: "DefiSwap".to_string(),
            pool: PoolHandle::new(Address::ZERO, Address::repeat_byte(10), Address::repeat_byte(1), Address::repeat_byte(2)),
            token_in: Address::repeat_byte(1),
            token_out: Address::repeat_byte(2),
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
            price: None,
            spot_out: None,
            price_impact_bps: None,
        };
        assert_eq!(RouteSelection::for_quote(quote.clone(), &registry), Err(RouteError::NoRouter("DefiSwap".to_string())));

        let quote = Quote { venue: "UniswapV2".to_string(), ..quote };
        let route = RouteSelection::for_quote(quote, &registry).unwrap();
        assert_eq!(route.path, vec![Address::repeat_byte(1), Address::repeat_byte(2)]);
    }
}
