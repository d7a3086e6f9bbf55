use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),
    #[error("venue call reverted: {0}")]
    Reverted(String),
    #[error("failed to decode venue response: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("venue did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Point-in-time reserves of a pool, in the pool's own token0/token1 order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: U256,
    pub reserve1: U256,
    /// `blockTimestampLast` as reported by the pool.
    pub block_timestamp_last: u32,
    /// Unix second at which this snapshot was read.
    pub read_at: u64,
}

impl Reserves {
    pub fn new(reserve0: U256, reserve1: U256, block_timestamp_last: u32) -> Self {
        Self { reserve0, reserve1, block_timestamp_last, read_at: unix_now() }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Read side of a set of Uniswap V2 compatible venues.
///
/// Every call may fail or revert independently per venue; callers treat failures as
/// "skip this venue".
#[async_trait]
pub trait VenueSource: Send + Sync {
    /// `factory.getPair(token_a, token_b)`. `None` when the factory has no pair.
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Option<Address>, VenueError>;

    /// `(pair.token0(), pair.token1())`, the order the pool stores its reserves in.
    async fn get_pair_tokens(&self, pair: Address) -> Result<(Address, Address), VenueError>;

    /// `pair.getReserves()`; a fresh snapshot on every call.
    async fn get_reserves(&self, pair: Address) -> Result<Reserves, VenueError>;
}
