use super::types::{PoolHandle, Quote};
use crate::data_sync::{FeeModel, Reserves, VenueDescriptor};
use crate::utils::constants::{BPS_DENOMINATOR, PRICE_SCALE};
use alloy_primitives::{Address, U256};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("amount in must be greater than zero")]
    InvalidAmount,
    #[error("token {0} is not part of pool {1}")]
    TokenNotInPool(Address, Address),
    #[error("pool has no liquidity")]
    InsufficientLiquidity,
    #[error("arithmetic overflow")]
    Overflow,
}

pub fn price_scale() -> U256 {
    U256::from(PRICE_SCALE)
}

/// Constant product pricing, integer only, truncating like the on-chain pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PricingEngine {
    fee: FeeModel,
}

impl PricingEngine {
    pub fn new(fee: FeeModel) -> Self {
        Self { fee }
    }

    pub fn for_venue(venue: &VenueDescriptor) -> Self {
        Self::new(venue.fee)
    }

    pub fn fee(&self) -> FeeModel {
        self.fee
    }

    /// `floor(amount_in * fee_num * reserve_out / (reserve_in * fee_den + amount_in * fee_num))`
    pub fn get_amount_out(&self, amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256, PricingError> {
        if amount_in.is_zero() {
            return Err(PricingError::InvalidAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(PricingError::InsufficientLiquidity);
        }

        let amount_in_with_fee = amount_in.checked_mul(self.fee.numerator_u256()).ok_or(PricingError::Overflow)?;
        let numerator = amount_in_with_fee.checked_mul(reserve_out).ok_or(PricingError::Overflow)?;
        let denominator = reserve_in
            .checked_mul(self.fee.denominator_u256())
            .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
            .ok_or(PricingError::Overflow)?;

        Ok(numerator / denominator)
    }

    /// Mid price of `token_in` in `token_out`, scaled by 1e18: `reserve_out * 1e18 / reserve_in`.
    pub fn spot_price(reserve_in: U256, reserve_out: U256) -> Result<U256, PricingError> {
        if reserve_in.is_zero() {
            return Err(PricingError::InsufficientLiquidity);
        }
        let scaled = reserve_out.checked_mul(price_scale()).ok_or(PricingError::Overflow)?;
        Ok(scaled / reserve_in)
    }

    /// Output at mid price and the shortfall of `amount_out` against it in bps.
    ///
    /// A zero mid-price output gives 0 bps. An execution better than mid is clamped to 0.
    pub fn price_impact_bps(amount_in: U256, amount_out: U256, price: U256) -> Result<(U256, u64), PricingError> {
        let spot_out = amount_in.checked_mul(price).ok_or(PricingError::Overflow)? / price_scale();
        if spot_out.is_zero() || amount_out >= spot_out {
            return Ok((spot_out, 0));
        }
        let shortfall = spot_out - amount_out;
        // shortfall < spot_out, so the result is below 10000
        let impact = shortfall.checked_mul(U256::from(BPS_DENOMINATOR)).ok_or(PricingError::Overflow)? / spot_out;
        Ok((spot_out, impact.saturating_to::<u64>()))
    }

    /// Size-aware quote for swapping `amount_in` of `token_in` into `token_out` on `pool`.
    pub fn quote(
        &self,
        venue: &str,
        pool: &PoolHandle,
        reserves: &Reserves,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Quote, PricingError> {
        if amount_in.is_zero() {
            return Err(PricingError::InvalidAmount);
        }
        let (reserve_in, reserve_out) = oriented(pool, reserves, token_in, token_out)?;
        let amount_out = self.get_amount_out(amount_in, reserve_in, reserve_out)?;

        Ok(Quote {
            venue: venue.to_string(),
            pool: pool.clone(),
            token_in,
            token_out,
            amount_in,
            amount_out,
            price: None,
            spot_out: None,
            price_impact_bps: None,
        })
    }

    /// Attach mid price, mid-price output and price impact computed from the same snapshot the
    /// quote was priced on.
    pub fn enrich(quote: &Quote, reserves: &Reserves) -> Result<Quote, PricingError> {
        let (reserve_in, reserve_out) = oriented(&quote.pool, reserves, quote.token_in, quote.token_out)?;
        let price = Self::spot_price(reserve_in, reserve_out)?;
        let (spot_out, impact) = Self::price_impact_bps(quote.amount_in, quote.amount_out, price)?;

        Ok(Quote { price: Some(price), spot_out: Some(spot_out), price_impact_bps: Some(impact), ..quote.clone() })
    }
}

fn oriented(pool: &PoolHandle, reserves: &Reserves, token_in: Address, token_out: Address) -> Result<(U256, U256), PricingError> {
    if !pool.contains(token_in) {
        return Err(PricingError::TokenNotInPool(token_in, pool.address));
    }
    pool.oriented_reserves(reserves, token_in, token_out).ok_or(PricingError::TokenNotInPool(token_out, pool.address))
}
