use crate::utils::constants::{BPS_DENOMINATOR, DEFAULT_DEADLINE_SECS};
use alloy_primitives::U256;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlippageError {
    #[error("slippage of {0} bps is more than 100%")]
    InvalidSlippage(u64),
}

/// `floor(quoted_out * (10000 - slippage_bps) / 10000)`
pub fn min_amount_out(quoted_out: U256, slippage_bps: u64) -> Result<U256, SlippageError> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(SlippageError::InvalidSlippage(slippage_bps));
    }
    let keep = U256::from(BPS_DENOMINATOR - slippage_bps);
    // quoted_out * keep fits unless quoted_out is within 2^14 of U256::MAX
    let bounded = match quoted_out.checked_mul(keep) {
        Some(scaled) => scaled / U256::from(BPS_DENOMINATOR),
        None => quoted_out / U256::from(BPS_DENOMINATOR) * keep,
    };
    Ok(bounded)
}

pub fn default_deadline(now: u64) -> u64 {
    now.saturating_add(DEFAULT_DEADLINE_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::DEFAULT_SLIPPAGE_BPS;

    #[test]
    fn test_min_amount_out() {
        let quoted = U256::from(498_003_490_519_951_608u128);
        // 0.5% off, truncated
        assert_eq!(min_amount_out(quoted, DEFAULT_SLIPPAGE_BPS).unwrap(), U256::from(495_513_473_067_351_849u128));
        assert_eq!(min_amount_out(quoted, 0).unwrap(), quoted);
        assert_eq!(min_amount_out(quoted, 10_000).unwrap(), U256::ZERO);
        assert_eq!(min_amount_out(U256::from(199u64), 50).unwrap(), U256::from(198u64));
    }

    #[test]
    fn test_slippage_above_hundred_percent() {
        assert_eq!(min_amount_out(U256::from(1u64), 10_001), Err(SlippageError::InvalidSlippage(10_001)));
    }

    #[test]
    fn test_huge_quote_does_not_overflow() {
        assert!(min_amount_out(U256::MAX, 50).unwrap() < U256::MAX);
    }

    #[test]
    fn test_default_deadline() {
        assert_eq!(default_deadline(1_700_000_000), 1_700_000_900);
        assert_eq!(default_deadline(u64::MAX), u64::MAX);
    }
}
