/// End-to-end swap flows
///
/// Quote with the engine, execute with the executor, both against one in-memory chain.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::logic::pricing::{PricingEngine, price_scale};
    use crate::logic::types::{PoolHandle, Quote, RouteSelection};
    use crate::logic::{QuoteEngine, QuoteEngineBuilder};
    use crate::mock_chain::{MockChain, TokenBehavior};
    use crate::utils::constants::{DAI, EthFactoryAddress, EthRouterAddress, USDC, WETH};
    use crate::data_sync::VenueRegistry;
    use alloy_primitives::{Address, U256};
    use std::sync::Arc;
    use std::time::Duration;

    const TRADER: Address = Address::repeat_byte(0xaa);
    const RECIPIENT: Address = Address::repeat_byte(0xbb);
    const EXECUTOR: Address = Address::repeat_byte(0xee);

    // 1000 units of USDC into a 1,000,000 USDC / 500 WETH pool
    const QUOTED_OUT: u128 = 498_003_490_519_951_608;

    fn u(value: u128) -> U256 {
        U256::from(value)
    }

    struct Fixture {
        chain: Arc<MockChain>,
        engine: QuoteEngine<MockChain>,
        executor: SwapExecutor<MockChain>,
        pair: Address,
    }

    fn fixture() -> Fixture {
        let chain = Arc::new(MockChain::new());
        let pair = chain.create_pair(EthFactoryAddress::UNISWAP_V2, USDC, WETH, u(1_000_000), u(500) * price_scale());
        for venue in VenueRegistry::ethereum_mainnet().iter() {
            if let Some(router) = venue.router {
                chain.register_router(router, venue.factory);
            }
        }
        chain.mint(USDC, TRADER, u(10_000));

        let engine = QuoteEngineBuilder::new(chain.clone()).build();
        let executor = SwapExecutor::new(chain.clone(), EXECUTOR);
        Fixture { chain, engine, executor, pair }
    }

    async fn best_route(fx: &Fixture) -> RouteSelection {
        fx.engine.best_route(USDC, WETH, u(1_000)).await.unwrap().unwrap()
    }

    fn request(fx: &Fixture, route: &RouteSelection) -> SwapRequest {
        SwapRequest::from_route(route, TRADER, RECIPIENT, fx.engine.default_slippage_bps(), fx.executor.now()).unwrap()
    }

    fn assert_untouched(fx: &Fixture) {
        assert_eq!(fx.chain.balance(USDC, TRADER), u(10_000));
        assert_eq!(fx.chain.balance(USDC, EXECUTOR), U256::ZERO);
        assert_eq!(fx.chain.balance(WETH, RECIPIENT), U256::ZERO);
        assert_eq!(fx.chain.allowance_of(USDC, TRADER, EXECUTOR), U256::ZERO);
        let reserves = fx.chain.reserves_of(fx.pair).unwrap();
        assert_eq!((reserves.reserve0, reserves.reserve1), (u(1_000_000), u(500) * price_scale()));
        assert_eq!(fx.chain.committed_count(), 0);
    }

    #[tokio::test]
    async fn test_quote_then_swap() {
        let fx = fixture();
        let route = best_route(&fx).await;
        assert_eq!(route.quote.venue, "UniswapV2");
        assert_eq!(route.router, EthRouterAddress::UNISWAP_V2);
        assert_eq!(route.quote.amount_out, u(QUOTED_OUT));
        assert_eq!(route.quote.price_impact_bps, Some(39));

        let request = request(&fx, &route);
        assert_eq!(request.min_amount_out, u(495_513_473_067_351_849));

        let receipt = fx.executor.execute(&route, &request).await.into_result().unwrap();

        assert_eq!(receipt.amount_out, u(QUOTED_OUT));
        assert_eq!(receipt.path, vec![USDC, WETH]);
        assert_eq!(receipt.recipient, RECIPIENT);
        assert_eq!(fx.chain.balance(WETH, RECIPIENT), u(QUOTED_OUT));
        assert_eq!(fx.chain.balance(WETH, TRADER), U256::ZERO);
        assert_eq!(fx.chain.balance(USDC, TRADER), u(9_000));
        // nothing stranded with the executor
        assert_eq!(fx.chain.balance(USDC, EXECUTOR), U256::ZERO);
        assert_eq!(fx.chain.balance(WETH, EXECUTOR), U256::ZERO);
        assert_eq!(fx.chain.committed_count(), 1);
    }

    #[tokio::test]
    async fn test_allowance_raised_to_exactly_amount_in() {
        let fx = fixture();
        fx.chain.approve(USDC, TRADER, EXECUTOR, u(400)).await.unwrap();
        let route = best_route(&fx).await;

        let outcome = fx.executor.execute(&route, &request(&fx, &route)).await;
        assert!(outcome.is_success());
        // an unlimited raise would leave something behind
        assert_eq!(fx.chain.allowance_of(USDC, TRADER, EXECUTOR), U256::ZERO);
        assert_eq!(fx.chain.allowance_of(USDC, EXECUTOR, EthRouterAddress::UNISWAP_V2), U256::ZERO);
    }

    #[tokio::test]
    async fn test_sufficient_allowance_is_left_alone() {
        let fx = fixture();
        fx.chain.approve(USDC, TRADER, EXECUTOR, u(5_000)).await.unwrap();
        let route = best_route(&fx).await;

        assert!(fx.executor.execute(&route, &request(&fx, &route)).await.is_success());
        assert_eq!(fx.chain.allowance_of(USDC, TRADER, EXECUTOR), u(4_000));
    }

    #[tokio::test]
    async fn test_expired_deadline_moves_nothing() {
        let fx = fixture();
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let executor = SwapExecutor::new(fx.chain.clone(), EXECUTOR).with_clock(clock.clone());
        let route = best_route(&fx).await;
        let request = SwapRequest::new(TRADER, u(1_000), U256::ZERO, RECIPIENT, clock.now() - 1);

        let failure = executor.execute(&route, &request).await.into_result().unwrap_err();

        assert_eq!(failure, SwapFailure::DeadlineExpired { deadline: 1_699_999_999, now: 1_700_000_000 });
        assert_eq!(failure.kind(), FailureKind::InvalidInput);
        assert_untouched(&fx);

        // expiry is reported ahead of any other defect of the request
        let zero = SwapRequest { amount_in: U256::ZERO, ..request.clone() };
        let failure = executor.execute(&route, &zero).await.into_result().unwrap_err();
        assert!(matches!(failure, SwapFailure::DeadlineExpired { .. }));
        let short = RouteSelection { path: vec![USDC], ..route.clone() };
        assert!(matches!(executor.execute(&short, &request).await.failure(), Some(SwapFailure::DeadlineExpired { .. })));
        assert_untouched(&fx);

        // a deadline equal to now is still valid
        let deadline = fx.executor.now() + 60;
        clock.set(deadline);
        let request = SwapRequest { deadline, ..request };
        assert!(executor.execute(&route, &request).await.is_success());
    }

    #[tokio::test]
    async fn test_venue_rejection_is_propagated() {
        let fx = fixture();
        let route = best_route(&fx).await;
        let request = SwapRequest { min_amount_out: u(QUOTED_OUT + 1), ..request(&fx, &route) };

        let failure = fx.executor.execute(&route, &request).await.into_result().unwrap_err();

        assert_eq!(failure, SwapFailure::VenueRejected("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into()));
        assert_eq!(failure.kind(), FailureKind::Rejected);
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_transfer_returning_false_is_caught() {
        let fx = fixture();
        fx.chain.set_token_behavior(USDC, TokenBehavior::ReturnsFalse);
        let route = best_route(&fx).await;
        // more than the trader holds
        let request = SwapRequest { amount_in: u(20_000), min_amount_out: U256::ZERO, ..request(&fx, &route) };

        let failure = fx.executor.execute(&route, &request).await.into_result().unwrap_err();

        assert_eq!(failure, SwapFailure::TransferFailed { stage: TransferStage::Pull, reason: "transferFrom returned false".into() });
        assert_eq!(failure.kind(), FailureKind::Misbehaving);
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_reverting_transfer_is_reported() {
        let fx = fixture();
        let route = best_route(&fx).await;
        let request = SwapRequest { amount_in: u(20_000), min_amount_out: U256::ZERO, ..request(&fx, &route) };

        let failure = fx.executor.execute(&route, &request).await.into_result().unwrap_err();

        assert_eq!(
            failure,
            SwapFailure::TransferFailed { stage: TransferStage::Pull, reason: "ERC20: transfer amount exceeds balance".into() }
        );
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_transfer_that_moves_nothing_is_caught() {
        let fx = fixture();
        fx.chain.set_token_behavior(USDC, TokenBehavior::SilentNoop);
        let route = best_route(&fx).await;

        let failure = fx.executor.execute(&route, &request(&fx, &route)).await.into_result().unwrap_err();

        assert_eq!(failure, SwapFailure::TransferFailed { stage: TransferStage::Pull, reason: "moved 0, expected 1000".into() });
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_undelivered_output_is_caught() {
        let fx = fixture();
        fx.chain.set_token_behavior(WETH, TokenBehavior::SilentNoop);
        let route = best_route(&fx).await;
        let request = request(&fx, &route);

        let failure = fx.executor.execute(&route, &request).await.into_result().unwrap_err();
        assert_eq!(failure, SwapFailure::InsufficientOutput { min: request.min_amount_out, actual: U256::ZERO });
        assert_eq!(failure.kind(), FailureKind::Rejected);
        assert_untouched(&fx);

        // without a bound the mismatch against the router's report still fails the swap
        let request = SwapRequest { min_amount_out: U256::ZERO, ..request };
        let failure = fx.executor.execute(&route, &request).await.into_result().unwrap_err();
        assert!(matches!(failure, SwapFailure::TransferFailed { stage: TransferStage::Delivery, .. }));
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_input_left_behind_by_router_is_caught() {
        let fx = fixture();
        fx.chain.skip_input_pull(EthRouterAddress::UNISWAP_V2);
        let route = best_route(&fx).await;

        let failure = fx.executor.execute(&route, &request(&fx, &route)).await.into_result().unwrap_err();

        assert_eq!(failure, SwapFailure::TransferFailed { stage: TransferStage::ToVenue, reason: "moved 0, expected 1000".into() });
        assert_eq!(failure.kind(), FailureKind::Misbehaving);
        assert_untouched(&fx);
        assert_eq!(fx.chain.allowance_of(USDC, EXECUTOR, EthRouterAddress::UNISWAP_V2), U256::ZERO);
    }

    #[tokio::test]
    async fn test_refused_authorization() {
        let fx = fixture();
        fx.chain.set_token_behavior(USDC, TokenBehavior::RejectsApprovals);
        let route = best_route(&fx).await;

        let failure = fx.executor.execute(&route, &request(&fx, &route)).await.into_result().unwrap_err();

        assert!(matches!(failure, SwapFailure::AuthorizationFailed(_)));
        assert_eq!(failure.kind(), FailureKind::Misbehaving);
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let fx = fixture();
        let route = best_route(&fx).await;
        let valid = request(&fx, &route);

        let zero = SwapRequest { amount_in: U256::ZERO, ..valid.clone() };
        assert_eq!(fx.executor.execute(&route, &zero).await.failure(), Some(&SwapFailure::InvalidAmount));

        let nowhere = SwapRequest { recipient: Address::ZERO, ..valid.clone() };
        assert!(matches!(fx.executor.execute(&route, &nowhere).await.failure(), Some(SwapFailure::InvalidRoute(_))));

        let mismatched = RouteSelection { path: vec![USDC, DAI], ..route.clone() };
        assert!(matches!(fx.executor.execute(&mismatched, &valid).await.failure(), Some(SwapFailure::InvalidRoute(_))));

        let short = RouteSelection { path: vec![USDC], ..route.clone() };
        assert!(matches!(fx.executor.execute(&short, &valid).await.failure(), Some(SwapFailure::InvalidRoute(_))));

        assert!(matches!(
            SwapRequest::from_route(&route, TRADER, RECIPIENT, 10_001, 0),
            Err(SwapFailure::InvalidAmount)
        ));
        assert_untouched(&fx);
    }

    #[tokio::test]
    async fn test_multi_hop_path() {
        let fx = fixture();
        let dai_in = u(100) * price_scale();
        fx.chain.create_pair(EthFactoryAddress::UNISWAP_V2, DAI, WETH, u(1_000_000) * price_scale(), u(500) * price_scale());
        fx.chain.mint(DAI, TRADER, dai_in);

        let engine = PricingEngine::default();
        let weth_mid = engine.get_amount_out(dai_in, u(1_000_000) * price_scale(), u(500) * price_scale()).unwrap();
        let usdc_out = engine.get_amount_out(weth_mid, u(500) * price_scale(), u(1_000_000)).unwrap();

        let quote = Quote {
            venue: "UniswapV2".to_string(),
            pool: PoolHandle::new(EthFactoryAddress::UNISWAP_V2, fx.pair, USDC, WETH),
            token_in: DAI,
            token_out: USDC,
            amount_in: dai_in,
            amount_out: usdc_out,
            price: None,
            spot_out: None,
            price_impact_bps: None,
        };
        let route = RouteSelection { quote, router: EthRouterAddress::UNISWAP_V2, path: vec![DAI, WETH, USDC] };
        let request = SwapRequest::new(TRADER, dai_in, usdc_out, RECIPIENT, fx.executor.now() + 60);

        let receipt = fx.executor.execute(&route, &request).await.into_result().unwrap();

        assert_eq!(receipt.amount_out, usdc_out);
        assert_eq!(fx.chain.balance(USDC, RECIPIENT), usdc_out);
        assert_eq!(fx.chain.balance(DAI, TRADER), U256::ZERO);
        assert_eq!(fx.chain.balance(WETH, EXECUTOR), U256::ZERO);
    }

    #[tokio::test]
    async fn test_concurrent_swap_for_same_caller_and_token_fails_fast() {
        let fx = fixture();
        fx.chain.delay_router(EthRouterAddress::UNISWAP_V2, Duration::from_millis(100));
        let route = best_route(&fx).await;
        let first_request = request(&fx, &route);

        let (first, second) = tokio::join!(fx.executor.execute(&route, &first_request), fx.executor.execute(&route, &first_request));

        assert!(first.is_success());
        let failure = second.failure().unwrap();
        assert_eq!(failure, &SwapFailure::ExecutionInFlight { caller: TRADER, token: USDC });
        assert_eq!(failure.kind(), FailureKind::Transient);
        assert_eq!(fx.chain.balance(USDC, TRADER), u(9_000));

        // the marker is released once the first swap is done
        let route = best_route(&fx).await;
        assert!(fx.executor.execute(&route, &request(&fx, &route)).await.is_success());
        assert_eq!(fx.chain.balance(USDC, TRADER), u(8_000));
    }

    #[tokio::test]
    async fn test_different_callers_are_serialized() {
        let fx = fixture();
        let other = Address::repeat_byte(0xcc);
        fx.chain.mint(USDC, other, u(1_000));
        fx.chain.delay_router(EthRouterAddress::UNISWAP_V2, Duration::from_millis(50));
        let route = best_route(&fx).await;
        let first = request(&fx, &route);
        let second = SwapRequest { caller: other, recipient: other, ..first.clone() };

        let (a, b) = tokio::join!(fx.executor.execute(&route, &first), fx.executor.execute(&route, &second));

        // the second swap sees the reserves the first one left behind
        assert_eq!(a.receipt().unwrap().amount_out, u(QUOTED_OUT));
        assert_eq!(b.receipt().unwrap().amount_out, u(497_010_959_633_563_382));
        assert_eq!(fx.chain.committed_count(), 2);
    }
}
