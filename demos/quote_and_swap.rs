use alloy_primitives::{Address, U256};
use eyre::{Result, eyre};
use std::sync::Arc;
use swap_router::data_sync::VenueSource;
use swap_router::utils::constants::{EthFactoryAddress, USDC, WETH};
use swap_router::utils::{ConfigLoaderSync, Token};
use swap_router::{
    MockChain, QuoteEngine, QuoteEngineBuilder, RpcConfig, RpcVenueSource, SwapExecutor, SwapOutcome, SwapRequest,
    SwapRouterConfig,
};
use tracing::info;

/// Quote 1000 USDC -> WETH across the configured venues and execute the best route.
///
/// `cargo run --example quote_and_swap` runs against an in-memory chain.
/// `cargo run --example quote_and_swap -- live` only quotes, against `RPC_HTTP_URL`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).with_target(false).init();

    let config = SwapRouterConfig::load_section_from_file_sync("swap_router.toml".to_string())?;
    let usdc = Token::known(USDC).ok_or_else(|| eyre!("USDC metadata missing"))?;
    let weth = Token::known(WETH).ok_or_else(|| eyre!("WETH metadata missing"))?;
    let amount_in = U256::from(1_000u64) * usdc.get_exp();

    if std::env::args().nth(1).as_deref() == Some("live") {
        let rpc = RpcConfig::from_env()?;
        let source: Arc<dyn VenueSource> = Arc::new(RpcVenueSource::new(rpc.rpc_http_url.clone(), rpc.http_timeout())?);
        let engine = QuoteEngineBuilder::new(source).with_config(&config).with_venue_timeout(rpc.venue_timeout()).build();
        print_quotes(&engine, &usdc, &weth, amount_in).await?;
        return Ok(());
    }

    let chain = Arc::new(MockChain::new());
    seed_chain(&chain, &config, amount_in);
    let engine = QuoteEngineBuilder::new(chain.clone()).with_config(&config).build();
    print_quotes(&engine, &usdc, &weth, amount_in).await?;
    if let Some(price) = engine.get_price("UniswapV2", WETH, USDC).await? {
        // the 1e18 price scale matches WETH's decimals, so this is raw USDC per WETH
        info!("UniswapV2 mid price: 1 {} = {} {}", weth, usdc.to_float(price), usdc);
    }
    engine.cleanup_pools();

    let trader = Address::repeat_byte(0xaa);
    let executor = SwapExecutor::new(chain.clone(), Address::repeat_byte(0xee));
    let route = engine.best_route(USDC, WETH, amount_in).await?.ok_or_else(|| eyre!("no executable route"))?;
    let request = SwapRequest::from_route(&route, trader, trader, engine.default_slippage_bps(), executor.now())?;
    info!("Executing on {} with min out {} {}", route.quote.venue, weth.to_float(request.min_amount_out), weth);

    match executor.execute(&route, &request).await {
        SwapOutcome::Succeeded(receipt) => {
            info!("Received {} {} (tx {})", weth.to_float(receipt.amount_out), weth, receipt.tx_id);
            info!("Trader now holds {} {}", usdc.to_float(chain.balance(USDC, trader)), usdc);
        }
        SwapOutcome::Failed(failure) => info!("Swap failed ({}): {}", failure.kind(), failure),
    }
    Ok(())
}

fn seed_chain(chain: &MockChain, config: &SwapRouterConfig, amount_in: U256) {
    let weth = U256::from(10u64).pow(U256::from(18u64));
    let usdc = U256::from(1_000_000u64);
    // same price, different depth
    chain.create_pair(EthFactoryAddress::UNISWAP_V2, USDC, WETH, usdc * U256::from(30_000_000u64), weth * U256::from(10_000u64));
    chain.create_pair(EthFactoryAddress::SUSHISWAP_V2, USDC, WETH, usdc * U256::from(9_000_000u64), weth * U256::from(3_000u64));
    chain.create_pair(EthFactoryAddress::DEFISWAP, USDC, WETH, usdc * U256::from(60_000_000u64), weth * U256::from(20_000u64));
    for venue in config.registry.iter() {
        if let Some(router) = venue.router {
            chain.register_router(router, venue.factory);
        }
    }
    chain.mint(USDC, Address::repeat_byte(0xaa), amount_in * U256::from(5u64));
}

async fn print_quotes<S: VenueSource + ?Sized>(engine: &QuoteEngine<S>, token_in: &Token, token_out: &Token, amount_in: U256) -> Result<()> {
    let quotes = engine.get_quotes(token_in.get_address(), token_out.get_address(), amount_in).await?;
    if quotes.is_empty() {
        info!("No route for {} -> {}", token_in, token_out);
        return Ok(());
    }
    for quote in quotes.iter() {
        info!(
            "{:<12} {} {} -> {:.6} {} impact {:?} bps",
            quote.venue,
            token_in.to_float(quote.amount_in),
            token_in,
            token_out.to_float(quote.amount_out),
            token_out,
            quote.price_impact_bps
        );
    }
    Ok(())
}
