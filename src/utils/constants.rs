use alloy_primitives::{Address, address};

pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
pub const USDT: Address = address!("0xdAC17F958D2ee523a2206206994597C13D831ec7");
pub const WBTC: Address = address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
pub const LINK: Address = address!("0x514910771AF9Ca656af840dff83E8264EcF986CA");
pub const UNI: Address = address!("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
pub const AAVE: Address = address!("0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9");

/// Fixed point scale used for prices (1e18).
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// 1% = 100 bps.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Uniswap V2 style 0.3% fee, expressed as `amount * 997 / 1000`.
pub const DEFAULT_FEE_NUMERATOR: u64 = 997;
pub const DEFAULT_FEE_DENOMINATOR: u64 = 1000;

pub const DEFAULT_SLIPPAGE_BPS: u64 = 50;

pub const DEFAULT_DEADLINE_SECS: u64 = 15 * 60;

/// (symbol, address, decimals)
pub const KNOWN_TOKENS: [(&str, Address, u8); 8] = [
    ("WETH", WETH, 18),
    ("USDC", USDC, 6),
    ("DAI", DAI, 18),
    ("USDT", USDT, 6),
    ("WBTC", WBTC, 8),
    ("LINK", LINK, 18),
    ("UNI", UNI, 18),
    ("AAVE", AAVE, 18),
];

#[non_exhaustive]
pub struct EthFactoryAddress;

impl EthFactoryAddress {
    // Uniswap V2 compatible
    pub const UNISWAP_V2: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
    pub const SUSHISWAP_V2: Address = address!("C0AEe478e3658e2610c5F7A4A2E1777cE9e4f2Ac");
    pub const SHIBASWAP: Address = address!("115934131916C8b277DD010Ee02de363c09d037c");
    pub const DEFISWAP: Address = address!("9055682E58C74fc8DdBFC55Ad2428aB1F96098Fc");
    pub const LUASWAP: Address = address!("5f69C2ec01F787C963f8bC19d2451BfB3DdcF5D8");
    pub const SHIBANOVA: Address = address!("9b208194acc0A8ccbF9009ccE480E54D5D826D68");
}

#[non_exhaustive]
pub struct EthRouterAddress;

impl EthRouterAddress {
    pub const UNISWAP_V2: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
    pub const SUSHISWAP_V2: Address = address!("d9e1cE17f2641f24aE83637ab66a2cca9C378B9F");
    pub const SHIBASWAP: Address = address!("03f7724180AA6b939894B5Ca4314783B0b36b329");
}
