use crate::utils::constants::KNOWN_TOKENS;
use alloy_primitives::utils::Unit;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// An ERC20-like token: its address plus the decimal precision amounts of it are scaled by.
///
/// Identity is the address only. Addresses parsed from text are normalized, so `0xABC..` and
/// `0xabc..` name the same token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Token {
    address: Address,
    decimals: u8,
    name: Option<String>,
    symbol: Option<String>,
}

pub type TokenWrapper = Arc<Token>;

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.get_address()
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.get_address())
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get_symbol())
    }
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Token {
        Token { address, decimals, ..Token::default() }
    }

    pub fn new_with_data(address: Address, symbol: Option<String>, name: Option<String>, decimals: Option<u8>) -> Token {
        Token { address, symbol, name, decimals: decimals.unwrap_or(18) }
    }

    /// Parse a token from its textual address in any letter case.
    pub fn parse(address: &str, decimals: u8) -> Result<Token, alloy_primitives::hex::FromHexError> {
        Ok(Token::new(Address::from_str(address.trim())?, decimals))
    }

    /// Metadata of a well-known mainnet token.
    pub fn known(address: Address) -> Option<Token> {
        KNOWN_TOKENS
            .iter()
            .find(|(_, known, _)| *known == address)
            .map(|(symbol, address, decimals)| Token::new(*address, *decimals).with_symbol(symbol))
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    pub fn get_symbol(&self) -> String {
        self.symbol.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_name(&self) -> String {
        self.name.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    /// `10^decimals` as an integer.
    pub fn get_exp(&self) -> U256 {
        if self.decimals == 18 { Unit::ETHER.wei() } else { U256::from(10).pow(U256::from(self.decimals)) }
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    /// Display-only conversion of a raw amount. Never feed the result back into pricing.
    pub fn to_float(&self, value: U256) -> f64 {
        if self.decimals == 0 {
            return u64::try_from(value).map(|v| v as f64).unwrap_or(f64::MAX);
        }
        let (div, rem) = value.div_rem(self.get_exp());
        match (u64::try_from(div), u128::try_from(rem)) {
            (Ok(div), Ok(rem)) => div as f64 + (rem as f64) / 10f64.powi(self.decimals as i32),
            _ => f64::MAX,
        }
    }
}
