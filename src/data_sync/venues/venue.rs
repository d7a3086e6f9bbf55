use crate::utils::constants::{DEFAULT_FEE_DENOMINATOR, DEFAULT_FEE_NUMERATOR, EthFactoryAddress, EthRouterAddress};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Swap fee as the fraction of the input that reaches the curve: `amount * numerator / denominator`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModel {
    pub numerator: u64,
    pub denominator: u64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self { numerator: DEFAULT_FEE_NUMERATOR, denominator: DEFAULT_FEE_DENOMINATOR }
    }
}

impl FeeModel {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self { numerator, denominator }
    }

    pub fn is_valid(&self) -> bool {
        self.denominator > 0 && self.numerator > 0 && self.numerator <= self.denominator
    }

    pub fn numerator_u256(&self) -> U256 {
        U256::from(self.numerator)
    }

    pub fn denominator_u256(&self) -> U256 {
        U256::from(self.denominator)
    }
}

/// One AMM deployment the aggregator can query: its factory and, when it can be traded
/// through, its router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VenueDescriptor {
    pub name: String,
    pub factory: Address,
    #[serde(default)]
    pub router: Option<Address>,
    #[serde(default)]
    pub fee: FeeModel,
}

impl Display for VenueDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:#}", self.name, self.factory)
    }
}

impl VenueDescriptor {
    pub fn new(name: &str, factory: Address) -> Self {
        Self { name: name.to_string(), factory, router: None, fee: FeeModel::default() }
    }

    pub fn with_router(mut self, router: Address) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_fee(mut self, fee: FeeModel) -> Self {
        self.fee = fee;
        self
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VenueRegistryError {
    #[error("duplicate venue name: {0}")]
    DuplicateName(String),
    #[error("duplicate venue factory: {0}")]
    DuplicateFactory(Address),
    #[error("invalid fee {numerator}/{denominator} for venue {name}")]
    InvalidFee { name: String, numerator: u64, denominator: u64 },
}

/// Immutable, ordered set of venues. Built once at startup and shared.
///
/// Order carries no meaning other than being the scan order and the tie-break for equal quotes.
#[derive(Clone, Debug)]
pub struct VenueRegistry {
    venues: Arc<[VenueDescriptor]>,
}

impl Deref for VenueRegistry {
    type Target = [VenueDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.venues
    }
}

impl VenueRegistry {
    pub fn new(venues: Vec<VenueDescriptor>) -> Result<Self, VenueRegistryError> {
        let mut names = HashSet::new();
        let mut factories = HashSet::new();
        for venue in venues.iter() {
            if !names.insert(venue.name.as_str()) {
                return Err(VenueRegistryError::DuplicateName(venue.name.clone()));
            }
            if !factories.insert(venue.factory) {
                return Err(VenueRegistryError::DuplicateFactory(venue.factory));
            }
            if !venue.fee.is_valid() {
                return Err(VenueRegistryError::InvalidFee {
                    name: venue.name.clone(),
                    numerator: venue.fee.numerator,
                    denominator: venue.fee.denominator,
                });
            }
        }
        Ok(Self { venues: venues.into() })
    }

    /// Uniswap V2 compatible venues on Ethereum mainnet.
    pub fn ethereum_mainnet() -> Self {
        let venues: Vec<VenueDescriptor> = vec![
            VenueDescriptor::new("UniswapV2", EthFactoryAddress::UNISWAP_V2).with_router(EthRouterAddress::UNISWAP_V2),
            VenueDescriptor::new("SushiSwapV2", EthFactoryAddress::SUSHISWAP_V2).with_router(EthRouterAddress::SUSHISWAP_V2),
            VenueDescriptor::new("ShibaSwap", EthFactoryAddress::SHIBASWAP).with_router(EthRouterAddress::SHIBASWAP),
            VenueDescriptor::new("DefiSwap", EthFactoryAddress::DEFISWAP),
            VenueDescriptor::new("LuaSwap", EthFactoryAddress::LUASWAP),
            VenueDescriptor::new("ShibaNova", EthFactoryAddress::SHIBANOVA),
        ];
        Self { venues: venues.into() }
    }

    pub fn venues(&self) -> &[VenueDescriptor] {
        &self.venues
    }

    pub fn get(&self, name: &str) -> Option<&VenueDescriptor> {
        self.venues.iter().find(|venue| venue.name == name)
    }

    pub fn router_for(&self, name: &str) -> Option<Address> {
        self.get(name).and_then(|venue| venue.router)
    }
}
