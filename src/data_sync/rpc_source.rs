use super::venue_source::{Reserves, VenueError, VenueSource};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

sol! {
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

/// [`VenueSource`] over a JSON-RPC node using plain `eth_call`s.
#[derive(Debug)]
pub struct RpcVenueSource {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl RpcVenueSource {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, VenueError> {
        let http_client =
            reqwest::Client::builder().timeout(timeout).build().map_err(|e| VenueError::Transport(e.to_string()))?;

        Ok(Self { http_client, rpc_url, request_id: AtomicU64::new(1) })
    }

    pub fn encode_get_pair(token_a: Address, token_b: Address) -> Bytes {
        IUniswapV2Factory::getPairCall { tokenA: token_a, tokenB: token_b }.abi_encode().into()
    }

    pub fn decode_get_pair(data: &[u8]) -> Result<Option<Address>, VenueError> {
        let pair = IUniswapV2Factory::getPairCall::abi_decode_returns(data).map_err(|e| VenueError::Decode(e.to_string()))?;
        Ok((!pair.is_zero()).then_some(pair))
    }

    pub fn decode_get_reserves(data: &[u8]) -> Result<Reserves, VenueError> {
        let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(data).map_err(|e| VenueError::Decode(e.to_string()))?;
        Ok(Reserves::new(U256::from(reserves.reserve0), U256::from(reserves.reserve1), reserves.blockTimestampLast))
    }

    /// Make a contract call via RPC against the latest block.
    async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, VenueError> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{:#x}", to),
                    "data": format!("{:#x}", data)
                },
                "latest"
            ],
            "id": self.request_id.fetch_add(1, Ordering::Relaxed)
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;

        let response_json: Value = response.json().await.map_err(|e| VenueError::Transport(e.to_string()))?;

        if let Some(error) = response_json.get("error") {
            debug!("eth_call to {:#x} failed: {}", to, error);
            return Err(VenueError::Reverted(error.to_string()));
        }

        let result = response_json
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| VenueError::Decode("missing result in RPC response".to_string()))?;

        let bytes = hex::decode(result.trim_start_matches("0x")).map_err(|e| VenueError::Decode(e.to_string()))?;
        if bytes.is_empty() {
            // calling an address without code returns 0x
            warn!("eth_call to {:#x} returned no data", to);
            return Err(VenueError::Unavailable(format!("no contract at {to:#x}")));
        }
        Ok(bytes.into())
    }

    async fn call_address<C: SolCall<Return = Address> + Send>(&self, to: Address, call: C) -> Result<Address, VenueError> {
        let response = self.call_contract(to, call.abi_encode().into()).await?;
        Self::decode_address::<C>(&response)
    }

    fn decode_address<C: SolCall<Return = Address>>(data: &[u8]) -> Result<Address, VenueError> {
        C::abi_decode_returns(data).map_err(|e| VenueError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }
}

#[async_trait]
impl VenueSource for RpcVenueSource {
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Option<Address>, VenueError> {
        let response = self.call_contract(factory, Self::encode_get_pair(token_a, token_b)).await?;
        Self::decode_get_pair(&response)
    }

    async fn get_pair_tokens(&self, pair: Address) -> Result<(Address, Address), VenueError> {
        let token0 = self.call_address(pair, IUniswapV2Pair::token0Call {}).await?;
        let token1 = self.call_address(pair, IUniswapV2Pair::token1Call {}).await?;
        Ok((token0, token1))
    }

    async fn get_reserves(&self, pair: Address) -> Result<Reserves, VenueError> {
        let response = self.call_contract(pair, IUniswapV2Pair::getReservesCall {}.abi_encode().into()).await?;
        Self::decode_get_reserves(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;

    #[test]
    fn test_encode_get_pair() {
        let data = RpcVenueSource::encode_get_pair(Address::repeat_byte(1), Address::repeat_byte(2));
        // selector of getPair(address,address)
        assert_eq!(&data[0..4], &[0xe6, 0xa4, 0x39, 0x05]);
        assert_eq!(data.len(), 4 + 64);
    }

    #[test]
    fn test_decode_zero_pair_is_not_found() {
        let encoded = Address::ZERO.abi_encode();
        assert_eq!(RpcVenueSource::decode_get_pair(&encoded).unwrap(), None);

        let pair = Address::repeat_byte(0x42);
        assert_eq!(RpcVenueSource::decode_get_pair(&pair.abi_encode()).unwrap(), Some(pair));
    }

    #[test]
    fn test_decode_get_reserves() {
        let encoded = (U256::from(1_000u64), U256::from(2_000u64), U256::from(77u64)).abi_encode_params();
        let reserves = RpcVenueSource::decode_get_reserves(&encoded).unwrap();
        assert_eq!(reserves.reserve0, U256::from(1_000u64));
        assert_eq!(reserves.reserve1, U256::from(2_000u64));
        assert_eq!(reserves.block_timestamp_last, 77);
    }

    #[test]
    fn test_pair_tokens_decode_with_their_own_call() {
        let token1 = Address::repeat_byte(0x22);
        assert_eq!(RpcVenueSource::decode_address::<IUniswapV2Pair::token1Call>(&token1.abi_encode()).unwrap(), token1);
        assert_ne!(IUniswapV2Pair::token0Call::SELECTOR, IUniswapV2Pair::token1Call::SELECTOR);

        let failure = RpcVenueSource::decode_address::<IUniswapV2Pair::token1Call>(&[0u8; 4]).unwrap_err();
        assert!(matches!(failure, VenueError::Decode(reason) if reason.starts_with("token1()")));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(RpcVenueSource::decode_get_reserves(&[1, 2, 3]), Err(VenueError::Decode(_))));
    }
}
