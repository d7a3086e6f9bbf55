use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Connection settings for the JSON-RPC venue source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP RPC URL used for `eth_call`
    pub rpc_http_url: String,
    /// Timeout for a single HTTP request in seconds
    pub http_timeout_secs: u64,
    /// Budget for one venue's resolve + reserves read in milliseconds
    pub venue_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { rpc_http_url: "http://127.0.0.1:8545".to_string(), http_timeout_secs: 10, venue_timeout_ms: 2_000 }
    }
}

impl RpcConfig {
    /// Load configuration from environment variables (and `.env`)
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(rpc_http_url) = std::env::var("RPC_HTTP_URL") {
            let _url = Url::parse(&rpc_http_url).map_err(|e| eyre::eyre!("Invalid RPC_HTTP_URL: {}", e))?;
            config.rpc_http_url = rpc_http_url;
        }

        if let Ok(timeout_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs =
                timeout_str.parse().map_err(|e| eyre::eyre!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("VENUE_TIMEOUT_MS") {
            config.venue_timeout_ms = timeout_str.parse().map_err(|e| eyre::eyre!("Invalid VENUE_TIMEOUT_MS: {}", e))?;
        }

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn venue_timeout(&self) -> Duration {
        Duration::from_millis(self.venue_timeout_ms)
    }
}
