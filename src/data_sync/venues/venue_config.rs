use super::venue::{VenueDescriptor, VenueRegistry};
use crate::utils::config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Deserialize, Debug)]
pub struct SwapRouterConfigRoot {
    #[serde(default)]
    pub aggregator: AggregatorConfigSection,
    pub venues: Vec<VenueDescriptor>,
}

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AggregatorConfigSection {
    /// Per-venue budget for resolve + reserves read.
    pub venue_timeout_ms: u64,
    /// 0 disables the pool cache.
    pub pool_cache_ttl_secs: u64,
    pub default_slippage_bps: u64,
}

impl Default for AggregatorConfigSection {
    fn default() -> Self {
        Self { venue_timeout_ms: 2_000, pool_cache_ttl_secs: 300, default_slippage_bps: 50 }
    }
}

impl AggregatorConfigSection {
    pub fn venue_timeout(&self) -> Duration {
        Duration::from_millis(self.venue_timeout_ms)
    }

    pub fn pool_cache_ttl(&self) -> Option<Duration> {
        (self.pool_cache_ttl_secs > 0).then(|| Duration::from_secs(self.pool_cache_ttl_secs))
    }
}

/// Loaded configuration: aggregator settings plus the validated venue registry.
#[derive(Clone, Debug)]
pub struct SwapRouterConfig {
    pub aggregator: AggregatorConfigSection,
    pub registry: VenueRegistry,
}

impl TryFrom<SwapRouterConfigRoot> for SwapRouterConfig {
    type Error = LoadConfigError;

    fn try_from(root: SwapRouterConfigRoot) -> Result<Self, Self::Error> {
        if root.aggregator.default_slippage_bps > 10_000 {
            return Err(LoadConfigError::ConfigError(format!(
                "default_slippage_bps {} exceeds 10000",
                root.aggregator.default_slippage_bps
            )));
        }
        let registry = VenueRegistry::new(root.venues).map_err(|e| LoadConfigError::ConfigError(e.to_string()))?;
        Ok(Self { aggregator: root.aggregator, registry })
    }
}

#[async_trait]
impl ConfigLoader for SwapRouterConfig {
    type SectionType = SwapRouterConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SwapRouterConfigRoot = load_from_file(file_name).await?;
        root.try_into()
    }
}

impl ConfigLoaderSync for SwapRouterConfig {
    type SectionType = SwapRouterConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SwapRouterConfigRoot = load_from_file_sync(file_name)?;
        root.try_into()
    }
}
