pub mod venue;
pub mod venue_config;

pub use venue::{FeeModel, VenueDescriptor, VenueRegistry, VenueRegistryError};
pub use venue_config::{AggregatorConfigSection, SwapRouterConfig, SwapRouterConfigRoot};
