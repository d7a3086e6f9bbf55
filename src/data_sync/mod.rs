/// Data Layer
///
/// Read access to the venues the aggregator searches:
/// - Venue descriptors and the immutable venue registry
/// - The `VenueSource` seam (pair lookup, token order, reserves)
/// - A JSON-RPC implementation of that seam

pub mod config;
pub mod rpc_source;
pub mod venue_source;
pub mod venues;

pub use config::RpcConfig;
pub use rpc_source::RpcVenueSource;
pub use venue_source::{Reserves, VenueError, VenueSource};
pub use venues::{
    AggregatorConfigSection, FeeModel, SwapRouterConfig, SwapRouterConfigRoot, VenueDescriptor, VenueRegistry,
    VenueRegistryError,
};
