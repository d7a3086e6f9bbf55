// Three-Layer Architecture
pub mod data_sync; // Data Layer: venue registry, venue source, JSON-RPC reads
pub mod execution; // Execution Layer: guarded swap execution
pub mod logic; // Logic Layer: pool resolution, pricing, quote aggregation

// Common utilities and types
pub mod utils;

// In-memory chain for tests, demos and benches
pub mod mock_chain;

// Re-export key components from each layer
pub use data_sync::{
    AggregatorConfigSection, FeeModel, Reserves, RpcConfig, RpcVenueSource, SwapRouterConfig, VenueDescriptor, VenueError,
    VenueRegistry, VenueSource,
};
pub use execution::{
    Clock, FailureKind, SwapExecutor, SwapFailure, SwapOutcome, SwapReceipt, SwapRequest, SwapSubstrate, SystemClock,
    TokenLedger, VenueRouter, default_deadline, min_amount_out,
};
pub use logic::{
    PoolHandle, PoolResolver, PricingEngine, PricingError, Quote, QuoteEngine, QuoteEngineBuilder, QuoteError, RouteAggregator,
    RouteSelection, VenueOutcome,
};
pub use mock_chain::{MockChain, TokenBehavior};
pub use utils::{CacheStats, PoolCache, Token, TokenWrapper};
