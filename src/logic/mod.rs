/// Logic Layer
///
/// This layer is responsible for:
/// - Resolving the pool of a token pair on each venue
/// - Constant product pricing, mid price and price impact
/// - Concurrent aggregation and ranking of quotes across venues
/// - Selecting the route handed to the execution layer

pub mod aggregator;
pub mod pricing;
pub mod quote_engine;
pub mod resolver;
pub mod types;

pub use aggregator::{QuoteError, RouteAggregator, VenueOutcome, VenueScan};
pub use pricing::{PricingEngine, PricingError, price_scale};
pub use quote_engine::{QuoteEngine, QuoteEngineBuilder, QuoteEngineStats};
pub use resolver::{PoolResolver, sort_tokens};
pub use types::{PoolHandle, Quote, RouteError, RouteSelection, TokenSlot};
