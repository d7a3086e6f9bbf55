pub mod cache;
pub mod config_loader;
pub mod constants;
pub mod token;

pub use cache::{CacheItem, CacheStats, PoolCache};
pub use config_loader::*;
pub use constants::*;
pub use token::{Token, TokenWrapper};
