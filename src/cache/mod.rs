//! Short-lived response cache for the front page.

pub mod config;
mod lock;
pub mod middleware;
pub mod store;

pub use config::CacheConfig;
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedResponse, PageCache};
