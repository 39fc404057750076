//! Caching layer for analytics results.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process cache for development and tests
//! - [`NullCache`] - No-op implementation for disabled caching
//!
//! Keys come from [`CacheKeyBuilder`]; see [`keys`] for the layout.

pub mod keys;
mod memory_cache;
mod null_cache;
mod redis_cache;
pub mod scan;
mod service;

pub use keys::{CacheKeyBuilder, generate_cache_key};
pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};
