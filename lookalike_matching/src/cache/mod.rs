// src/cache/mod.rs
pub mod result_cache;

pub use result_cache::{create_shared_cache, CacheKeyBuilder, ResultCache, SharedResultCache};
