// 缓存模块
// 包含缓存键、Redis 操作和带缓存的群组存储

pub mod cached_store;
pub mod keys;
pub mod operations;

pub use cached_store::CachedGroupStore;
pub use operations::{GroupCache, GroupCacheOperations, RateLimitCacheOperations};
