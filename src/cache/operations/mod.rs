/// 缓存操作
/// 提供缓存操作的功能实现

// 群组缓存操作
pub mod group;

// 限流计数
pub mod rate_limit;

pub use group::{GroupCache, GroupCacheOperations};
pub use rate_limit::RateLimitCacheOperations;
