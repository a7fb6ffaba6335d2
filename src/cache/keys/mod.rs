/// 缓存键模块
/// 提供各种缓存键生成函数

// 群组缓存键模块
pub mod group_keys;

// 限流缓存键模块
pub mod rate_limit_keys;

pub use group_keys::{group_generation_key, group_id_key};
pub use rate_limit_keys::rate_limit_key;
