use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, Script};

use crate::cache::keys::{group_generation_key, group_id_key};
use crate::models::Group;

/// 版本号键的过期时间（秒），远长于任何一次请求
const GENERATION_EXPIRE: u64 = 86_400;

// 版本号未变化时才写入缓存；ARGV[1] 为空串表示读取时版本号不存在
const FILL_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[2])
if (current or '') ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

// 递增版本号并删除缓存，两步在同一脚本中完成
const INVALIDATE_SCRIPT: &str = r#"
redis.call('INCR', KEYS[2])
redis.call('EXPIRE', KEYS[2], ARGV[1])
redis.call('DEL', KEYS[1])
return 1
"#;

/// 群组缓存
///
/// 读缓存未命中时，先取版本号，再读存储，最后仅在版本号未变时回填；
/// 写入和删除完成后使版本号失效，避免并发时旧数据覆盖新数据。
#[async_trait]
pub trait GroupCache: Send + Sync {
    /// 读取当前版本号，不存在时返回空串
    async fn generation(&self, group_id: &str) -> Result<String, redis::RedisError>;

    async fn get_cached_group(&self, group_id: &str) -> Result<Option<Group>, redis::RedisError>;

    /// 版本号仍为 `seen_generation` 时写入缓存，返回是否写入
    async fn fill_if_unchanged(
        &self,
        group: &Group,
        seen_generation: &str,
    ) -> Result<bool, redis::RedisError>;

    /// 递增版本号并删除缓存
    async fn invalidate(&self, group_id: &str) -> Result<(), redis::RedisError>;
}

/// 基于 Redis 的群组缓存操作
pub struct GroupCacheOperations {
    redis_client: Arc<RedisClient>,
    ttl: u64,
}

impl GroupCacheOperations {
    pub fn new(redis_client: Arc<RedisClient>, ttl: u64) -> Self {
        Self { redis_client, ttl }
    }
}

#[async_trait]
impl GroupCache for GroupCacheOperations {
    async fn generation(&self, group_id: &str) -> Result<String, redis::RedisError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let current: Option<String> = conn.get(group_generation_key(group_id)).await?;
        Ok(current.unwrap_or_default())
    }

    async fn get_cached_group(&self, group_id: &str) -> Result<Option<Group>, redis::RedisError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let result: Option<String> = conn.get(group_id_key(group_id)).await?;

        match result {
            Some(json) => {
                let group = serde_json::from_str(&json).map_err(|e| {
                    redis::RedisError::from((
                        redis::ErrorKind::IoError,
                        "反序列化错误",
                        e.to_string(),
                    ))
                })?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    async fn fill_if_unchanged(
        &self,
        group: &Group,
        seen_generation: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let json = serde_json::to_string(group).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "序列化错误", e.to_string()))
        })?;

        let filled: i32 = Script::new(FILL_SCRIPT)
            .key(group_id_key(&group.id))
            .key(group_generation_key(&group.id))
            .arg(seen_generation)
            .arg(json)
            .arg(self.ttl)
            .invoke_async(&mut conn)
            .await?;
        Ok(filled == 1)
    }

    async fn invalidate(&self, group_id: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: i32 = Script::new(INVALIDATE_SCRIPT)
            .key(group_id_key(group_id))
            .key(group_generation_key(group_id))
            .arg(GENERATION_EXPIRE)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
