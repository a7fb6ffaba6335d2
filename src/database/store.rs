// 群组存储接口
// 所有后端（内存、Postgres、Redis 缓存装饰）都实现同一个 trait

use async_trait::async_trait;

use crate::models::{Grading, Group, NewGroup, StageRecord, ValidationError};

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("group not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// 群组存储
///
/// 每个操作对调用方都是原子的；同一阶段的并发写入以最后一次为准，
/// 不同阶段之间互不干扰。
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// 部署的阶段数 N
    fn stage_count(&self) -> usize;

    /// 分配新 ID 并保存，所有阶段为空
    async fn create(&self, new_group: NewGroup) -> Result<Group, StoreError>;

    async fn get(&self, id: &str) -> Result<Group, StoreError>;

    /// 顺序不作保证
    async fn list(&self) -> Result<Vec<Group>, StoreError>;

    /// 整体替换第 `day` 个阶段（不合并字段）
    async fn replace_stage(
        &self,
        id: &str,
        day: usize,
        stage: StageRecord,
    ) -> Result<Group, StoreError>;

    /// 整体替换评分表
    async fn replace_grading(&self, id: &str, grading: Grading) -> Result<Group, StoreError>;

    /// 永久删除
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
