// 带 Redis 读缓存的群组存储
// 读：未命中时按版本号回填；写、删除：完成后使缓存失效

use std::sync::Arc;

use async_trait::async_trait;
use redis::Client as RedisClient;

use crate::cache::operations::{GroupCache, GroupCacheOperations};
use crate::database::{GroupStore, StoreError};
use crate::models::{Grading, Group, NewGroup, StageRecord};

pub struct CachedGroupStore<S, C = GroupCacheOperations> {
    inner: S,
    cache: C,
}

impl<S: GroupStore> CachedGroupStore<S> {
    pub fn new(inner: S, redis: Arc<RedisClient>, ttl: u64) -> Self {
        Self::with_cache(inner, GroupCacheOperations::new(redis, ttl))
    }
}

impl<S: GroupStore, C: GroupCache> CachedGroupStore<S, C> {
    pub fn with_cache(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    // 缓存失败只记录日志，不影响请求结果
    async fn invalidate(&self, id: &str) {
        if let Err(e) = self.cache.invalidate(id).await {
            tracing::warn!("Failed to invalidate cached group {}: {}", id, e);
        }
    }
}

#[async_trait]
impl<S: GroupStore, C: GroupCache> GroupStore for CachedGroupStore<S, C> {
    fn stage_count(&self) -> usize {
        self.inner.stage_count()
    }

    async fn create(&self, new_group: NewGroup) -> Result<Group, StoreError> {
        self.inner.create(new_group).await
    }

    async fn get(&self, id: &str) -> Result<Group, StoreError> {
        match self.cache.get_cached_group(id).await {
            Ok(Some(group)) => {
                tracing::debug!("Get group from cache: {}", id);
                return Ok(group);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Group cache read failed for {}: {}", id, e),
        }

        // 版本号必须在读存储之前取得
        let seen = match self.cache.generation(id).await {
            Ok(seen) => Some(seen),
            Err(e) => {
                tracing::warn!("Group cache generation read failed for {}: {}", id, e);
                None
            }
        };

        let group = self.inner.get(id).await?;

        if let Some(seen) = seen {
            match self.cache.fill_if_unchanged(&group, &seen).await {
                Ok(true) => tracing::debug!("Set group to cache: {}", id),
                Ok(false) => tracing::debug!("Skipped cache fill for {}, group changed", id),
                Err(e) => tracing::warn!("Failed to cache group {}: {}", id, e),
            }
        }
        Ok(group)
    }

    async fn list(&self) -> Result<Vec<Group>, StoreError> {
        self.inner.list().await
    }

    async fn replace_stage(
        &self,
        id: &str,
        day: usize,
        stage: StageRecord,
    ) -> Result<Group, StoreError> {
        let group = self.inner.replace_stage(id, day, stage).await?;
        self.invalidate(id).await;
        Ok(group)
    }

    async fn replace_grading(&self, id: &str, grading: Grading) -> Result<Group, StoreError> {
        let group = self.inner.replace_grading(id, grading).await?;
        self.invalidate(id).await;
        Ok(group)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self.inner.delete(id).await;
        self.invalidate(id).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryGroupStore;
    use crate::models::{ProjectType, StageValue};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::{Mutex, Notify};

    /// 进程内的缓存实现，语义与 Redis 脚本一致
    #[derive(Default)]
    struct MemoryCache {
        groups: Mutex<HashMap<String, Group>>,
        generations: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl GroupCache for MemoryCache {
        async fn generation(&self, group_id: &str) -> Result<String, redis::RedisError> {
            let generations = self.generations.lock().await;
            Ok(generations
                .get(group_id)
                .map(|g| g.to_string())
                .unwrap_or_default())
        }

        async fn get_cached_group(
            &self,
            group_id: &str,
        ) -> Result<Option<Group>, redis::RedisError> {
            Ok(self.groups.lock().await.get(group_id).cloned())
        }

        async fn fill_if_unchanged(
            &self,
            group: &Group,
            seen_generation: &str,
        ) -> Result<bool, redis::RedisError> {
            let generations = self.generations.lock().await;
            let current = generations
                .get(&group.id)
                .map(|g| g.to_string())
                .unwrap_or_default();
            if current != seen_generation {
                return Ok(false);
            }
            self.groups
                .lock()
                .await
                .insert(group.id.clone(), group.clone());
            Ok(true)
        }

        async fn invalidate(&self, group_id: &str) -> Result<(), redis::RedisError> {
            let mut generations = self.generations.lock().await;
            *generations.entry(group_id.to_string()).or_insert(0) += 1;
            self.groups.lock().await.remove(group_id);
            Ok(())
        }
    }

    /// 读取记录后暂停，等待测试放行，用于构造并发交错
    struct PausingStore {
        inner: MemoryGroupStore,
        pause_next_get: AtomicBool,
        read_done: Notify,
        resume: Notify,
    }

    impl PausingStore {
        fn new() -> Self {
            Self {
                inner: MemoryGroupStore::new(5),
                pause_next_get: AtomicBool::new(false),
                read_done: Notify::new(),
                resume: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl GroupStore for PausingStore {
        fn stage_count(&self) -> usize {
            self.inner.stage_count()
        }

        async fn create(&self, new_group: NewGroup) -> Result<Group, StoreError> {
            self.inner.create(new_group).await
        }

        async fn get(&self, id: &str) -> Result<Group, StoreError> {
            let result = self.inner.get(id).await;
            if self.pause_next_get.swap(false, Ordering::SeqCst) {
                self.read_done.notify_one();
                self.resume.notified().await;
            }
            result
        }

        async fn list(&self) -> Result<Vec<Group>, StoreError> {
            self.inner.list().await
        }

        async fn replace_stage(
            &self,
            id: &str,
            day: usize,
            stage: StageRecord,
        ) -> Result<Group, StoreError> {
            self.inner.replace_stage(id, day, stage).await
        }

        async fn replace_grading(&self, id: &str, grading: Grading) -> Result<Group, StoreError> {
            self.inner.replace_grading(id, grading).await
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }
    }

    fn team() -> NewGroup {
        NewGroup::new("Team A", &["Al".to_string()], ProjectType::Podcast).unwrap()
    }

    fn cached<S: GroupStore>(inner: S) -> CachedGroupStore<S, MemoryCache> {
        CachedGroupStore::with_cache(inner, MemoryCache::default())
    }

    #[tokio::test]
    async fn get_fills_cache_on_miss() {
        let store = cached(MemoryGroupStore::new(5));
        let group = store.create(team()).await.unwrap();
        assert!(store.cache.get_cached_group(&group.id).await.unwrap().is_none());

        let fetched = store.get(&group.id).await.unwrap();
        assert_eq!(fetched, group);
        assert_eq!(
            store.cache.get_cached_group(&group.id).await.unwrap(),
            Some(group)
        );
    }

    #[tokio::test]
    async fn writes_invalidate_cached_group() {
        let store = cached(MemoryGroupStore::new(5));
        let group = store.create(team()).await.unwrap();
        store.get(&group.id).await.unwrap();

        let stage = StageRecord::default().with_field("topic", "x");
        store.replace_stage(&group.id, 1, stage.clone()).await.unwrap();
        assert!(store.cache.get_cached_group(&group.id).await.unwrap().is_none());
        assert_eq!(store.get(&group.id).await.unwrap().stage(1), Some(&stage));

        let grading = Grading {
            vocabulary: 3,
            ..Grading::default()
        };
        store.replace_grading(&group.id, grading.clone()).await.unwrap();
        assert_eq!(store.get(&group.id).await.unwrap().grading, grading);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = cached(MemoryGroupStore::new(5));
        let group = store.create(team()).await.unwrap();
        store.get(&group.id).await.unwrap();

        store.delete(&group.id).await.unwrap();
        assert!(matches!(store.get(&group.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(&group.id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn read_racing_a_delete_does_not_repopulate_cache() {
        let store = Arc::new(cached(PausingStore::new()));
        let group = store.create(team()).await.unwrap();

        store.inner.pause_next_get.store(true, Ordering::SeqCst);
        let reader = {
            let store = store.clone();
            let id = group.id.clone();
            tokio::spawn(async move { store.get(&id).await })
        };

        // 读请求已读到旧记录，此时删除
        store.inner.read_done.notified().await;
        store.delete(&group.id).await.unwrap();
        store.inner.resume.notify_one();

        assert!(reader.await.unwrap().is_ok());
        assert!(store.cache.get_cached_group(&group.id).await.unwrap().is_none());
        assert!(matches!(store.get(&group.id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn read_racing_a_save_does_not_cache_old_stage() {
        let store = Arc::new(cached(PausingStore::new()));
        let group = store.create(team()).await.unwrap();

        store.inner.pause_next_get.store(true, Ordering::SeqCst);
        let reader = {
            let store = store.clone();
            let id = group.id.clone();
            tokio::spawn(async move { store.get(&id).await })
        };

        store.inner.read_done.notified().await;
        let stage = StageRecord::default()
            .with_field("topic", "x")
            .with_completed(true);
        store.replace_stage(&group.id, 2, stage.clone()).await.unwrap();
        store.inner.resume.notify_one();

        reader.await.unwrap().unwrap();
        assert_eq!(store.get(&group.id).await.unwrap().stage(2), Some(&stage));
    }

    #[tokio::test]
    async fn concurrent_saves_to_different_days_all_visible() {
        let store = Arc::new(cached(MemoryGroupStore::new(5)));
        let group = store.create(team()).await.unwrap();
        store.get(&group.id).await.unwrap();

        let mut handles = Vec::new();
        for day in 1..=5 {
            let store = store.clone();
            let id = group.id.clone();
            handles.push(tokio::spawn(async move {
                let stage =
                    StageRecord::default().with_field("answer", format!("day {}", day).as_str());
                store.replace_stage(&id, day, stage).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stored = store.get(&group.id).await.unwrap();
        for day in 1..=5 {
            assert_eq!(
                stored.stage(day).unwrap().fields.get("answer"),
                Some(&StageValue::Text(format!("day {}", day)))
            );
        }
    }
}
