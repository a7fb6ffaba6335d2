use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{GroupStore, StoreError};
use crate::models::{Grading, Group, NewGroup, StageRecord, check_day};

#[derive(Default)]
struct Inner {
    groups: HashMap<String, Group>,
    // 已分配过的 ID，删除后也不复用
    issued: HashSet<String>,
}

/// 进程内存储，重启后数据丢失
pub struct MemoryGroupStore {
    stage_count: usize,
    inner: RwLock<Inner>,
}

impl MemoryGroupStore {
    pub fn new(stage_count: usize) -> Self {
        Self {
            stage_count,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn fresh_id(inner: &Inner) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !inner.issued.contains(&id) {
                return id;
            }
        }
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    fn stage_count(&self) -> usize {
        self.stage_count
    }

    async fn create(&self, new_group: NewGroup) -> Result<Group, StoreError> {
        let mut inner = self.inner.write().await;
        let id = Self::fresh_id(&inner);
        let group = Group::new(id.clone(), new_group, self.stage_count);
        inner.issued.insert(id.clone());
        inner.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn get(&self, id: &str) -> Result<Group, StoreError> {
        let inner = self.inner.read().await;
        inner.groups.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Group>, StoreError> {
        let inner = self.inner.read().await;
        let mut groups: Vec<Group> = inner.groups.values().cloned().collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn replace_stage(
        &self,
        id: &str,
        day: usize,
        stage: StageRecord,
    ) -> Result<Group, StoreError> {
        let day = check_day(day as i64, self.stage_count)?;
        let mut inner = self.inner.write().await;
        let group = inner.groups.get_mut(id).ok_or(StoreError::NotFound)?;
        group.stages[day - 1] = stage;
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn replace_grading(&self, id: &str, grading: Grading) -> Result<Group, StoreError> {
        grading.validate()?;
        let mut inner = self.inner.write().await;
        let group = inner.groups.get_mut(id).ok_or(StoreError::NotFound)?;
        group.grading = grading;
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .groups
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
