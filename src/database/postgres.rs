// Postgres 群组存储
// 阶段数据以 JSONB 数组保存在 days 列中

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::store::{GroupStore, StoreError};
use crate::models::{
    Grading, Group, NewGroup, ProjectType, StageRecord, check_day,
};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS journal_groups (
    id            TEXT PRIMARY KEY,
    group_name    TEXT        NOT NULL,
    members       JSONB       NOT NULL,
    project_type  TEXT,
    days          JSONB       NOT NULL,
    grading       JSONB       NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const GROUP_COLUMNS: &str =
    "id, group_name, members, project_type, days, grading, created_at, updated_at";

/// 数据库行
#[derive(Debug, FromRow)]
struct GroupRow {
    id: String,
    group_name: String,
    members: Json<Vec<String>>,
    project_type: Option<String>,
    days: Json<Vec<Option<StageRecord>>>,
    grading: Json<Grading>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, stage_count: usize) -> Group {
        let mut stages: Vec<StageRecord> = self
            .days
            .0
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        if stages.len() < stage_count {
            stages.resize(stage_count, StageRecord::default());
        }

        // 旧数据中未知的类型同样按 podcast 处理
        let project_type = self
            .project_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(ProjectType::Podcast);

        Group {
            id: self.id,
            group_name: self.group_name,
            members: self.members.0,
            project_type,
            stages,
            grading: self.grading.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct PgGroupStore {
    pool: PgPool,
    stage_count: usize,
}

impl PgGroupStore {
    pub fn new(pool: PgPool, stage_count: usize) -> Self {
        Self { pool, stage_count }
    }

    /// 启动时建表
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        tracing::info!("journal_groups table ready");
        Ok(())
    }
}

#[async_trait]
impl GroupStore for PgGroupStore {
    fn stage_count(&self) -> usize {
        self.stage_count
    }

    async fn create(&self, new_group: NewGroup) -> Result<Group, StoreError> {
        // 主键冲突时重新生成 ID
        loop {
            let id = Uuid::new_v4().to_string();
            let group = Group::new(id, new_group.clone(), self.stage_count);

            let row = sqlx::query_as::<_, GroupRow>(&format!(
                r#"
                INSERT INTO journal_groups (
                    id, group_name, members, project_type, days, grading, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                RETURNING {}
                "#,
                GROUP_COLUMNS
            ))
            .bind(&group.id)
            .bind(&group.group_name)
            .bind(Json(&group.members))
            .bind(group.project_type.as_str())
            .bind(Json(&group.stages))
            .bind(Json(&group.grading))
            .bind(group.created_at)
            .bind(group.updated_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return Ok(row.into_group(self.stage_count));
            }
            tracing::warn!("Group id collision, retrying");
        }
    }

    async fn get(&self, id: &str) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {} FROM journal_groups WHERE id = $1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_group(self.stage_count))
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {} FROM journal_groups ORDER BY created_at",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_group(self.stage_count))
            .collect())
    }

    async fn replace_stage(
        &self,
        id: &str,
        day: usize,
        stage: StageRecord,
    ) -> Result<Group, StoreError> {
        let day = check_day(day as i64, self.stage_count)?;
        let path = vec![(day - 1).to_string()];

        // 单条 UPDATE 只改动一个数组元素，其他阶段的并发写入不受影响
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            r#"
            UPDATE journal_groups
            SET days = jsonb_set(days, $2::text[], $3::jsonb, true),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(&path)
        .bind(Json(&stage))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_group(self.stage_count))
            .ok_or(StoreError::NotFound)
    }

    async fn replace_grading(&self, id: &str, grading: Grading) -> Result<Group, StoreError> {
        grading.validate()?;

        let row = sqlx::query_as::<_, GroupRow>(&format!(
            r#"
            UPDATE journal_groups
            SET grading = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(Json(&grading))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_group(self.stage_count))
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM journal_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
