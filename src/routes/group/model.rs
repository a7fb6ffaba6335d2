use serde::Deserialize;

use crate::models::{Grading, NewGroup, ProjectType, StageRecord, ValidationError};

/// 创建群组请求
///
/// 字段都是可选的，缺失时返回具体的校验错误而不是反序列化错误。
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<String>>,
    #[serde(default)]
    pub project_type: Option<String>,
}

impl CreateGroupRequest {
    pub fn validate(self) -> Result<NewGroup, ValidationError> {
        let project_type = ProjectType::parse_optional(self.project_type.as_deref())?;
        NewGroup::new(
            self.group_name.as_deref().unwrap_or_default(),
            self.members.as_deref().unwrap_or_default(),
            project_type,
        )
    }
}

/// 保存某一天的请求，`data` 整体替换该阶段
#[derive(Debug, Deserialize)]
pub struct SaveDayRequest {
    pub day: i64,
    pub data: StageRecord,
}

#[derive(Debug, Deserialize)]
pub struct SaveGradingRequest {
    pub grading: Grading,
}
