use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// 每个评分项的最高分
pub const MAX_CRITERION_SCORE: u8 = 4;

/// 评分项数量
pub const CRITERIA_COUNT: u32 = 6;

/// 允许部署的阶段数（天数）
pub const SUPPORTED_STAGE_COUNTS: [usize; 2] = [5, 6];

/// 输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("group name required")]
    MissingGroupName,
    #[error("at least one member required")]
    NoMembers,
    #[error("invalid project type: {0}")]
    InvalidProjectType(String),
    #[error("day must be between 1 and {max}, got {day}")]
    DayOutOfRange { day: i64, max: usize },
    #[error("{criterion} must be between 0 and {max}, got {score}", max = MAX_CRITERION_SCORE)]
    ScoreOutOfRange { criterion: &'static str, score: u8 },
}

/// 项目类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Podcast,
    Vlog,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Podcast => "podcast",
            ProjectType::Vlog => "vlog",
        }
    }

    /// 缺省或空白一律视为 podcast
    pub fn parse_optional(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(ProjectType::Podcast),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for ProjectType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "podcast" => Ok(ProjectType::Podcast),
            "vlog" => Ok(ProjectType::Vlog),
            other => Err(ValidationError::InvalidProjectType(other.to_string())),
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段字段值：只接受文本或布尔
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    Flag(bool),
    Text(String),
}

impl From<&str> for StageValue {
    fn from(value: &str) -> Self {
        StageValue::Text(value.to_string())
    }
}

impl From<bool> for StageValue {
    fn from(value: bool) -> Self {
        StageValue::Flag(value)
    }
}

/// 单个阶段的答题记录
///
/// `completed` 是唯一的保留字段，其余字段原样保存，服务端不做白名单校验。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, StageValue>,
}

/// 阶段状态，由记录内容推导，不单独存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Complete,
}

impl StageRecord {
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.fields.is_empty()
    }

    pub fn status(&self) -> StageStatus {
        if self.is_completed() {
            StageStatus::Complete
        } else if self.is_empty() {
            StageStatus::NotStarted
        } else {
            StageStatus::InProgress
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<StageValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// 当前阶段：第一个未完成的阶段（从 1 开始）；全部完成时为最后一个阶段
pub fn active_stage(stages: &[StageRecord]) -> usize {
    stages
        .iter()
        .position(|s| !s.is_completed())
        .map(|i| i + 1)
        .unwrap_or(stages.len())
}

/// 教师评分表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grading {
    #[serde(default)]
    pub structure: u8,
    #[serde(default)]
    pub second_conditional: u8,
    #[serde(default)]
    pub indefinite_pronouns: u8,
    #[serde(default)]
    pub vocabulary: u8,
    #[serde(default)]
    pub pronunciation: u8,
    #[serde(default)]
    pub participation: u8,
    #[serde(default)]
    pub comments: String,
}

impl Grading {
    fn criteria(&self) -> [(&'static str, u8); 6] {
        [
            ("structure", self.structure),
            ("second_conditional", self.second_conditional),
            ("indefinite_pronouns", self.indefinite_pronouns),
            ("vocabulary", self.vocabulary),
            ("pronunciation", self.pronunciation),
            ("participation", self.participation),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self
            .criteria()
            .into_iter()
            .find(|(_, score)| *score > MAX_CRITERION_SCORE)
        {
            Some((criterion, score)) => Err(ValidationError::ScoreOutOfRange { criterion, score }),
            None => Ok(()),
        }
    }

    pub fn total(&self) -> u32 {
        self.criteria().iter().map(|(_, s)| *s as u32).sum()
    }

    pub fn max_total() -> u32 {
        CRITERIA_COUNT * MAX_CRITERION_SCORE as u32
    }

    pub fn percentage(&self) -> u32 {
        (self.total() as f64 / Self::max_total() as f64 * 100.0).round() as u32
    }
}

/// 创建群组的已校验参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub group_name: String,
    pub members: Vec<String>,
    pub project_type: ProjectType,
}

impl NewGroup {
    /// 去掉首尾空白，丢弃空成员；名称为空或没有成员时拒绝
    pub fn new(
        group_name: &str,
        members: &[String],
        project_type: ProjectType,
    ) -> Result<Self, ValidationError> {
        let group_name = group_name.trim();
        if group_name.is_empty() {
            return Err(ValidationError::MissingGroupName);
        }

        let members: Vec<String> = members
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        if members.is_empty() {
            return Err(ValidationError::NoMembers);
        }

        Ok(Self {
            group_name: group_name.to_string(),
            members,
            project_type,
        })
    }
}

/// 学生小组的项目记录
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "GroupRepr")]
pub struct Group {
    pub id: String,
    pub group_name: String,
    pub members: Vec<String>,
    pub project_type: ProjectType,
    /// day1..dayN，下标 0 对应 day1
    pub stages: Vec<StageRecord>,
    pub grading: Grading,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// 新建记录，所有阶段为空
    pub fn new(id: String, new_group: NewGroup, stage_count: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            group_name: new_group.group_name,
            members: new_group.members,
            project_type: new_group.project_type,
            stages: vec![StageRecord::default(); stage_count],
            grading: Grading::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// 按天数（从 1 开始）取阶段
    pub fn stage(&self, day: usize) -> Option<&StageRecord> {
        day.checked_sub(1).and_then(|i| self.stages.get(i))
    }

    pub fn completed_days(&self) -> usize {
        self.stages.iter().filter(|s| s.is_completed()).count()
    }

    pub fn active_day(&self) -> usize {
        active_stage(&self.stages)
    }

    pub fn progress(&self) -> GroupProgress {
        GroupProgress::from(self)
    }
}

/// 校验天数是否在 [1, stage_count] 内
pub fn check_day(day: i64, stage_count: usize) -> Result<usize, ValidationError> {
    if day >= 1 && (day as u64) <= stage_count as u64 {
        Ok(day as usize)
    } else {
        Err(ValidationError::DayOutOfRange {
            day,
            max: stage_count,
        })
    }
}

fn day_key(day: usize) -> String {
    format!("day{}", day)
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7 + self.stages.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("group_name", &self.group_name)?;
        map.serialize_entry("members", &self.members)?;
        map.serialize_entry("project_type", &self.project_type)?;
        for (i, stage) in self.stages.iter().enumerate() {
            map.serialize_entry(&day_key(i + 1), stage)?;
        }
        map.serialize_entry("grading", &self.grading)?;
        map.serialize_entry("created_at", &self.created_at)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        map.end()
    }
}

// 扁平的 JSON 形式，dayN 字段收集在 days 中
#[derive(Deserialize)]
struct GroupRepr {
    id: String,
    group_name: String,
    members: Vec<String>,
    #[serde(default)]
    project_type: Option<ProjectType>,
    #[serde(default)]
    grading: Grading,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    days: BTreeMap<String, Option<StageRecord>>,
}

impl TryFrom<GroupRepr> for Group {
    type Error = String;

    fn try_from(repr: GroupRepr) -> Result<Self, Self::Error> {
        let mut numbered = Vec::with_capacity(repr.days.len());
        for (key, stage) in repr.days {
            let day = key
                .strip_prefix("day")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| format!("unexpected field `{}`", key))?;
            numbered.push((day, stage.unwrap_or_default()));
        }
        numbered.sort_by_key(|(day, _)| *day);

        let count = numbered.last().map(|(day, _)| *day).unwrap_or(0);
        let mut stages = vec![StageRecord::default(); count];
        for (day, stage) in numbered {
            stages[day - 1] = stage;
        }

        Ok(Group {
            id: repr.id,
            group_name: repr.group_name,
            members: repr.members,
            project_type: repr.project_type.unwrap_or_default(),
            stages,
            grading: repr.grading,
            created_at: repr.created_at,
            updated_at: repr.updated_at,
        })
    }
}

/// 单个阶段的进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayProgress {
    pub day: usize,
    pub status: StageStatus,
}

/// 群组进度汇总，每次读取时计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupProgress {
    pub group_id: String,
    pub days: Vec<DayProgress>,
    pub completed_days: usize,
    pub total_days: usize,
    pub active_day: usize,
    pub grading_total: u32,
    pub grading_max: u32,
    pub grading_percentage: u32,
}

impl From<&Group> for GroupProgress {
    fn from(group: &Group) -> Self {
        Self {
            group_id: group.id.clone(),
            days: group
                .stages
                .iter()
                .enumerate()
                .map(|(i, s)| DayProgress {
                    day: i + 1,
                    status: s.status(),
                })
                .collect(),
            completed_days: group.completed_days(),
            total_days: group.stage_count(),
            active_day: group.active_day(),
            grading_total: group.grading.total(),
            grading_max: Grading::max_total(),
            grading_percentage: group.grading.percentage(),
        }
    }
}
