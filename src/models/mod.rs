pub mod group;

pub use group::{
    DayProgress, Grading, Group, GroupProgress, NewGroup, ProjectType, StageRecord, StageStatus,
    StageValue, ValidationError, active_stage, check_day,
};
