mod handler;
mod model;

pub use handler::{
    create_group, delete_group, get_group, get_progress, list_groups, save_day, save_grading,
};
pub use model::{CreateGroupRequest, SaveDayRequest, SaveGradingRequest};
