pub mod group;
pub mod health;
pub mod teacher;
