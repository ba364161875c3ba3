pub mod comments;
pub mod dashboard;
pub mod health;
pub mod logs;
pub mod lookups;
pub mod projects;
pub mod settings;
pub mod sub_tasks;
pub mod tasks;
pub mod users;
pub mod work_items;
