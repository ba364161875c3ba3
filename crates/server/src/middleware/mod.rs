mod auth;
mod model_loaders;

pub use auth::require_user;
pub use model_loaders::{
    load_project_middleware, load_sub_task_middleware, load_task_middleware,
};
