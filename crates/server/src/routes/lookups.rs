use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{priority::Priority, status::Status, user::User};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// Pick-list data for the create/edit forms.

pub async fn get_statuses(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Status>>>, ApiError> {
    let statuses = Status::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(statuses)))
}

pub async fn get_priorities(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Priority>>>, ApiError> {
    let priorities = Priority::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(priorities)))
}

pub async fn get_supervisors(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = User::find_supervisors_and_admins(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/statuses", get(get_statuses))
        .route("/priorities", get(get_priorities))
        .route("/supervisors", get(get_supervisors))
}
