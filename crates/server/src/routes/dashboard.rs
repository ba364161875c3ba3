use axum::{
    Extension, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{Paginated, user::User, work_item::WorkItem};
use services::dashboard::{self, DashboardQuery};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// One feed across projects, tasks, and sub-tasks, filtered to what the
/// acting user may see.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Query(query): Query<DashboardQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<WorkItem>>>, ApiError> {
    let feed = dashboard::fetch(&state.db().pool, &acting, &query).await?;
    Ok(ResponseJson(ApiResponse::success(feed)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}
