use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::{
    models::{Paginated, comment::Comment, user::User, work_item::WorkItem},
    types::WorkItemKind,
};
use services::validate::WorkItemPayload;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::load_project_middleware,
    routes::work_items::{
        self, CommentPayload, ListQuery, StatusPayload, WorkItemDetail,
    },
};

const KIND: WorkItemKind = WorkItemKind::Project;

pub async fn get_projects(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<WorkItem>>>, ApiError> {
    work_items::list(KIND, state, acting, query).await
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Json(payload): Json<WorkItemPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::create(KIND, state, acting, payload).await
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(project): Extension<WorkItem>,
) -> Result<ResponseJson<ApiResponse<WorkItemDetail>>, ApiError> {
    work_items::show(state, acting, project).await
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(project): Extension<WorkItem>,
    Json(payload): Json<WorkItemPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::edit(state, acting, project, payload).await
}

pub async fn update_project_status(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(project): Extension<WorkItem>,
    Json(payload): Json<StatusPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::update_status(state, acting, project, payload).await
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(project): Extension<WorkItem>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    work_items::delete(state, acting, project).await
}

pub async fn create_project_comment(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(project): Extension<WorkItem>,
    Json(payload): Json<CommentPayload>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    work_items::create_comment(state, acting, project, payload).await
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project_id_router = Router::new()
        .route("/", get(get_project))
        .route("/", put(update_project))
        .route("/", axum::routing::delete(delete_project))
        .route("/status", put(update_project_status))
        .route("/comments", post(create_project_comment))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    let inner = Router::new()
        .route("/", get(get_projects).post(create_project))
        .nest("/{project_id}", project_id_router);

    Router::new().nest("/projects", inner)
}
