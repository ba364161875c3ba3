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
    middleware::load_sub_task_middleware,
    routes::work_items::{
        self, CommentPayload, ListQuery, StatusPayload, WorkItemDetail,
    },
};

const KIND: WorkItemKind = WorkItemKind::SubTask;

pub async fn get_sub_tasks(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<WorkItem>>>, ApiError> {
    work_items::list(KIND, state, acting, query).await
}

pub async fn create_sub_task(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Json(payload): Json<WorkItemPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::create(KIND, state, acting, payload).await
}

pub async fn get_sub_task(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(sub_task): Extension<WorkItem>,
) -> Result<ResponseJson<ApiResponse<WorkItemDetail>>, ApiError> {
    work_items::show(state, acting, sub_task).await
}

pub async fn update_sub_task(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(sub_task): Extension<WorkItem>,
    Json(payload): Json<WorkItemPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::edit(state, acting, sub_task, payload).await
}

pub async fn update_sub_task_status(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(sub_task): Extension<WorkItem>,
    Json(payload): Json<StatusPayload>,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    work_items::update_status(state, acting, sub_task, payload).await
}

pub async fn delete_sub_task(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(sub_task): Extension<WorkItem>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    work_items::delete(state, acting, sub_task).await
}

pub async fn create_sub_task_comment(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Extension(sub_task): Extension<WorkItem>,
    Json(payload): Json<CommentPayload>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    work_items::create_comment(state, acting, sub_task, payload).await
}

pub fn router(state: &AppState) -> Router<AppState> {
    let sub_task_id_router = Router::new()
        .route("/", get(get_sub_task))
        .route("/", put(update_sub_task))
        .route("/", axum::routing::delete(delete_sub_task))
        .route("/status", put(update_sub_task_status))
        .route("/comments", post(create_sub_task_comment))
        .layer(from_fn_with_state(state.clone(), load_sub_task_middleware));

    let inner = Router::new()
        .route("/", get(get_sub_tasks).post(create_sub_task))
        .nest("/{sub_task_id}", sub_task_id_router);

    Router::new().nest("/sub-tasks", inner)
}
