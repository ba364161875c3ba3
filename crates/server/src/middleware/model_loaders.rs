use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::{models::work_item::WorkItem, types::WorkItemKind};
use uuid::Uuid;

use crate::AppState;

async fn load_work_item_middleware(
    state: AppState,
    kind: WorkItemKind,
    item_id: Uuid,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match WorkItem::find_by_id(&state.db().pool, item_id).await {
        Ok(Some(item)) if item.kind == kind => {
            request.extensions_mut().insert(item);
            Ok(next.run(request).await)
        }
        Ok(_) => {
            tracing::warn!("{} {item_id} not found", kind.display_name());
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {} {item_id}: {error}", kind.display_name());
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn load_project_middleware(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_work_item_middleware(state, WorkItemKind::Project, project_id, request, next).await
}

pub async fn load_task_middleware(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_work_item_middleware(state, WorkItemKind::Task, task_id, request, next).await
}

pub async fn load_sub_task_middleware(
    State(state): State<AppState>,
    Path(sub_task_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_work_item_middleware(state, WorkItemKind::SubTask, sub_task_id, request, next).await
}
