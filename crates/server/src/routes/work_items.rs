//! Shared handlers for the three work-item kinds. The per-kind route files
//! (`projects`, `tasks`, `sub_tasks`) are thin wrappers over these; keeping
//! one implementation stops the three surfaces drifting apart.

use axum::response::Json as ResponseJson;
use db::{
    TransactionTrait,
    models::{
        Paginated,
        comment::Comment,
        user::User,
        work_item::WorkItem,
    },
    types::WorkItemKind,
};
use serde::{Deserialize, Serialize};
use services::{
    policy,
    validate::{self, ValidationErrors, WorkItemPayload},
    workflow,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const LIST_PER_PAGE: u64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, TS)]
pub struct StatusPayload {
    pub status_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CommentPayload {
    pub content: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct WorkItemDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub item: WorkItem,
    pub assignees: Vec<User>,
    pub viewers: Vec<User>,
    pub comments: Vec<Comment>,
    pub children: Vec<WorkItem>,
    pub can: Permissions,
}

/// What the acting user may do with the item; rendered alongside the detail
/// so clients do not re-derive policy.
#[derive(Debug, Serialize, TS)]
pub struct Permissions {
    pub edit: bool,
    pub update_status: bool,
    pub update_status_to_done: bool,
    pub delete: bool,
    pub comment: bool,
    pub delete_comment: bool,
}

pub async fn list(
    kind: WorkItemKind,
    state: AppState,
    acting: User,
    query: ListQuery,
) -> Result<ResponseJson<ApiResponse<Paginated<WorkItem>>>, ApiError> {
    if !policy::can_view_all(&acting) {
        return Err(ApiError::Forbidden);
    }

    let page = WorkItem::find_page(
        &state.db().pool,
        kind,
        query.search.as_deref(),
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(LIST_PER_PAGE),
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn create(
    kind: WorkItemKind,
    state: AppState,
    acting: User,
    payload: WorkItemPayload,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    if !policy::can_create(&acting) {
        return Err(ApiError::Forbidden);
    }

    let pool = &state.db().pool;
    let data = validate::validate_work_item(pool, kind, &payload).await?;

    let item_id = Uuid::new_v4();
    tracing::debug!("Creating {} '{}'", kind.display_name(), data.name);

    let tx = pool.begin().await?;
    let item = WorkItem::create(&tx, kind, &data, item_id, &acting).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(item)))
}

pub async fn show(
    state: AppState,
    acting: User,
    item: WorkItem,
) -> Result<ResponseJson<ApiResponse<WorkItemDetail>>, ApiError> {
    let pool = &state.db().pool;
    let membership = WorkItem::membership(pool, item.id).await?;

    if !policy::can_view(&acting, &item, &membership) {
        return Err(ApiError::Forbidden);
    }

    let (assignees, viewers) = WorkItem::member_users(pool, item.id).await?;
    let comments = Comment::find_for_item(pool, item.id).await?;

    // Children honor the same view policy as their own show endpoints.
    let mut children = Vec::new();
    for child in WorkItem::find_children(pool, item.id).await? {
        let child_membership = WorkItem::membership(pool, child.id).await?;
        if policy::can_view(&acting, &child, &child_membership) {
            children.push(child);
        }
    }

    let can = Permissions {
        edit: policy::can_edit(&acting),
        update_status: policy::can_update_status(&acting, &membership),
        update_status_to_done: policy::can_update_status_to_done(&acting),
        delete: policy::can_delete(&acting),
        comment: policy::can_comment(&acting, &membership),
        delete_comment: policy::can_delete_comment(&acting),
    };

    Ok(ResponseJson(ApiResponse::success(WorkItemDetail {
        item,
        assignees,
        viewers,
        comments,
        children,
        can,
    })))
}

pub async fn edit(
    state: AppState,
    acting: User,
    item: WorkItem,
    payload: WorkItemPayload,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    if !policy::can_edit(&acting) {
        return Err(ApiError::Forbidden);
    }

    let pool = &state.db().pool;
    let data = validate::validate_work_item(pool, item.kind, &payload).await?;

    let tx = pool.begin().await?;
    let (updated, _changes, _entered_review) =
        WorkItem::update(&tx, item.id, &data, &acting).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn update_status(
    state: AppState,
    acting: User,
    item: WorkItem,
    payload: StatusPayload,
) -> Result<ResponseJson<ApiResponse<WorkItem>>, ApiError> {
    let Some(status_id) = payload.status_id else {
        let mut errors = ValidationErrors::default();
        errors.add(
            "status_id",
            format!("{} status is required.", item.kind.display_name()),
        );
        return Err(errors.into());
    };

    let updated = workflow::change_status(&state.db().pool, &acting, item.id, status_id).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete(
    state: AppState,
    acting: User,
    item: WorkItem,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !policy::can_delete(&acting) {
        return Err(ApiError::Forbidden);
    }

    let pool = &state.db().pool;
    let tx = pool.begin().await?;
    let rows = WorkItem::soft_delete(&tx, item.id, &acting).await?;
    tx.commit().await?;

    if rows == 0 {
        return Err(ApiError::NotFound(format!(
            "{} not found",
            item.kind.display_name()
        )));
    }

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_comment(
    state: AppState,
    acting: User,
    item: WorkItem,
    payload: CommentPayload,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let pool = &state.db().pool;
    let membership = WorkItem::membership(pool, item.id).await?;

    if !policy::can_comment(&acting, &membership) {
        return Err(ApiError::Forbidden);
    }

    let content = validate::validate_comment(payload.content.as_deref())?;

    let tx = pool.begin().await?;
    let comment = Comment::create(&tx, &item, &content, Uuid::new_v4(), &acting).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(comment)))
}
