use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::delete,
};
use db::{
    TransactionTrait,
    models::{comment::Comment, user::User},
};
use services::policy;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Path(comment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !policy::can_delete_comment(&acting) {
        return Err(ApiError::Forbidden);
    }

    let pool = &state.db().pool;
    let tx = pool.begin().await?;
    let rows = Comment::delete(&tx, comment_id, &acting).await?;
    tx.commit().await?;

    if rows == 0 {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/comments/{comment_id}", delete(delete_comment))
}
