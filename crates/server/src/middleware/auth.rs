use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::user::User;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the acting user from the identity header set by the upstream auth
/// layer, and thread it through the request as an extension. Session and
/// credential handling live outside this service.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uuid>().ok())
        .ok_or_else(|| ApiError::Unauthorized.into_response())?;

    let user = User::find_by_id(&state.db().pool, user_id)
        .await
        .map_err(|err| ApiError::from(err).into_response())?
        .ok_or_else(|| ApiError::Unauthorized.into_response())?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
