use axum::{
    Extension, Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::{oauth_status::OAuthStatus, user::User};
use serde::{Deserialize, Serialize};
use services::policy;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct OAuthSettings {
    pub enabled: bool,
}

pub async fn get_oauth_settings(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<OAuthSettings>>, ApiError> {
    let enabled = OAuthStatus::is_enabled(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(OAuthSettings { enabled })))
}

pub async fn update_oauth_settings(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Json(payload): Json<OAuthSettings>,
) -> Result<ResponseJson<ApiResponse<OAuthSettings>>, ApiError> {
    if !policy::can_manage_oauth_settings(&acting) {
        return Err(ApiError::Forbidden);
    }

    let enabled = OAuthStatus::toggle(&state.db().pool, payload.enabled).await?;
    Ok(ResponseJson(ApiResponse::success(OAuthSettings { enabled })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings/oauth", get(get_oauth_settings))
        .route("/settings/oauth", put(update_oauth_settings))
}
