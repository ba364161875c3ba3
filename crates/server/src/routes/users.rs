use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use db::models::user::{CreateUser, UpdateUser, User};
use serde::Deserialize;
use services::{policy, validate::ValidationErrors};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<db::types::Role>,
}

pub async fn get_users(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    if !policy::can_manage_users(&acting) {
        return Err(ApiError::Forbidden);
    }

    let users = User::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Json(payload): Json<UserPayload>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if !policy::can_manage_users(&acting) {
        return Err(ApiError::Forbidden);
    }

    let data = validate_user_payload(&payload)?;
    let user = User::create(&state.db().pool, &data, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if !policy::can_manage_users(&acting) {
        return Err(ApiError::Forbidden);
    }

    let user = User::find_by_id(&state.db().pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if !policy::can_manage_users(&acting) {
        return Err(ApiError::Forbidden);
    }

    let user = User::update(&state.db().pool, user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !policy::can_manage_users(&acting) {
        return Err(ApiError::Forbidden);
    }

    let rows = User::delete(&state.db().pool, user_id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

fn validate_user_payload(payload: &UserPayload) -> Result<CreateUser, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        errors.add("name", "Name is required.");
    }

    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "Email is required.");
    } else if !email.contains('@') {
        errors.add("email", "Email must be a valid email address.");
    }

    match payload.role {
        Some(role) if errors.is_empty() => Ok(CreateUser {
            name: name.to_string(),
            email: Some(email.to_string()),
            password_hash: payload.password_hash.clone(),
            role,
        }),
        Some(_) => Err(errors),
        None => {
            errors.add("role", "Role is required.");
            Err(errors)
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/users/{user_id}", get(get_user))
        .route("/users/{user_id}", put(update_user))
        .route("/users/{user_id}", delete(delete_user))
}

#[cfg(test)]
mod tests {
    use db::types::Role;

    use super::*;

    #[test]
    fn user_payload_validation_is_field_keyed() {
        let err = validate_user_payload(&UserPayload {
            name: None,
            email: Some("not-an-email".to_string()),
            password_hash: None,
            role: None,
        })
        .unwrap_err();

        assert!(err.errors.contains_key("name"));
        assert_eq!(
            err.errors["email"],
            vec!["Email must be a valid email address."]
        );
        assert!(err.errors.contains_key("role"));

        let ok = validate_user_payload(&UserPayload {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            password_hash: None,
            role: Some(Role::Admin),
        })
        .unwrap();
        assert_eq!(ok.name, "Ada");
        assert_eq!(ok.email.as_deref(), Some("ada@example.com"));
    }
}
