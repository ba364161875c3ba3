use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{comment::CommentError, user::UserError, work_item::WorkItemError},
};
use services::{
    validate::{ValidateError, ValidationErrors},
    workflow::WorkflowError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    WorkItem(#[from] WorkItemError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("This action is unauthorized.")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<ValidateError> for ApiError {
    fn from(err: ValidateError) -> Self {
        match err {
            ValidateError::Invalid(errors) => ApiError::Validation(errors),
            ValidateError::Database(db_err) => ApiError::Database(db_err),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Database(db_err) => ApiError::Database(db_err),
            WorkflowError::WorkItem(item_err) => ApiError::WorkItem(item_err),
            WorkflowError::Forbidden => ApiError::Forbidden,
            WorkflowError::Invalid(errors) => ApiError::Validation(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Validation failures keep their field map in the payload.
        if let ApiError::Validation(errors) = self {
            let response =
                ApiResponse::error_with_data("The given data was invalid.", errors);
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(response)).into_response();
        }

        let (status_code, error_type) = match &self {
            ApiError::WorkItem(err) => match err {
                WorkItemError::NotFound => (StatusCode::NOT_FOUND, "WorkItemError"),
                WorkItemError::ParentNotFound
                | WorkItemError::StatusNotFound
                | WorkItemError::PriorityNotFound
                | WorkItemError::SupervisorNotFound
                | WorkItemError::AssigneeNotFound
                | WorkItemError::ViewerNotFound => (StatusCode::BAD_REQUEST, "WorkItemError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "WorkItemError"),
            },
            ApiError::Comment(err) => match err {
                CommentError::WorkItemNotFound => (StatusCode::NOT_FOUND, "CommentError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "CommentError"),
            },
            ApiError::User(err) => match err {
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserError"),
                UserError::DuplicateEmail => (StatusCode::CONFLICT, "UserError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
        };

        let error_message = match &self {
            ApiError::Unauthorized => "Unauthorized. Please sign in again.".to_string(),
            ApiError::Forbidden => "This action is unauthorized.".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(WorkItemError::NotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WorkItemError::StatusNotFound)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(UserError::DuplicateEmail)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbErr::RecordNotFound("gone".to_string()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );

        let mut errors = ValidationErrors::default();
        errors.add("due_date", "Due date is required.");
        assert_eq!(
            ApiError::from(errors).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
