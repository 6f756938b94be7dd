use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::repositories::StoreError;
use crate::services::exams::DeleteExamError;
use crate::services::identity::IdentityError;
use crate::services::route_guard::{self, DEFAULT_PATH};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug, Serialize)]
struct RedirectResponse {
    redirect_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    /// `303` to the login page, remembering where the visitor was going.
    RedirectToLogin { from: String },
    /// `303` to the role's default landing route.
    RedirectToDefault,
    /// Session resolution still in flight.
    Pending,
    Unauthorized(String),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    BadGateway(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials(message) => Self::Unauthorized(message),
            IdentityError::AlreadyRegistered(message) => Self::Conflict(message),
            IdentityError::Rejected { status, message } if status == 422 || status == 400 => {
                Self::BadRequest(message)
            }
            IdentityError::Rejected { message, .. } => Self::Unauthorized(message),
            IdentityError::Transport(_) | IdentityError::Malformed(_) => {
                tracing::error!(error = %err, "Identity provider failure");
                Self::BadGateway(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err, "Record store request failed")
    }
}

impl From<DeleteExamError> for ApiError {
    fn from(err: DeleteExamError) -> Self {
        match err {
            DeleteExamError::NotFound => Self::NotFound("Exam not found".to_string()),
            DeleteExamError::Database(err) => Self::internal(err, "Failed to delete exam"),
            DeleteExamError::StorageUnavailable => Self::ServiceUnavailable(
                "Object storage is not configured; the exam was not deleted".to_string(),
            ),
            DeleteExamError::FileRemoval(message) => {
                tracing::error!(error = %message, "Failed to remove exam paper");
                Self::BadGateway(format!("Exam deleted but its file could not be removed: {message}"))
            }
        }
    }
}

fn see_other(location: String, from: Option<String>) -> Response {
    let mut response = (
        StatusCode::SEE_OTHER,
        Json(RedirectResponse { redirect_to: location.clone(), from }),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

fn detail(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RedirectToLogin { from } => {
                see_other(route_guard::login_location(&from), Some(from))
            }
            ApiError::RedirectToDefault => see_other(DEFAULT_PATH.to_string(), None),
            ApiError::Pending => {
                let mut response = detail(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Session is still loading".to_string(),
                );
                response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
                response
            }
            ApiError::Unauthorized(message) => detail(StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => detail(StatusCode::FORBIDDEN, message.to_string()),
            ApiError::BadRequest(message) => detail(StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => detail(StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => detail(StatusCode::CONFLICT, message),
            ApiError::TooManyRequests(message) => {
                detail(StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ApiError::BadGateway(message) => detail(StatusCode::BAD_GATEWAY, message),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                detail(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                detail(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}
