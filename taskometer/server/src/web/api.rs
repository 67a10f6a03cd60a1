use std::sync::Arc;

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use taskometer_core::ValidationError;
use utoipa::{OpenApi, ToSchema};

use crate::web::AppState;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description of what went wrong
    error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self { error }
    }
}

/// Error type for JSON API handlers.
///
/// Client mistakes map to `400 Bad Request` with a description. Everything else is a
/// `500` carrying only a fixed message; the underlying error is logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body is not JSON, or was not sent as JSON.
    #[error("Invalid JSON format")]
    InvalidJson(#[source] JsonRejection),
    /// A required field is missing or has the wrong type or format.
    #[error("Missing or invalid attribute.")]
    InvalidAttribute,
    /// A path segment is not a well-formed identifier.
    #[error("Invalid identifier in path")]
    InvalidPath(#[source] PathRejection),
    /// The request is well-formed but describes an invalid object.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Storage or any other server-side failure.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            message,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => ApiError::InvalidAttribute,
            other => ApiError::InvalidJson(other),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidPath(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal { message, source } => {
                tracing::error!("{}: {:#}", message, source);
            }
            other => tracing::debug!("Rejected request: {}", other),
        }

        (
            self.status_code(),
            Json(ErrorResponse::new(self.to_string())),
        )
            .into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task_list::api::v1::create_task_list_handler,
        crate::task_list::api::v1::get_task_lists_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::get_tasks_handler,
        crate::task::api::v1::delete_task_handler,
    ),
    tags(
        (name = "Task lists", description = "Named groupings of tasks"),
        (name = "Tasks", description = "Tasks within a task list")
    )
)]
pub struct ApiDoc;

/// Handler for GET /api-docs/openapi.json - Returns the OpenAPI document for the JSON API.
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the routes for the JSON API endpoints.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let task_list_router = crate::task_list::api::v1::create_api_router(state.clone());
    let task_router = crate::task::api::v1::create_api_router(state);
    Router::new()
        .route("/api-docs/openapi.json", get(openapi_handler))
        .merge(task_list_router)
        .merge(task_router)
}
