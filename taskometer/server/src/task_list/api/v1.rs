use crate::task_list::{TaskListService, TaskListServiceError};
use crate::web::AppState;
use crate::web::api::{ApiError, ErrorResponse};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use taskometer_core::TaskList;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a TaskList for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskListJson {
    /// Unique identifier of the task list
    id: Uuid,
    /// Display name of the task list
    name: String,
    /// When the task list was created
    created_at: DateTime<Utc>,
    /// When the task list was last changed
    updated_at: DateTime<Utc>,
}

impl From<TaskList> for TaskListJson {
    fn from(list: TaskList) -> Self {
        Self {
            id: list.id,
            name: list.name,
            created_at: list.created_at,
            updated_at: list.updated_at,
        }
    }
}

/// API response for listing all task lists, keyed by task list id.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListsResponse(BTreeMap<Uuid, TaskListJson>);

/// Request body for creating a task list.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskListRequest {
    /// Display name of the new task list
    name: Option<String>,
}

fn to_api_error(err: TaskListServiceError, message: &'static str) -> ApiError {
    match err {
        TaskListServiceError::Validation(err) => ApiError::Validation(err),
        other => ApiError::internal(message, other),
    }
}

/// Handler for POST /lists - Creates a task list.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/lists",
    request_body = CreateTaskListRequest,
    responses(
        (status = 201, description = "Task list created", body = TaskListJson),
        (status = 400, description = "Missing or invalid name", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Task lists"
)]
pub async fn create_task_list_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskListRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskListJson>), ApiError> {
    let Json(request) = payload?;
    let name = request.name.ok_or(ApiError::InvalidAttribute)?;

    let list = TaskListService::new(state.store.as_ref())
        .create_list(name)
        .await
        .map_err(|err| to_api_error(err, "Failed to save task list"))?;

    Ok((StatusCode::CREATED, Json(TaskListJson::from(list))))
}

/// Handler for GET /lists - Returns every task list keyed by id.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/lists",
    responses(
        (status = 200, description = "Successfully retrieved task lists", body = TaskListsResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Task lists"
)]
pub async fn get_task_lists_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TaskListsResponse>, ApiError> {
    let index = TaskListService::new(state.store.as_ref())
        .get_index()
        .await
        .map_err(|err| to_api_error(err, "Failed to list task lists"))?;

    let lists = index
        .into_iter()
        .map(|(id, list)| (id, TaskListJson::from(list)))
        .collect();
    Ok(Json(TaskListsResponse(lists)))
}

/// Creates and returns the task lists API router.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/lists",
            get(get_task_lists_handler).post(create_task_list_handler),
        )
        .with_state(state)
}
