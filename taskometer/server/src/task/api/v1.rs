use crate::task::{TaskService, TaskServiceError};
use crate::web::AppState;
use crate::web::api::{ApiError, ErrorResponse};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskometer_core::Task;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier of the task
    id: Uuid,
    /// Task list the task belongs to
    list_id: Uuid,
    /// Title of the task
    title: String,
    /// Free-form description, empty by default
    description: String,
    /// 0 = Pending, 1 = Complete, 2 = Cancelled
    status: u8,
    /// When the task falls due
    due_date: DateTime<Utc>,
    /// When the task was created
    created_at: DateTime<Utc>,
    /// When the task was last changed
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            list_id: task.list_id,
            title: task.title,
            description: task.description,
            status: task.status.code(),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Task list to add the task to
    list_id: Option<String>,
    /// Title of the task
    title: Option<String>,
    /// Optional RFC 3339 due date; defaults to a day from now
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
}

/// Response body confirming an action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

fn to_api_error(err: TaskServiceError, message: &'static str) -> ApiError {
    match err {
        TaskServiceError::Validation(err) => ApiError::Validation(err),
        other => ApiError::internal(message, other),
    }
}

/// Handler for POST /tasks - Creates a task in a task list.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Missing or invalid attribute", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let Json(request) = payload?;
    let (Some(list_id), Some(title)) = (request.list_id, request.title) else {
        return Err(ApiError::InvalidAttribute);
    };
    let list_id = Uuid::parse_str(&list_id).map_err(|_| ApiError::InvalidAttribute)?;

    let task = TaskService::new(state.store.as_ref())
        .create_task(list_id, title, request.due_date)
        .await
        .map_err(|err| to_api_error(err, "Failed to save task"))?;

    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for GET /tasks/{list_id} - Returns every task in a task list.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{list_id}",
    params(
        ("list_id" = Uuid, Path, description = "Task list to read")
    ),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 400, description = "Malformed task list id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let Path(list_id) = path?;

    let tasks = TaskService::new(state.store.as_ref())
        .list_tasks(list_id)
        .await
        .map_err(|err| to_api_error(err, "Failed to list tasks"))?;

    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for DELETE /tasks/{list_id}/{task_id} - Deletes a task.
///
/// Deleting a task that does not exist still succeeds.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{list_id}/{task_id}",
    params(
        ("list_id" = Uuid, Path, description = "Task list the task belongs to"),
        ("task_id" = Uuid, Path, description = "Task to delete")
    ),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path((list_id, task_id)) = path?;

    TaskService::new(state.store.as_ref())
        .delete_task(list_id, task_id)
        .await
        .map_err(|err| to_api_error(err, "Failed to delete task"))?;

    Ok(Json(MessageResponse {
        message: "Task deleted".to_string(),
    }))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tasks", post(create_task_handler))
        .route("/tasks/{list_id}", get(get_tasks_handler))
        .route("/tasks/{list_id}/{task_id}", delete(delete_task_handler))
        .with_state(state)
}
