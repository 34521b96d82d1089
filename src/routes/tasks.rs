//! Client task routes.

use axum::extract::State;
use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::auth::AuthUser;
use super::clients::ClientIdQuery;
use crate::routes::{Deleted, double_option};
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::services::task::{self, NewTask, TaskError, TaskPatch, TaskRow, TaskStatus};
use crate::state::AppState;

pub(crate) fn task_error(e: TaskError) -> ApiError {
    match e {
        TaskError::NotFound(_) => ApiError::not_found("task not found"),
        TaskError::EmptyTitle => ApiError::bad_request(e.to_string()),
        TaskError::Access(e) => access_error(e),
        TaskError::Database(e) => ApiError::internal(&e),
    }
}

/// `GET /api/tasks/list?clientId=`
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ClientIdQuery>,
) -> ApiResult<Vec<TaskRow>> {
    let tasks = task::list_tasks(&state.pool, &auth.user, query.client_id)
        .await
        .map_err(task_error)?;
    ok(tasks)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    pub client_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    pub due_date: Option<Date>,
    pub assignee_id: Option<Uuid>,
}

/// `POST /api/tasks/create`
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateTaskBody>,
) -> ApiResult<TaskRow> {
    let new_task = NewTask {
        title: body.title,
        description: body.description,
        status: body.status,
        due_date: body.due_date,
        assignee_id: body.assignee_id,
    };
    let created = task::create_task(&state.pool, &auth.user, body.client_id, &new_task)
        .await
        .map_err(task_error)?;
    ok(created)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    pub task_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<Date>>,
    pub assignee_id: Option<Uuid>,
}

/// `POST /api/tasks/update`
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<UpdateTaskBody>,
) -> ApiResult<TaskRow> {
    let patch = TaskPatch {
        title: body.title,
        description: body.description,
        status: body.status,
        due_date: body.due_date,
        assignee_id: body.assignee_id,
    };
    let updated = task::update_task(&state.pool, &auth.user, body.task_id, &patch)
        .await
        .map_err(task_error)?;
    ok(updated)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskBody {
    pub task_id: Uuid,
}

/// `POST /api/tasks/delete`
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DeleteTaskBody>,
) -> ApiResult<Deleted> {
    task::delete_task(&state.pool, &auth.user, body.task_id)
        .await
        .map_err(task_error)?;
    ok(Deleted { id: body.task_id })
}

#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;
