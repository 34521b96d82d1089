//! Client tasks: free-form to-dos attached to a client, separate from stages.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::services::access::{self, AccessError, Permission};
use crate::services::session::SessionUser;

const TASK_COLUMNS: &str =
    "id, client_id, title, description, status, due_date, assignee_id, created_at, updated_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<Date>,
    pub assignee_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<Date>,
    pub assignee_id: Option<Uuid>,
}

/// `due_date: Some(None)` clears the date; other `None`s leave fields alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<Date>>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(Uuid),
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn task_from_row(row: &PgRow) -> TaskRow {
    let status: String = row.get("status");
    TaskRow {
        id: row.get("id"),
        client_id: row.get("client_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: TaskStatus::parse(&status).unwrap_or_default(),
        due_date: row.get("due_date"),
        assignee_id: row.get("assignee_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

async fn client_of_task(pool: &PgPool, task_id: Uuid) -> Result<Uuid, TaskError> {
    let row = sqlx::query("SELECT client_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or(TaskError::NotFound(task_id))?;
    Ok(row.get("client_id"))
}

/// Tasks for a client: open ones first, then by due date.
pub async fn list_tasks(pool: &PgPool, user: &SessionUser, client_id: Uuid) -> Result<Vec<TaskRow>, TaskError> {
    access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    let rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE client_id = $1
         ORDER BY status = 'completed', due_date NULLS LAST, created_at"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(task_from_row).collect())
}

pub async fn create_task(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    new_task: &NewTask,
) -> Result<TaskRow, TaskError> {
    let title = new_task.title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;

    let row = sqlx::query(&format!(
        "INSERT INTO tasks (client_id, title, description, status, due_date, assignee_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {TASK_COLUMNS}"
    ))
    .bind(client_id)
    .bind(title)
    .bind(new_task.description.trim())
    .bind(new_task.status.as_str())
    .bind(new_task.due_date)
    .bind(new_task.assignee_id)
    .fetch_one(pool)
    .await?;
    Ok(task_from_row(&row))
}

pub async fn update_task(
    pool: &PgPool,
    user: &SessionUser,
    task_id: Uuid,
    patch: &TaskPatch,
) -> Result<TaskRow, TaskError> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(TaskError::EmptyTitle);
    }
    let client_id = client_of_task(pool, task_id).await?;
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;

    let row = sqlx::query(&format!(
        "UPDATE tasks SET
             title = COALESCE($2, title),
             description = COALESCE($3, description),
             status = COALESCE($4, status),
             due_date = CASE WHEN $5 THEN $6 ELSE due_date END,
             assignee_id = COALESCE($7, assignee_id),
             updated_at = now()
         WHERE id = $1
         RETURNING {TASK_COLUMNS}"
    ))
    .bind(task_id)
    .bind(patch.title.as_deref().map(str::trim))
    .bind(patch.description.as_deref())
    .bind(patch.status.map(TaskStatus::as_str))
    .bind(patch.due_date.is_some())
    .bind(patch.due_date.flatten())
    .bind(patch.assignee_id)
    .fetch_optional(pool)
    .await?
    .ok_or(TaskError::NotFound(task_id))?;
    Ok(task_from_row(&row))
}

pub async fn delete_task(pool: &PgPool, user: &SessionUser, task_id: Uuid) -> Result<(), TaskError> {
    let client_id = client_of_task(pool, task_id).await?;
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
