//! Onboarding stages and subtasks.
//!
//! DESIGN
//! ======
//! Every mutation follows one path inside a single transaction: lock the
//! client row, load its stages and subtasks, apply the edit in memory, run
//! [`onboarding::recompute`], then replace the client's rows. Status, start date and completion
//! date are therefore always the derived values; nothing the caller sends
//! for those fields survives a save unless the cascade agrees with it.
//!
//! ERROR HANDLING
//! ==============
//! A database failure mid-save rolls the whole replacement back, so a client
//! never ends up with half of an edit. The row lock serializes edits to one
//! client: two subtask updates both land, while two full saves from the
//! editor are last-write-wins.

use std::collections::HashMap;

use onboarding::{
    ReorderError, Stage, StageTemplate, StageValidationError, Status, Subtask, SubtaskMap, instantiate, move_stage,
    recompute, reindex, validate_stages,
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::services::access::{self, AccessError, Permission};
use crate::services::session::SessionUser;
use crate::services::template::{self, TemplateServiceError};

/// A client's stages in order, with their subtasks keyed by stage id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBoard {
    pub client_id: Uuid,
    pub stages: Vec<Stage>,
    pub subtasks: SubtaskMap,
    /// Stages whose derived fields changed during the last save.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<Uuid>,
}

/// Edit to one subtask. `None` leaves a field unchanged; `due_date:
/// Some(None)` clears the date.
#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub due_date: Option<Option<Date>>,
    pub document_required: Option<bool>,
}

impl SubtaskPatch {
    /// Title and the document flag shape the checklist; status and due date
    /// are progress that clients may report themselves.
    #[must_use]
    pub fn required_permission(&self) -> Permission {
        if self.title.is_some() || self.document_required.is_some() {
            Permission::Manage
        } else {
            Permission::Contribute
        }
    }

    fn apply(&self, subtask: &mut Subtask) {
        if let Some(title) = &self.title {
            title.trim().clone_into(&mut subtask.title);
        }
        if let Some(status) = self.status {
            subtask.status = status;
        }
        if let Some(due_date) = self.due_date {
            subtask.due_date = due_date;
        }
        if let Some(document_required) = self.document_required {
            subtask.document_required = document_required;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("stage not found: {0}")]
    StageNotFound(Uuid),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(Uuid),
    #[error("subtask title must not be empty")]
    EmptySubtaskTitle,
    #[error(transparent)]
    Invalid(#[from] StageValidationError),
    #[error(transparent)]
    Reorder(#[from] ReorderError),
    #[error(transparent)]
    Template(#[from] TemplateServiceError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn parse_status(raw: &str) -> Status {
    Status::parse(raw).unwrap_or_default()
}

// =============================================================================
// LOAD / STORE
// =============================================================================

/// Open a transaction holding the row lock on `client_id`.
async fn lock_client(pool: &PgPool, client_id: Uuid) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT id FROM clients WHERE id = $1 FOR UPDATE")
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?;
    Ok(tx)
}

/// [`lock_client`], then load the board under the lock.
async fn begin_locked(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<(Transaction<'static, Postgres>, Vec<Stage>, SubtaskMap), sqlx::Error> {
    let mut tx = lock_client(pool, client_id).await?;
    let (stages, subtasks) = load_board(&mut tx, client_id).await?;
    Ok((tx, stages, subtasks))
}

async fn load_board(conn: &mut PgConnection, client_id: Uuid) -> Result<(Vec<Stage>, SubtaskMap), sqlx::Error> {
    let stage_rows = sqlx::query(
        "SELECT id, client_id, name, required, sort_order, status, start_date, completion_date
         FROM stages WHERE client_id = $1
         ORDER BY sort_order, name",
    )
    .bind(client_id)
    .fetch_all(&mut *conn)
    .await?;

    let stages: Vec<Stage> = stage_rows
        .iter()
        .map(|row| Stage {
            id: row.get("id"),
            client_id: row.get("client_id"),
            name: row.get("name"),
            required: row.get("required"),
            order: row.get("sort_order"),
            status: parse_status(&row.get::<String, _>("status")),
            start_date: row.get("start_date"),
            completion_date: row.get("completion_date"),
        })
        .collect();

    let subtask_rows = sqlx::query(
        "SELECT t.id, t.stage_id, t.title, t.status, t.due_date, t.document_required, t.position
         FROM subtasks t
         JOIN stages s ON s.id = t.stage_id
         WHERE s.client_id = $1
         ORDER BY t.stage_id, t.position, t.title",
    )
    .bind(client_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut subtasks: SubtaskMap = HashMap::new();
    for row in &subtask_rows {
        let subtask = Subtask {
            id: row.get("id"),
            stage_id: row.get("stage_id"),
            title: row.get("title"),
            status: parse_status(&row.get::<String, _>("status")),
            due_date: row.get("due_date"),
            document_required: row.get("document_required"),
            position: row.get("position"),
        };
        subtasks.entry(subtask.stage_id).or_default().push(subtask);
    }

    Ok((stages, subtasks))
}

/// Replace every stage and subtask row of `client_id` with the given set.
async fn replace_board(
    conn: &mut PgConnection,
    client_id: Uuid,
    stages: &[Stage],
    subtasks: &SubtaskMap,
) -> Result<(), sqlx::Error> {
    // Subtasks go with their stages (ON DELETE CASCADE).
    sqlx::query("DELETE FROM stages WHERE client_id = $1")
        .bind(client_id)
        .execute(&mut *conn)
        .await?;

    for stage in stages {
        sqlx::query(
            "INSERT INTO stages (id, client_id, name, required, sort_order, status, start_date, completion_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(stage.id)
        .bind(client_id)
        .bind(stage.name.trim())
        .bind(stage.required)
        .bind(stage.order)
        .bind(stage.status.as_str())
        .bind(stage.start_date)
        .bind(stage.completion_date)
        .execute(&mut *conn)
        .await?;

        for (position, subtask) in subtasks.get(&stage.id).into_iter().flatten().enumerate() {
            sqlx::query(
                "INSERT INTO subtasks (id, stage_id, title, status, due_date, document_required, position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(subtask.id)
            .bind(stage.id)
            .bind(subtask.title.trim())
            .bind(subtask.status.as_str())
            .bind(subtask.due_date)
            .bind(subtask.document_required)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Validate, run the cascade, persist and commit `tx`.
///
/// Returning early drops `tx`, which rolls back and releases the lock.
async fn commit_board(
    mut tx: Transaction<'static, Postgres>,
    client_id: Uuid,
    stages: Vec<Stage>,
    subtasks: SubtaskMap,
    today: Date,
) -> Result<StageBoard, StageError> {
    validate_stages(client_id, &stages, &subtasks)?;
    let recomputed = recompute(&stages, &subtasks, today);

    replace_board(&mut tx, client_id, &recomputed.stages, &subtasks).await?;
    tx.commit().await?;

    if recomputed.is_changed() {
        tracing::info!(
            %client_id,
            changed = recomputed.changed.len(),
            passes = recomputed.passes,
            "stage cascade updated derived fields"
        );
    }

    Ok(StageBoard { client_id, stages: recomputed.stages, subtasks, changed: recomputed.changed })
}

async fn client_of_stage(pool: &PgPool, stage_id: Uuid) -> Result<Uuid, StageError> {
    let row = sqlx::query("SELECT client_id FROM stages WHERE id = $1")
        .bind(stage_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StageError::StageNotFound(stage_id))?;
    Ok(row.get("client_id"))
}

async fn client_of_subtask(pool: &PgPool, subtask_id: Uuid) -> Result<Uuid, StageError> {
    let row = sqlx::query("SELECT s.client_id FROM subtasks t JOIN stages s ON s.id = t.stage_id WHERE t.id = $1")
        .bind(subtask_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StageError::SubtaskNotFound(subtask_id))?;
    Ok(row.get("client_id"))
}

// =============================================================================
// IN-MEMORY EDITS
// =============================================================================

/// Drop a stage and its subtasks, then close the gap in `order`.
fn remove_stage(stages: &mut Vec<Stage>, subtasks: &mut SubtaskMap, stage_id: Uuid) -> Result<(), StageError> {
    let idx = stages
        .iter()
        .position(|s| s.id == stage_id)
        .ok_or(StageError::StageNotFound(stage_id))?;
    stages.remove(idx);
    subtasks.remove(&stage_id);
    reindex(stages);
    Ok(())
}

fn patch_subtask(subtasks: &mut SubtaskMap, subtask_id: Uuid, patch: &SubtaskPatch) -> Result<(), StageError> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(StageError::EmptySubtaskTitle);
    }
    let subtask = subtasks
        .values_mut()
        .flatten()
        .find(|t| t.id == subtask_id)
        .ok_or(StageError::SubtaskNotFound(subtask_id))?;
    patch.apply(subtask);
    Ok(())
}

/// Append a template's stages after the existing ones.
fn append_template(stages: &mut Vec<Stage>, subtasks: &mut SubtaskMap, client_id: Uuid, template: &StageTemplate) {
    let (new_stages, new_subtasks) = instantiate(&template.stages, client_id, stages);
    stages.extend(new_stages);
    subtasks.extend(new_subtasks);
}

// =============================================================================
// OPERATIONS
// =============================================================================

pub async fn get_stages(pool: &PgPool, user: &SessionUser, client_id: Uuid) -> Result<StageBoard, StageError> {
    access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    let mut conn = pool.acquire().await?;
    let (stages, subtasks) = load_board(&mut conn, client_id).await?;
    Ok(StageBoard { client_id, stages, subtasks, changed: Vec::new() })
}

/// Replace the client's whole stage list, as sent by the stage editor.
///
/// Stages are re-sorted by the `order` they carry and renumbered from 1.
pub async fn save_stages(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    mut stages: Vec<Stage>,
    subtasks: SubtaskMap,
) -> Result<StageBoard, StageError> {
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    validate_stages(client_id, &stages, &subtasks)?;
    stages.sort_by_key(|s| s.order);
    reindex(&mut stages);
    let tx = lock_client(pool, client_id).await?;
    commit_board(tx, client_id, stages, subtasks, today()).await
}

/// Move the stage at index `from` to index `to` and re-run the cascade.
pub async fn reorder_stage(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    from: usize,
    to: usize,
) -> Result<StageBoard, StageError> {
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    let (tx, mut stages, subtasks) = begin_locked(pool, client_id).await?;
    move_stage(&mut stages, from, to)?;
    commit_board(tx, client_id, stages, subtasks, today()).await
}

pub async fn delete_stage(pool: &PgPool, user: &SessionUser, stage_id: Uuid) -> Result<StageBoard, StageError> {
    let client_id = client_of_stage(pool, stage_id).await?;
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    let (tx, mut stages, mut subtasks) = begin_locked(pool, client_id).await?;
    remove_stage(&mut stages, &mut subtasks, stage_id)?;
    let board = commit_board(tx, client_id, stages, subtasks, today()).await?;
    tracing::info!(%client_id, %stage_id, actor = %user.id, "stage deleted");
    Ok(board)
}

pub async fn update_subtask(
    pool: &PgPool,
    user: &SessionUser,
    subtask_id: Uuid,
    patch: &SubtaskPatch,
) -> Result<StageBoard, StageError> {
    let client_id = client_of_subtask(pool, subtask_id).await?;
    access::ensure_client_access(pool, client_id, user, patch.required_permission()).await?;
    let (tx, stages, mut subtasks) = begin_locked(pool, client_id).await?;
    patch_subtask(&mut subtasks, subtask_id, patch)?;
    commit_board(tx, client_id, stages, subtasks, today()).await
}

pub async fn apply_template(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    template_id: Uuid,
) -> Result<StageBoard, StageError> {
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    let template = template::get_template(pool, template_id).await?;
    let (tx, mut stages, mut subtasks) = begin_locked(pool, client_id).await?;
    append_template(&mut stages, &mut subtasks, client_id, &template);
    let board = commit_board(tx, client_id, stages, subtasks, today()).await?;
    tracing::info!(%client_id, %template_id, added = template.stages.len(), "template applied");
    Ok(board)
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod tests;
