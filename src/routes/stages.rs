//! Stage, subtask and template routes.
//!
//! Every mutating route answers with the client's full [`StageBoard`] after
//! the cascade ran, so the editor can replace its state wholesale.

use axum::extract::State;
use axum::http::StatusCode;
use onboarding::{Stage, StageTemplate, StageValidationError, Status, SubtaskMap, TemplateError, TemplateStage};
use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::auth::AuthUser;
use super::clients::ClientIdQuery;
use crate::routes::double_option;
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::services::stage::{self, StageBoard, StageError, SubtaskPatch};
use crate::services::template::{self, TemplateServiceError};
use crate::state::AppState;

pub(crate) fn template_error(e: TemplateServiceError) -> ApiError {
    match e {
        TemplateServiceError::NotFound(_) => ApiError::not_found("template not found"),
        TemplateServiceError::Invalid(e) => template_validation_error(&e),
        TemplateServiceError::Access(e) => access_error(e),
        TemplateServiceError::Database(e) => ApiError::internal(&e),
    }
}

fn template_validation_error(e: &TemplateError) -> ApiError {
    ApiError::bad_request(e.to_string())
}

pub(crate) fn stage_error(e: StageError) -> ApiError {
    match e {
        StageError::StageNotFound(_) => ApiError::not_found("stage not found"),
        StageError::SubtaskNotFound(_) => ApiError::not_found("subtask not found"),
        StageError::EmptySubtaskTitle | StageError::Reorder(_) => ApiError::bad_request(e.to_string()),
        StageError::Invalid(e) => stage_validation_error(&e),
        StageError::Template(e) => template_error(e),
        StageError::Access(e) => access_error(e),
        StageError::Database(e) => ApiError::internal(&e),
    }
}

fn stage_validation_error(e: &StageValidationError) -> ApiError {
    match e {
        StageValidationError::ForeignStage { .. } => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        _ => ApiError::bad_request(e.to_string()),
    }
}

/// `GET /api/stages/client/get?clientId=`
pub async fn get_client_stages(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ClientIdQuery>,
) -> ApiResult<StageBoard> {
    let board = stage::get_stages(&state.pool, &auth.user, query.client_id)
        .await
        .map_err(stage_error)?;
    ok(board)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStagesBody {
    pub client_id: Uuid,
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub subtasks: SubtaskMap,
}

/// `POST /api/stages/client/save`: replace stages and subtasks in one go.
pub async fn save_client_stages(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<SaveStagesBody>,
) -> ApiResult<StageBoard> {
    let board = stage::save_stages(&state.pool, &auth.user, body.client_id, body.stages, body.subtasks)
        .await
        .map_err(stage_error)?;
    ok(board)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    pub client_id: Uuid,
    pub from: usize,
    pub to: usize,
}

/// `POST /api/stages/client/reorder`: drag-and-drop move.
pub async fn reorder_client_stages(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ReorderBody>,
) -> ApiResult<StageBoard> {
    let board = stage::reorder_stage(&state.pool, &auth.user, body.client_id, body.from, body.to)
        .await
        .map_err(stage_error)?;
    ok(board)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStageBody {
    pub stage_id: Uuid,
}

/// `POST /api/stages/client/delete`
pub async fn delete_client_stage(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DeleteStageBody>,
) -> ApiResult<StageBoard> {
    let board = stage::delete_stage(&state.pool, &auth.user, body.stage_id)
        .await
        .map_err(stage_error)?;
    ok(board)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskBody {
    pub subtask_id: Uuid,
    pub title: Option<String>,
    pub status: Option<Status>,
    /// Absent leaves the date alone; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<Date>>,
    pub document_required: Option<bool>,
}

impl UpdateSubtaskBody {
    fn patch(&self) -> SubtaskPatch {
        SubtaskPatch {
            title: self.title.clone(),
            status: self.status,
            due_date: self.due_date,
            document_required: self.document_required,
        }
    }
}

/// `POST /api/stages/subtask/update`
pub async fn update_subtask(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<UpdateSubtaskBody>,
) -> ApiResult<StageBoard> {
    let board = stage::update_subtask(&state.pool, &auth.user, body.subtask_id, &body.patch())
        .await
        .map_err(stage_error)?;
    ok(board)
}

/// `GET /api/stages/templates`
pub async fn list_templates(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Vec<StageTemplate>> {
    let templates = template::list_templates(&state.pool, &auth.user)
        .await
        .map_err(template_error)?;
    ok(templates)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateBody {
    pub name: String,
    pub stages: Vec<TemplateStage>,
}

/// `POST /api/stages/templates`
pub async fn create_template(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateTemplateBody>,
) -> ApiResult<StageTemplate> {
    let created = template::create_template(&state.pool, &auth.user, &body.name, body.stages)
        .await
        .map_err(template_error)?;
    ok(created)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplateBody {
    pub client_id: Uuid,
    pub template_id: Uuid,
}

/// `POST /api/stages/template/apply`: append a template's stages to a client.
pub async fn apply_template(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ApplyTemplateBody>,
) -> ApiResult<StageBoard> {
    let board = stage::apply_template(&state.pool, &auth.user, body.client_id, body.template_id)
        .await
        .map_err(stage_error)?;
    ok(board)
}

#[cfg(test)]
#[path = "stages_test.rs"]
mod tests;
