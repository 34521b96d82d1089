//! Stage templates: reusable stage lists stored as JSON.

use onboarding::{StageTemplate, TemplateError, TemplateStage};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::access::{self, AccessError, Role};
use crate::services::session::SessionUser;

#[derive(Debug, thiserror::Error)]
pub enum TemplateServiceError {
    #[error("template not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Invalid(#[from] TemplateError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn template_from_row(row: &sqlx::postgres::PgRow) -> StageTemplate {
    let Json(stages): Json<Vec<TemplateStage>> = row.get("stages");
    StageTemplate { id: row.get("id"), name: row.get("name"), stages }
}

/// Templates are a staff tool.
pub async fn list_templates(pool: &PgPool, user: &SessionUser) -> Result<Vec<StageTemplate>, TemplateServiceError> {
    access::require_role(user, &[Role::Admin, Role::Cpa, Role::ServiceCenter])?;
    let rows = sqlx::query("SELECT id, name, stages FROM stage_templates ORDER BY lower(name), created_at")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(template_from_row).collect())
}

pub async fn create_template(
    pool: &PgPool,
    user: &SessionUser,
    name: &str,
    stages: Vec<TemplateStage>,
) -> Result<StageTemplate, TemplateServiceError> {
    access::require_role(user, &[Role::Admin, Role::Cpa])?;
    let template = StageTemplate { id: Uuid::new_v4(), name: name.trim().to_owned(), stages };
    template.validate()?;

    sqlx::query("INSERT INTO stage_templates (id, name, stages, created_by) VALUES ($1, $2, $3, $4)")
        .bind(template.id)
        .bind(&template.name)
        .bind(Json(&template.stages))
        .bind(user.id)
        .execute(pool)
        .await?;

    tracing::info!(template_id = %template.id, stages = template.stages.len(), "stage template created");
    Ok(template)
}

pub(crate) async fn get_template(pool: &PgPool, template_id: Uuid) -> Result<StageTemplate, TemplateServiceError> {
    let row = sqlx::query("SELECT id, name, stages FROM stage_templates WHERE id = $1")
        .bind(template_id)
        .fetch_optional(pool)
        .await?
        .ok_or(TemplateServiceError::NotFound(template_id))?;
    Ok(template_from_row(&row))
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
