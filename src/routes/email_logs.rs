//! Email log routes (staff only).

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::services::email_log::{self, EmailLog, EmailLogError, EmailLogFilter, EmailLogPatch, EmailStatus};
use crate::state::AppState;

pub(crate) fn email_log_error(e: EmailLogError) -> ApiError {
    match e {
        EmailLogError::NotFound(_) => ApiError::not_found("email log not found"),
        EmailLogError::Access(e) => access_error(e),
        EmailLogError::Database(e) => ApiError::internal(&e),
    }
}

fn parse_status(raw: Option<&str>) -> Result<Option<EmailStatus>, ApiError> {
    raw.map(|s| EmailStatus::parse(s).ok_or_else(|| ApiError::bad_request(format!("unknown email status: {s}"))))
        .transpose()
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmailLogQuery {
    pub client_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/email-logs?clientId=&status=&limit=&offset=`
pub async fn list_email_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<EmailLogQuery>,
) -> ApiResult<Vec<EmailLog>> {
    let filter = EmailLogFilter {
        client_id: query.client_id,
        status: parse_status(query.status.as_deref())?,
        limit: query.limit,
        offset: query.offset,
    };
    let logs = email_log::list_email_logs(&state.pool, &auth.user, &filter)
        .await
        .map_err(email_log_error)?;
    ok(logs)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailLogBody {
    pub id: Uuid,
    pub is_read: Option<bool>,
    pub status: Option<String>,
}

/// `PUT /api/email-logs`: mark read/unread or correct the status.
pub async fn update_email_log(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<UpdateEmailLogBody>,
) -> ApiResult<EmailLog> {
    let patch = EmailLogPatch { is_read: body.is_read, status: parse_status(body.status.as_deref())? };
    let log = email_log::update_email_log(&state.pool, &auth.user, body.id, &patch)
        .await
        .map_err(email_log_error)?;
    ok(log)
}

#[cfg(test)]
#[path = "email_logs_test.rs"]
mod tests;
