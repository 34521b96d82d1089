//! Email log: the record of every message the portal tried to send.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Permission, Role};
use crate::services::mailer::OutgoingEmail;
use crate::services::session::SessionUser;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

const LOG_COLUMNS: &str =
    "id, client_id, recipient, subject, template, status, error, is_read, sent_at, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Queued,
    Sent,
    Failed,
}

impl EmailStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "queued" => Some(Self::Queued),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLog {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub recipient: String,
    pub subject: String,
    pub template: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub sent_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct EmailLogFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<EmailStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct EmailLogPatch {
    pub is_read: Option<bool>,
    pub status: Option<EmailStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailLogError {
    #[error("email log not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

fn log_from_row(row: &PgRow) -> EmailLog {
    let status: String = row.get("status");
    EmailLog {
        id: row.get("id"),
        client_id: row.get("client_id"),
        recipient: row.get("recipient"),
        subject: row.get("subject"),
        template: row.get("template"),
        status: EmailStatus::parse(&status).unwrap_or(EmailStatus::Queued),
        error: row.get("error"),
        is_read: row.get("is_read"),
        sent_at: row.get("sent_at"),
        created_at: row.get("created_at"),
    }
}

// =============================================================================
// WRITES FROM THE MAILER
// =============================================================================

pub(crate) async fn insert_queued(pool: &PgPool, email: &OutgoingEmail) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO email_logs (client_id, recipient, subject, template, status)
         VALUES ($1, $2, $3, $4, 'queued')
         RETURNING id",
    )
    .bind(email.client_id)
    .bind(&email.to)
    .bind(&email.subject)
    .bind(email.template)
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub(crate) async fn mark_sent(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE email_logs SET status = 'sent', error = NULL, sent_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE email_logs SET status = 'failed', error = $2 WHERE id = $1")
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

/// List logs visible to a staff user, newest first.
///
/// Admins see everything; other staff see logs of clients assigned to them.
///
/// # Errors
///
/// Returns `Forbidden` for client users, access errors for a filtered client,
/// or a database error.
pub async fn list_email_logs(
    pool: &PgPool,
    user: &SessionUser,
    filter: &EmailLogFilter,
) -> Result<Vec<EmailLog>, EmailLogError> {
    access::require_role(user, &[Role::Admin, Role::Cpa, Role::ServiceCenter])?;
    if let Some(client_id) = filter.client_id {
        access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    }

    let mut builder = QueryBuilder::new(format!("SELECT {LOG_COLUMNS} FROM email_logs WHERE TRUE"));
    if let Some(client_id) = filter.client_id {
        builder.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    match user.role {
        Role::Cpa => {
            builder
                .push(" AND client_id IN (SELECT id FROM clients WHERE cpa_id = ")
                .push_bind(user.id)
                .push(")");
        }
        Role::ServiceCenter => {
            builder
                .push(" AND client_id IN (SELECT id FROM clients WHERE service_center_id = ")
                .push_bind(user.id)
                .push(")");
        }
        Role::Admin | Role::Client => {}
    }
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(clamp_limit(filter.limit))
        .push(" OFFSET ")
        .push_bind(filter.offset.unwrap_or(0).max(0));

    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(log_from_row).collect())
}

/// Fetch one log row the user may see.
///
/// # Errors
///
/// Returns `NotFound`, an access error, or a database error.
pub async fn get_email_log(pool: &PgPool, user: &SessionUser, id: Uuid) -> Result<EmailLog, EmailLogError> {
    access::require_role(user, &[Role::Admin, Role::Cpa, Role::ServiceCenter])?;
    let row = sqlx::query(&format!("SELECT {LOG_COLUMNS} FROM email_logs WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EmailLogError::NotFound(id))?;
    let log = log_from_row(&row);

    match log.client_id {
        Some(client_id) => {
            access::ensure_client_access(pool, client_id, user, Permission::View).await?;
        }
        // System mail (login codes) is admin-only.
        None => access::require_role(user, &[Role::Admin])?,
    }
    Ok(log)
}

/// Apply a read/status patch and return the updated row.
///
/// # Errors
///
/// Same as [`get_email_log`].
pub async fn update_email_log(
    pool: &PgPool,
    user: &SessionUser,
    id: Uuid,
    patch: &EmailLogPatch,
) -> Result<EmailLog, EmailLogError> {
    get_email_log(pool, user, id).await?;

    let row = sqlx::query(&format!(
        "UPDATE email_logs
         SET is_read = COALESCE($2, is_read),
             status = COALESCE($3, status)
         WHERE id = $1
         RETURNING {LOG_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.is_read)
    .bind(patch.status.map(EmailStatus::as_str))
    .fetch_optional(pool)
    .await?
    .ok_or(EmailLogError::NotFound(id))?;
    Ok(log_from_row(&row))
}

#[cfg(test)]
#[path = "email_log_test.rs"]
mod tests;
