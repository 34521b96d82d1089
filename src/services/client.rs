//! Client records.
//!
//! DESIGN
//! ======
//! A client is the tenant boundary: stages, tasks, documents and email logs
//! all hang off one. Visibility follows [`crate::services::access`]: admins
//! see every client, CPAs and service centers see the clients assigned to
//! them, and a client user sees only their own record.
//!
//! Archiving is a soft delete. Archived clients stay readable but every
//! mutation against them is refused until they are unarchived.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Permission, Role};
use crate::services::email_auth::normalize_email;
use crate::services::mailer::{self, EmailTransport, MailError};
use crate::services::session::SessionUser;
use crate::services::user::{self, UserError};

const CLIENT_COLUMNS: &str =
    "id, name, email, phone, company, cpa_id, service_center_id, archived, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
    pub archived: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
}

/// Fields left `None` are unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteOutcome {
    pub user_id: Uuid,
    pub email: String,
    pub email_log_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client not found: {0}")]
    NotFound(Uuid),
    #[error("client name must not be empty")]
    EmptyName,
    #[error("invalid email")]
    InvalidEmail,
    #[error("client has no email address")]
    NoEmail,
    #[error("{0} is not a valid {1} assignment")]
    InvalidAssignment(Uuid, &'static str),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn client_from_row(row: &PgRow) -> ClientRow {
    ClientRow {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        company: row.get("company"),
        cpa_id: row.get("cpa_id"),
        service_center_id: row.get("service_center_id"),
        archived: row.get("archived"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Trim an optional text field; blank becomes `None`.
fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

fn clean_email(value: Option<&str>) -> Result<Option<String>, ClientError> {
    match clean(value) {
        Some(raw) => normalize_email(&raw).map(Some).ok_or(ClientError::InvalidEmail),
        None => Ok(None),
    }
}

async fn check_assignment(pool: &PgPool, user_id: Option<Uuid>, expected: Role) -> Result<(), ClientError> {
    let Some(user_id) = user_id else {
        return Ok(());
    };
    match user::role_of(pool, user_id).await? {
        Some(role) if role == expected => Ok(()),
        _ => Err(ClientError::InvalidAssignment(user_id, expected.as_str())),
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// Clients visible to `user`, sorted by name.
pub async fn list_clients(
    pool: &PgPool,
    user: &SessionUser,
    include_archived: bool,
) -> Result<Vec<ClientRow>, ClientError> {
    let (filter, bind) = match user.role {
        Role::Admin => ("TRUE", None),
        Role::Cpa => ("cpa_id = $2", Some(user.id)),
        Role::ServiceCenter => ("service_center_id = $2", Some(user.id)),
        Role::Client => match user.client_id {
            Some(client_id) => ("id = $2", Some(client_id)),
            None => return Ok(Vec::new()),
        },
    };
    let sql = format!(
        "SELECT {CLIENT_COLUMNS} FROM clients
         WHERE ($1 OR NOT archived) AND ({filter})
         ORDER BY lower(name), id"
    );
    let mut query = sqlx::query(&sql).bind(include_archived);
    if let Some(id) = bind {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(client_from_row).collect())
}

pub async fn get_client(pool: &PgPool, user: &SessionUser, client_id: Uuid) -> Result<ClientRow, ClientError> {
    access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
        .bind(client_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ClientError::NotFound(client_id))?;
    Ok(client_from_row(&row))
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Create a client. Admins and CPAs only; a CPA creating a client without an
/// explicit CPA becomes its CPA.
pub async fn create_client(pool: &PgPool, user: &SessionUser, new_client: &NewClient) -> Result<ClientRow, ClientError> {
    access::require_role(user, &[Role::Admin, Role::Cpa])?;

    let name = clean(Some(&new_client.name)).ok_or(ClientError::EmptyName)?;
    let email = clean_email(new_client.email.as_deref())?;
    let cpa_id = match (user.role, new_client.cpa_id) {
        (Role::Cpa, None) => Some(user.id),
        (_, cpa_id) => cpa_id,
    };
    check_assignment(pool, cpa_id, Role::Cpa).await?;
    check_assignment(pool, new_client.service_center_id, Role::ServiceCenter).await?;

    let row = sqlx::query(&format!(
        "INSERT INTO clients (name, email, phone, company, cpa_id, service_center_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(&name)
    .bind(&email)
    .bind(clean(new_client.phone.as_deref()))
    .bind(clean(new_client.company.as_deref()))
    .bind(cpa_id)
    .bind(new_client.service_center_id)
    .fetch_one(pool)
    .await?;

    let client = client_from_row(&row);
    tracing::info!(client_id = %client.id, actor = %user.id, "client created");
    Ok(client)
}

pub async fn update_client(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    patch: &ClientPatch,
) -> Result<ClientRow, ClientError> {
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;

    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ClientError::EmptyName);
    }
    let email = clean_email(patch.email.as_deref())?;
    // Reassignment is an admin decision.
    if (patch.cpa_id.is_some() || patch.service_center_id.is_some()) && user.role != Role::Admin {
        return Err(AccessError::Forbidden.into());
    }
    check_assignment(pool, patch.cpa_id, Role::Cpa).await?;
    check_assignment(pool, patch.service_center_id, Role::ServiceCenter).await?;

    let row = sqlx::query(&format!(
        "UPDATE clients SET
             name = COALESCE($2, name),
             email = COALESCE($3, email),
             phone = COALESCE($4, phone),
             company = COALESCE($5, company),
             cpa_id = COALESCE($6, cpa_id),
             service_center_id = COALESCE($7, service_center_id),
             updated_at = now()
         WHERE id = $1
         RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(client_id)
    .bind(patch.name.as_deref().map(str::trim))
    .bind(email)
    .bind(clean(patch.phone.as_deref()))
    .bind(clean(patch.company.as_deref()))
    .bind(patch.cpa_id)
    .bind(patch.service_center_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ClientError::NotFound(client_id))?;
    Ok(client_from_row(&row))
}

/// Archive or unarchive. Admins and the assigned CPA only.
pub async fn set_archived(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
    archived: bool,
) -> Result<ClientRow, ClientError> {
    access::require_role(user, &[Role::Admin, Role::Cpa])?;
    // View first: archived clients refuse Manage, and unarchiving must work.
    let scope = access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    let relation = access::relation(user, &scope);
    if !access::allows(user.role, relation, Permission::Manage, false) {
        return Err(AccessError::Forbidden.into());
    }

    let row = sqlx::query(&format!(
        "UPDATE clients SET archived = $2, updated_at = now() WHERE id = $1 RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(client_id)
    .bind(archived)
    .fetch_optional(pool)
    .await?
    .ok_or(ClientError::NotFound(client_id))?;

    tracing::info!(%client_id, archived, actor = %user.id, "client archive flag changed");
    Ok(client_from_row(&row))
}

/// Provision a client-role login for the client's email and send the invite.
pub async fn invite_client(
    pool: &PgPool,
    transport: Option<&dyn EmailTransport>,
    base_url: &str,
    user: &SessionUser,
    client_id: Uuid,
) -> Result<InviteOutcome, ClientError> {
    let client = get_client(pool, user, client_id).await?;
    access::ensure_client_access(pool, client_id, user, Permission::Manage).await?;
    let email = client.email.as_deref().ok_or(ClientError::NoEmail)?;

    let login = user::ensure_client_user(pool, email, &client.name, client_id).await?;
    let message = mailer::client_invite_email(&login.email, client_id, &client.name, base_url);
    let email_log_id = mailer::deliver(pool, transport, &message).await?;

    Ok(InviteOutcome { user_id: login.id, email: login.email, email_log_id })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
