//! User provisioning.
//!
//! Accounts are created by admins (staff) or by inviting a client contact.
//! There is no self sign-up: email sign-in only works for rows that exist here.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Role};
use crate::services::email_auth::normalize_email;
use crate::services::session::SessionUser;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub client_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("name must not be empty")]
    EmptyName,
    #[error("client users need a client, staff users must not have one")]
    ClientMismatch,
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn user_from_row(row: &PgRow) -> UserRow {
    let role: String = row.get("role");
    UserRow {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: Role::parse(&role).unwrap_or(Role::Client),
        client_id: row.get("client_id"),
        created_at: row.get("created_at"),
    }
}

/// Check a new user's fields and return the normalized email.
///
/// # Errors
///
/// Returns the first invalid field.
pub fn validate_new_user(user: &NewUser) -> Result<String, UserError> {
    let email = normalize_email(&user.email).ok_or(UserError::InvalidEmail)?;
    if user.name.trim().is_empty() {
        return Err(UserError::EmptyName);
    }
    if (user.role == Role::Client) != user.client_id.is_some() {
        return Err(UserError::ClientMismatch);
    }
    Ok(email)
}

/// List every user, optionally filtered by role. Admin only.
pub async fn list_users(pool: &PgPool, actor: &SessionUser, role: Option<Role>) -> Result<Vec<UserRow>, UserError> {
    access::require_role(actor, &[Role::Admin])?;
    let rows = sqlx::query(
        "SELECT id, email, name, role, client_id, created_at FROM users
         WHERE ($1::TEXT IS NULL OR role = $1)
         ORDER BY name, email",
    )
    .bind(role.map(Role::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(user_from_row).collect())
}

/// Create a user. Admin only.
pub async fn create_user(pool: &PgPool, actor: &SessionUser, new_user: &NewUser) -> Result<UserRow, UserError> {
    access::require_role(actor, &[Role::Admin])?;
    let email = validate_new_user(new_user)?;

    let row = sqlx::query(
        "INSERT INTO users (email, name, role, client_id) VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING id, email, name, role, client_id, created_at",
    )
    .bind(&email)
    .bind(new_user.name.trim())
    .bind(new_user.role.as_str())
    .bind(new_user.client_id)
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::EmailTaken)?;

    tracing::info!(user_id = %row.get::<Uuid, _>("id"), role = new_user.role.as_str(), "user created");
    Ok(user_from_row(&row))
}

/// Ensure a client-role login exists for `email` and points at `client_id`.
///
/// An existing client user without a client is linked to this one. A login
/// that belongs to another client, or to staff, is left alone and reported
/// as `EmailTaken`.
pub(crate) async fn ensure_client_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    client_id: Uuid,
) -> Result<UserRow, UserError> {
    let email = normalize_email(email).ok_or(UserError::InvalidEmail)?;
    let row = sqlx::query(
        "INSERT INTO users (email, name, role, client_id) VALUES ($1, $2, 'client', $3)
         ON CONFLICT (email) DO UPDATE SET client_id = EXCLUDED.client_id
         WHERE users.role = 'client'
           AND (users.client_id IS NULL OR users.client_id = EXCLUDED.client_id)
         RETURNING id, email, name, role, client_id, created_at",
    )
    .bind(&email)
    .bind(name.trim())
    .bind(client_id)
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::EmailTaken)?;
    Ok(user_from_row(&row))
}

/// Look up the role of a user id, used to validate staff assignments.
pub(crate) async fn role_of(pool: &PgPool, user_id: Uuid) -> Result<Option<Role>, sqlx::Error> {
    let row = sqlx::query("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|r| Role::parse(&r.get::<String, _>("role"))))
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
