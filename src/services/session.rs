//! Session management.
//!
//! ARCHITECTURE
//! ============
//! HTTP auth uses opaque random tokens stored in `sessions` with an explicit
//! expiry. A background sweeper deletes expired sessions and stale login
//! codes so both tables stay small.

use std::fmt::Write;
use std::time::Duration;

use rand::Rng;
use sqlx::{PgPool, Row};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::access::Role;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User row returned from session validation.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Set for role `client`: the client record this user belongs to.
    pub client_id: Option<Uuid>,
}

/// Create a session for the given user, returning the token.
pub async fn create_session(pool: &PgPool, user_id: Uuid, ttl_hours: i32) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at)
         VALUES ($1, $2, now() + make_interval(hours => $3))",
    )
    .bind(&token)
    .bind(user_id)
    .bind(ttl_hours)
    .execute(pool)
    .await?;
    Ok(token)
}

/// Validate a session token and return the associated user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.email, u.name, u.role, u.client_id
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let role: String = r.get("role");
        SessionUser {
            id: r.get("id"),
            email: r.get("email"),
            name: r.get("name"),
            // Unknown roles get the narrowest one.
            role: Role::parse(&role).unwrap_or(Role::Client),
            client_id: r.get("client_id"),
        }
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete expired sessions and login codes older than a day.
/// Returns `(sessions, codes)` removed.
pub async fn purge_expired(pool: &PgPool) -> Result<(u64, u64), sqlx::Error> {
    let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?
        .rows_affected();
    let codes = sqlx::query("DELETE FROM email_login_codes WHERE created_at < now() - INTERVAL '1 day'")
        .execute(pool)
        .await?
        .rows_affected();
    Ok((sessions, codes))
}

/// Spawn the periodic expiry sweeper. Returns a handle for shutdown.
pub fn spawn_session_sweeper(pool: PgPool, interval_secs: u64) -> JoinHandle<()> {
    info!(interval_secs, "session sweeper configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match purge_expired(&pool).await {
                Ok((0, 0)) => {}
                Ok((sessions, codes)) => info!(sessions, codes, "purged expired auth rows"),
                Err(e) => warn!(error = %e, "session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
