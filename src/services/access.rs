//! Roles and per-client access checks.
//!
//! DESIGN
//! ======
//! Every client-scoped service call starts with [`ensure_client_access`].
//! The decision itself is the pure [`allows`] over `(role, relation,
//! permission, archived)` so the matrix can be tested without a database.
//!
//! | Role            | relation          | View | Contribute | Manage |
//! |-----------------|-------------------|------|------------|--------|
//! | admin           | any               | yes  | yes        | yes    |
//! | cpa             | assigned CPA      | yes  | yes        | yes    |
//! | service_center  | assigned center   | yes  | yes        | yes    |
//! | client          | own client        | yes  | yes        | no     |
//!
//! Archived clients only grant `View`.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::session::SessionUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cpa,
    ServiceCenter,
    Client,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cpa => "cpa",
            Self::ServiceCenter => "service_center",
            Self::Client => "client",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "admin" => Some(Self::Admin),
            "cpa" => Some(Self::Cpa),
            "service_center" => Some(Self::ServiceCenter),
            "client" => Some(Self::Client),
            _ => None,
        }
    }

    /// Firm-side roles: everyone except `client`.
    #[must_use]
    pub fn is_staff(self) -> bool {
        !matches!(self, Self::Client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    /// Upload documents, update subtask progress.
    Contribute,
    /// Edit the client record, stages, templates and tasks.
    Manage,
}

/// How a user relates to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Unrelated,
    AssignedCpa,
    AssignedServiceCenter,
    OwnClient,
}

/// The columns of a client row that access decisions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientScope {
    pub id: Uuid,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
    pub archived: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("client not found: {0}")]
    NotFound(Uuid),
    #[error("forbidden")]
    Forbidden,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[must_use]
pub fn relation(user: &SessionUser, scope: &ClientScope) -> Relation {
    match user.role {
        Role::Cpa if scope.cpa_id == Some(user.id) => Relation::AssignedCpa,
        Role::ServiceCenter if scope.service_center_id == Some(user.id) => Relation::AssignedServiceCenter,
        Role::Client if user.client_id == Some(scope.id) => Relation::OwnClient,
        _ => Relation::Unrelated,
    }
}

#[must_use]
pub fn allows(role: Role, relation: Relation, permission: Permission, archived: bool) -> bool {
    if archived && permission != Permission::View {
        return false;
    }
    match (role, relation) {
        (Role::Admin, _) | (Role::Cpa, Relation::AssignedCpa) | (Role::ServiceCenter, Relation::AssignedServiceCenter) => {
            true
        }
        (Role::Client, Relation::OwnClient) => permission != Permission::Manage,
        _ => false,
    }
}

/// Fail with [`AccessError::Forbidden`] unless the user has one of `roles`.
///
/// # Errors
///
/// Returns `Forbidden` for any other role.
pub fn require_role(user: &SessionUser, roles: &[Role]) -> Result<(), AccessError> {
    if roles.contains(&user.role) { Ok(()) } else { Err(AccessError::Forbidden) }
}

/// Load a client's scope and check `permission` for `user`.
///
/// Unrelated users get `NotFound` rather than `Forbidden` so client ids do
/// not leak across tenants.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub async fn ensure_client_access(
    pool: &PgPool,
    client_id: Uuid,
    user: &SessionUser,
    permission: Permission,
) -> Result<ClientScope, AccessError> {
    let row = sqlx::query("SELECT id, cpa_id, service_center_id, archived FROM clients WHERE id = $1")
        .bind(client_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AccessError::NotFound(client_id))?;

    let scope = ClientScope {
        id: row.get("id"),
        cpa_id: row.get("cpa_id"),
        service_center_id: row.get("service_center_id"),
        archived: row.get("archived"),
    };

    let rel = relation(user, &scope);
    if allows(user.role, rel, permission, scope.archived) {
        return Ok(scope);
    }
    if rel == Relation::Unrelated && user.role != Role::Admin {
        return Err(AccessError::NotFound(client_id));
    }
    Err(AccessError::Forbidden)
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
