//! Admin user provisioning routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::services::access::Role;
use crate::services::user::{self, NewUser, UserError, UserRow};
use crate::state::AppState;

pub(crate) fn user_error(e: UserError) -> ApiError {
    match e {
        UserError::InvalidEmail | UserError::EmptyName | UserError::ClientMismatch => {
            ApiError::bad_request(e.to_string())
        }
        UserError::EmailTaken => ApiError::new(StatusCode::CONFLICT, e.to_string()),
        UserError::Access(e) => access_error(e),
        UserError::Database(e) => ApiError::internal(&e),
    }
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::parse(raw).ok_or_else(|| ApiError::bad_request(format!("unknown role: {raw}")))
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

/// `GET /api/users/list?role=`: every user, optionally one role.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> ApiResult<Vec<UserRow>> {
    let role = query.role.as_deref().map(parse_role).transpose()?;
    let users = user::list_users(&state.pool, &auth.user, role).await.map_err(user_error)?;
    ok(users)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub email: String,
    pub name: String,
    pub role: String,
    pub client_id: Option<Uuid>,
}

/// `POST /api/users/create`: provision a login.
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateUserBody>,
) -> ApiResult<UserRow> {
    let new_user = NewUser { email: body.email, name: body.name, role: parse_role(&body.role)?, client_id: body.client_id };
    let created = user::create_user(&state.pool, &auth.user, &new_user).await.map_err(user_error)?;
    ok(created)
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
