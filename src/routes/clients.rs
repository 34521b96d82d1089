//! Client record routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::routes::users::user_error;
use crate::services::client::{self, ClientError, ClientPatch, ClientRow, InviteOutcome, NewClient};
use crate::services::mailer::MailError;
use crate::state::AppState;

pub(crate) fn client_error(e: ClientError) -> ApiError {
    match e {
        ClientError::NotFound(_) => ApiError::not_found("client not found"),
        ClientError::EmptyName
        | ClientError::InvalidEmail
        | ClientError::NoEmail
        | ClientError::InvalidAssignment(..) => ApiError::bad_request(e.to_string()),
        ClientError::Access(e) => access_error(e),
        ClientError::User(e) => user_error(e),
        ClientError::Mail(MailError::Database(e)) | ClientError::Database(e) => ApiError::internal(&e),
        ClientError::Mail(e) => ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// `?clientId=` on every client-scoped GET.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdQuery {
    pub client_id: Uuid,
}

/// `{"clientId": ...}` body on client-scoped POSTs.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdBody {
    pub client_id: Uuid,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListClientsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// `GET /api/clients/list?includeArchived=`: clients the caller can see.
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListClientsQuery>,
) -> ApiResult<Vec<ClientRow>> {
    let clients = client::list_clients(&state.pool, &auth.user, query.include_archived)
        .await
        .map_err(client_error)?;
    ok(clients)
}

/// `GET /api/clients/get?clientId=`
pub async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ClientIdQuery>,
) -> ApiResult<ClientRow> {
    let client = client::get_client(&state.pool, &auth.user, query.client_id)
        .await
        .map_err(client_error)?;
    ok(client)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientBody {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
}

/// `POST /api/clients/create`
pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateClientBody>,
) -> ApiResult<ClientRow> {
    let new_client = NewClient {
        name: body.name,
        email: body.email,
        phone: body.phone,
        company: body.company,
        cpa_id: body.cpa_id,
        service_center_id: body.service_center_id,
    };
    let client = client::create_client(&state.pool, &auth.user, &new_client)
        .await
        .map_err(client_error)?;
    ok(client)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientBody {
    pub client_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub cpa_id: Option<Uuid>,
    pub service_center_id: Option<Uuid>,
}

/// `POST /api/clients/update`: absent fields are left unchanged.
pub async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<UpdateClientBody>,
) -> ApiResult<ClientRow> {
    let patch = ClientPatch {
        name: body.name,
        email: body.email,
        phone: body.phone,
        company: body.company,
        cpa_id: body.cpa_id,
        service_center_id: body.service_center_id,
    };
    let client = client::update_client(&state.pool, &auth.user, body.client_id, &patch)
        .await
        .map_err(client_error)?;
    ok(client)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveClientBody {
    pub client_id: Uuid,
    #[serde(default = "default_archived")]
    pub archived: bool,
}

fn default_archived() -> bool {
    true
}

/// `POST /api/clients/archive`: `archived: false` restores the client.
pub async fn archive_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ArchiveClientBody>,
) -> ApiResult<ClientRow> {
    let client = client::set_archived(&state.pool, &auth.user, body.client_id, body.archived)
        .await
        .map_err(client_error)?;
    ok(client)
}

/// `POST /api/clients/invite`: create the client's login and email an invite.
pub async fn invite_client(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ClientIdBody>,
) -> ApiResult<InviteOutcome> {
    let outcome = client::invite_client(
        &state.pool,
        state.transport(),
        &state.config.base_url,
        &auth.user,
        body.client_id,
    )
    .await
    .map_err(client_error)?;
    ok(outcome)
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod tests;
