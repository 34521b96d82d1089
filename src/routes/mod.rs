//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` plus a liveness check. Every
//! API body is wrapped in the `{success, data?, error?}` envelope; handlers
//! translate HTTP to service calls and map service errors to status codes.

pub mod auth;
pub mod clients;
pub mod documents;
pub mod email_logs;
pub mod error;
pub mod extract;
pub mod help;
pub mod stages;
pub mod tasks;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Body of delete responses.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Deserialize a field where absent means "leave alone" and `null` means
/// "clear". Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/email/request-code", post(auth::request_email_code))
        .route("/auth/email/verify-code", post(auth::verify_email_code))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/users/list", get(users::list_users))
        .route("/users/create", post(users::create_user))
        .route("/clients/list", get(clients::list_clients))
        .route("/clients/get", get(clients::get_client))
        .route("/clients/create", post(clients::create_client))
        .route("/clients/update", post(clients::update_client))
        .route("/clients/archive", post(clients::archive_client))
        .route("/clients/invite", post(clients::invite_client))
        .route("/stages/client/get", get(stages::get_client_stages))
        .route("/stages/client/save", post(stages::save_client_stages))
        .route("/stages/client/reorder", post(stages::reorder_client_stages))
        .route("/stages/client/delete", post(stages::delete_client_stage))
        .route("/stages/subtask/update", post(stages::update_subtask))
        .route("/stages/templates", get(stages::list_templates).post(stages::create_template))
        .route("/stages/template/apply", post(stages::apply_template))
        .route("/tasks/list", get(tasks::list_tasks))
        .route("/tasks/create", post(tasks::create_task))
        .route("/tasks/update", post(tasks::update_task))
        .route("/tasks/delete", post(tasks::delete_task))
        .route("/documents/upload", post(documents::upload_document))
        .route("/documents/list", get(documents::list_documents))
        .route("/documents/download/{id}", get(documents::download_document))
        .route("/documents/delete", post(documents::delete_document))
        .route("/email-logs", get(email_logs::list_email_logs).put(email_logs::update_email_log))
        .route("/help", get(help::list_articles))
        .route("/help/create", post(help::create_article))
        .route("/help/update", post(help::update_article))
        .route("/help/delete", post(help::delete_article))
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let max_body = state.config.max_upload_bytes;

    Router::new()
        .nest("/api", api_routes())
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
