//! Help center routes.

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::routes::{Deleted, double_option};
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::ApiJson;
use crate::services::access::Role;
use crate::services::help::{self, HelpArticle, HelpDraft, HelpError, HelpPatch};
use crate::state::AppState;

pub(crate) fn help_error(e: HelpError) -> ApiError {
    match e {
        HelpError::NotFound(_) => ApiError::not_found("help article not found"),
        HelpError::Empty => ApiError::bad_request(e.to_string()),
        HelpError::Access(e) => access_error(e),
        HelpError::Database(e) => ApiError::internal(&e),
    }
}

/// `GET /api/help`: articles for the caller's role.
pub async fn list_articles(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Vec<HelpArticle>> {
    let articles = help::list_articles(&state.pool, &auth.user).await.map_err(help_error)?;
    ok(articles)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleBody {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub audience: Option<Role>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub published: bool,
}

/// `POST /api/help/create`
pub async fn create_article(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateArticleBody>,
) -> ApiResult<HelpArticle> {
    let draft = HelpDraft {
        title: body.title,
        body: body.body,
        category: body.category,
        audience: body.audience,
        sort_order: body.sort_order,
        published: body.published,
    };
    let article = help::create_article(&state.pool, &auth.user, &draft).await.map_err(help_error)?;
    ok(article)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleBody {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub audience: Option<Option<Role>>,
    pub sort_order: Option<i32>,
    pub published: Option<bool>,
}

/// `POST /api/help/update`
pub async fn update_article(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<UpdateArticleBody>,
) -> ApiResult<HelpArticle> {
    let patch = HelpPatch {
        title: body.title,
        body: body.body,
        category: body.category,
        audience: body.audience,
        sort_order: body.sort_order,
        published: body.published,
    };
    let article = help::update_article(&state.pool, &auth.user, body.id, &patch)
        .await
        .map_err(help_error)?;
    ok(article)
}

#[derive(Deserialize)]
pub struct DeleteArticleBody {
    pub id: Uuid,
}

/// `POST /api/help/delete`
pub async fn delete_article(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DeleteArticleBody>,
) -> ApiResult<Deleted> {
    help::delete_article(&state.pool, &auth.user, body.id).await.map_err(help_error)?;
    ok(Deleted { id: body.id })
}

#[cfg(test)]
#[path = "help_test.rs"]
mod tests;
