//! Help center articles.
//!
//! Articles with no audience are for everyone; otherwise only the named role
//! sees them. Admins see drafts and every audience.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::access::{self, AccessError, Role};
use crate::services::session::SessionUser;

const HELP_COLUMNS: &str = "id, title, body, category, audience, sort_order, published, created_at, updated_at";
const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpArticle {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub audience: Option<Role>,
    pub sort_order: i32,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct HelpDraft {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub audience: Option<Role>,
    pub sort_order: i32,
    pub published: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HelpPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    /// `Some(None)` makes the article visible to every role.
    pub audience: Option<Option<Role>>,
    pub sort_order: Option<i32>,
    pub published: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum HelpError {
    #[error("help article not found: {0}")]
    NotFound(Uuid),
    #[error("title and body must not be empty")]
    Empty,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn article_from_row(row: &PgRow) -> HelpArticle {
    let audience: Option<String> = row.get("audience");
    HelpArticle {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        category: row.get("category"),
        audience: audience.as_deref().and_then(Role::parse),
        sort_order: row.get("sort_order"),
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Whether `role` should see `article` in the help center.
#[must_use]
pub fn article_visible(role: Role, article: &HelpArticle) -> bool {
    if role == Role::Admin {
        return true;
    }
    article.published && article.audience.is_none_or(|audience| audience == role)
}

pub async fn list_articles(pool: &PgPool, user: &SessionUser) -> Result<Vec<HelpArticle>, HelpError> {
    let rows = sqlx::query(&format!(
        "SELECT {HELP_COLUMNS} FROM help_articles ORDER BY category, sort_order, title"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(article_from_row)
        .filter(|a| article_visible(user.role, a))
        .collect())
}

pub async fn create_article(pool: &PgPool, user: &SessionUser, draft: &HelpDraft) -> Result<HelpArticle, HelpError> {
    access::require_role(user, &[Role::Admin])?;
    let (title, body) = (draft.title.trim(), draft.body.trim());
    if title.is_empty() || body.is_empty() {
        return Err(HelpError::Empty);
    }
    let category = draft
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);

    let row = sqlx::query(&format!(
        "INSERT INTO help_articles (title, body, category, audience, sort_order, published)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {HELP_COLUMNS}"
    ))
    .bind(title)
    .bind(body)
    .bind(category)
    .bind(draft.audience.map(Role::as_str))
    .bind(draft.sort_order)
    .bind(draft.published)
    .fetch_one(pool)
    .await?;
    Ok(article_from_row(&row))
}

pub async fn update_article(
    pool: &PgPool,
    user: &SessionUser,
    id: Uuid,
    patch: &HelpPatch,
) -> Result<HelpArticle, HelpError> {
    access::require_role(user, &[Role::Admin])?;
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&patch.title) || blank(&patch.body) {
        return Err(HelpError::Empty);
    }

    let row = sqlx::query(&format!(
        "UPDATE help_articles SET
             title = COALESCE($2, title),
             body = COALESCE($3, body),
             category = COALESCE($4, category),
             audience = CASE WHEN $5 THEN $6 ELSE audience END,
             sort_order = COALESCE($7, sort_order),
             published = COALESCE($8, published),
             updated_at = now()
         WHERE id = $1
         RETURNING {HELP_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.title.as_deref().map(str::trim))
    .bind(patch.body.as_deref().map(str::trim))
    .bind(patch.category.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(patch.audience.is_some())
    .bind(patch.audience.flatten().map(Role::as_str))
    .bind(patch.sort_order)
    .bind(patch.published)
    .fetch_optional(pool)
    .await?
    .ok_or(HelpError::NotFound(id))?;
    Ok(article_from_row(&row))
}

pub async fn delete_article(pool: &PgPool, user: &SessionUser, id: Uuid) -> Result<(), HelpError> {
    access::require_role(user, &[Role::Admin])?;
    let deleted = sqlx::query("DELETE FROM help_articles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(HelpError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "help_test.rs"]
mod tests;
