//! Client documents: upload, listing, download and delete.
//!
//! DESIGN
//! ======
//! Metadata rows live in `documents`; bytes live in the [`DocumentStore`]
//! under `{client_id}/{document_id}`. Every listing is bucketed with
//! [`onboarding::classify`] and rendered as a folder tree.
//!
//! Visibility is enforced here, not only displayed: client users never
//! receive admin-only documents, and asking for one by id answers NotFound.
//! A client upload is always shared and attributed to the client; staff
//! uploads are attributed to the firm and may be private.

use onboarding::{Document, DocumentBucket, DocumentBuckets, FolderNode, UploadedBy, Visibility, build_tree};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::access::{self, AccessError, Permission, Role};
use crate::services::session::SessionUser;
use crate::services::storage::{DocumentStore, storage_key};

const DOCUMENT_COLUMNS: &str =
    "id, client_id, file_name, folder, content_type, size_bytes, visibility, uploaded_by, uploader_id, created_at";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub folder: String,
    pub content_type: Option<String>,
    pub visibility: Visibility,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListing {
    pub total: usize,
    pub buckets: DocumentBuckets,
    pub tree: FolderNode,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(Uuid),
    #[error("file name must not be empty")]
    EmptyFileName,
    #[error("file is empty")]
    EmptyFile,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn document_from_row(row: &PgRow) -> Document {
    let visibility: String = row.get("visibility");
    let uploaded_by: Option<String> = row.get("uploaded_by");
    Document {
        id: row.get("id"),
        client_id: row.get("client_id"),
        file_name: row.get("file_name"),
        folder: row.get("folder"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        visibility: Visibility::parse(&visibility),
        uploaded_by: UploadedBy::parse(uploaded_by.as_deref()),
        uploader_id: row.get("uploader_id"),
        created_at: row.get("created_at"),
    }
}

/// Keep only the last path component of a browser-supplied file name, minus
/// control characters, which could not be sent back in a header.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let name = cleaned.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." { None } else { Some(name.to_owned()) }
}

/// The uploader's content type if it is a usable header value, else
/// [`DEFAULT_CONTENT_TYPE`].
#[must_use]
pub fn sanitize_content_type(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_graphic() || b == b' '))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_owned()
}

/// Who a new upload is attributed to, and the visibility it is stored with.
#[must_use]
pub fn upload_attribution(role: Role, requested: Visibility) -> (UploadedBy, Visibility) {
    if role == Role::Client {
        (UploadedBy::Client, Visibility::Shared)
    } else {
        (UploadedBy::Admin, requested)
    }
}

/// Whether `role` may see a document in `bucket`.
#[must_use]
pub fn visible_to(role: Role, bucket: DocumentBucket) -> bool {
    role.is_staff() || bucket != DocumentBucket::AdminOnly
}

/// Bucket and tree the documents `role` may see.
#[must_use]
pub fn listing_for(role: Role, documents: Vec<Document>) -> DocumentListing {
    let visible: Vec<Document> = documents.into_iter().filter(|d| visible_to(role, d.bucket())).collect();
    DocumentListing { total: visible.len(), buckets: DocumentBuckets::partition(visible.clone()), tree: build_tree(visible) }
}

async fn load_document(pool: &PgPool, document_id: Uuid) -> Result<Document, DocumentError> {
    let row = sqlx::query(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
        .bind(document_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DocumentError::NotFound(document_id))?;
    Ok(document_from_row(&row))
}

/// Load a document and check that `user` may see it.
async fn visible_document(pool: &PgPool, user: &SessionUser, document_id: Uuid) -> Result<Document, DocumentError> {
    let document = load_document(pool, document_id).await?;
    access::ensure_client_access(pool, document.client_id, user, Permission::View).await?;
    if !visible_to(user.role, document.bucket()) {
        return Err(DocumentError::NotFound(document_id));
    }
    Ok(document)
}

// =============================================================================
// OPERATIONS
// =============================================================================

pub async fn upload_document(
    pool: &PgPool,
    store: &DocumentStore,
    user: &SessionUser,
    client_id: Uuid,
    upload: Upload,
) -> Result<Document, DocumentError> {
    let file_name = sanitize_file_name(&upload.file_name).ok_or(DocumentError::EmptyFileName)?;
    if upload.bytes.is_empty() {
        return Err(DocumentError::EmptyFile);
    }
    access::ensure_client_access(pool, client_id, user, Permission::Contribute).await?;

    let (uploaded_by, visibility) = upload_attribution(user.role, upload.visibility);
    let document_id = Uuid::new_v4();
    let key = storage_key(client_id, document_id);
    let content_type = sanitize_content_type(upload.content_type.as_deref());
    let size_bytes = i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX);

    store.put(&key, &upload.bytes).await?;

    let inserted = sqlx::query(&format!(
        "INSERT INTO documents
             (id, client_id, file_name, folder, content_type, size_bytes, visibility, uploaded_by, storage_key, uploader_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(document_id)
    .bind(client_id)
    .bind(&file_name)
    .bind(onboarding::tree::normalize_folder(&upload.folder))
    .bind(&content_type)
    .bind(size_bytes)
    .bind(visibility.as_str())
    .bind(uploaded_by.as_str())
    .bind(&key)
    .bind(user.id)
    .fetch_one(pool)
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            if let Err(cleanup) = store.remove(&key).await {
                tracing::warn!(%key, error = %cleanup, "orphaned upload left on disk");
            }
            return Err(e.into());
        }
    };

    tracing::info!(%client_id, %document_id, size_bytes, uploaded_by = uploaded_by.as_str(), "document uploaded");
    Ok(document_from_row(&row))
}

pub async fn list_documents(
    pool: &PgPool,
    user: &SessionUser,
    client_id: Uuid,
) -> Result<DocumentListing, DocumentError> {
    access::ensure_client_access(pool, client_id, user, Permission::View).await?;
    let rows = sqlx::query(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE client_id = $1 ORDER BY created_at, file_name"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(listing_for(user.role, rows.iter().map(document_from_row).collect()))
}

/// Metadata and bytes of one document.
pub async fn download_document(
    pool: &PgPool,
    store: &DocumentStore,
    user: &SessionUser,
    document_id: Uuid,
) -> Result<(Document, Vec<u8>), DocumentError> {
    let document = visible_document(pool, user, document_id).await?;
    let bytes = store.read(&storage_key(document.client_id, document.id)).await?;
    Ok((document, bytes))
}

/// Staff with `Manage` may delete any document; client users only their own uploads.
pub async fn delete_document(
    pool: &PgPool,
    store: &DocumentStore,
    user: &SessionUser,
    document_id: Uuid,
) -> Result<(), DocumentError> {
    let document = visible_document(pool, user, document_id).await?;
    let permission = if user.role == Role::Client && document.uploader_id == Some(user.id) {
        Permission::Contribute
    } else {
        Permission::Manage
    };
    access::ensure_client_access(pool, document.client_id, user, permission).await?;

    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(document_id)
        .execute(pool)
        .await?;
    store.remove(&storage_key(document.client_id, document.id)).await?;

    tracing::info!(client_id = %document.client_id, %document_id, actor = %user.id, "document deleted");
    Ok(())
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
