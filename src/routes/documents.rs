//! Document routes: multipart upload, bucketed listing, download, delete.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use onboarding::{Document, Visibility};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::clients::ClientIdQuery;
use crate::routes::Deleted;
use crate::routes::error::{ApiError, ApiResult, access_error, ok};
use crate::routes::extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery};
use crate::services::document::{self, DocumentError, DocumentListing, Upload};
use crate::state::AppState;

pub(crate) fn document_error(e: DocumentError) -> ApiError {
    match e {
        DocumentError::NotFound(_) => ApiError::not_found("document not found"),
        DocumentError::EmptyFileName | DocumentError::EmptyFile => ApiError::bad_request(e.to_string()),
        DocumentError::Access(e) => access_error(e),
        DocumentError::Storage(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(error = %e, "document bytes missing from storage");
            ApiError::not_found("document file missing")
        }
        DocumentError::Storage(e) => ApiError::internal(&e),
        DocumentError::Database(e) => ApiError::internal(&e),
    }
}

fn multipart_error(e: &MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

/// Upload form fields, collected before the service call.
#[derive(Default)]
struct UploadForm {
    client_id: Option<Uuid>,
    folder: String,
    visibility: Visibility,
    file: Option<(String, Option<String>, Vec<u8>)>,
}

impl UploadForm {
    fn into_upload(self) -> Result<(Uuid, Upload), ApiError> {
        let client_id = self.client_id.ok_or_else(|| ApiError::bad_request("clientId is required"))?;
        let (file_name, content_type, bytes) = self.file.ok_or_else(|| ApiError::bad_request("file is required"))?;
        Ok((client_id, Upload { file_name, folder: self.folder, content_type, visibility: self.visibility, bytes }))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "clientId" => {
                let raw = field.text().await.map_err(|e| multipart_error(&e))?;
                let id = Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("invalid clientId"))?;
                form.client_id = Some(id);
            }
            "folder" => form.folder = field.text().await.map_err(|e| multipart_error(&e))?,
            "visibility" => {
                form.visibility = Visibility::parse(&field.text().await.map_err(|e| multipart_error(&e))?);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                form.file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// `POST /api/documents/upload`: multipart fields `clientId`, `file`,
/// optional `folder` and `visibility`.
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<Document> {
    let (client_id, upload) = read_form(multipart).await?.into_upload()?;
    let created = document::upload_document(&state.pool, &state.documents, &auth.user, client_id, upload)
        .await
        .map_err(document_error)?;
    ok(created)
}

/// `GET /api/documents/list?clientId=`
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ClientIdQuery>,
) -> ApiResult<DocumentListing> {
    let listing = document::list_documents(&state.pool, &auth.user, query.client_id)
        .await
        .map_err(document_error)?;
    ok(listing)
}

/// `GET /api/documents/download/{id}`: raw bytes as an attachment.
pub async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(document_id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let (doc, bytes) = document::download_document(&state.pool, &state.documents, &auth.user, document_id)
        .await
        .map_err(document_error)?;

    let headers = [
        (CONTENT_TYPE, content_type_header(&doc.content_type)),
        (CONTENT_DISPOSITION, attachment_header(&doc.file_name)),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// Rows stored before upload sanitizing may hold unusable values.
fn content_type_header(content_type: &str) -> HeaderValue {
    HeaderValue::from_str(content_type).unwrap_or_else(|_| HeaderValue::from_static(document::DEFAULT_CONTENT_TYPE))
}

fn attachment_header(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentBody {
    pub document_id: Uuid,
}

/// `POST /api/documents/delete`
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DeleteDocumentBody>,
) -> ApiResult<Deleted> {
    document::delete_document(&state.pool, &state.documents, &auth.user, body.document_id)
        .await
        .map_err(document_error)?;
    ok(Deleted { id: body.document_id })
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
