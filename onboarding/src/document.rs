//! Document records and visibility buckets.
//!
//! Buckets are derived from `visibility` and `uploaded_by` on every read and
//! never stored.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    #[default]
    #[serde(other)]
    Shared,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
        }
    }

    /// Parse a stored value; anything unrecognized is shared.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("private") { Self::Private } else { Self::Shared }
    }
}

/// Who uploaded a document. Rows from before the field existed are `Legacy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadedBy {
    Admin,
    Client,
    #[default]
    #[serde(other)]
    Legacy,
}

impl UploadedBy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Client => "CLIENT",
            Self::Legacy => "LEGACY",
        }
    }

    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_uppercase()).as_deref() {
            Some("ADMIN") => Self::Admin,
            Some("CLIENT") => Self::Client,
            _ => Self::Legacy,
        }
    }
}

/// Display bucket of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentBucket {
    AdminOnly,
    ClientOnly,
    LegacyShared,
}

/// Classify a document into its display bucket.
///
/// private + admin-uploaded is admin-only, client-uploaded is client-only,
/// everything else is legacy/shared.
#[must_use]
pub fn classify(visibility: Visibility, uploaded_by: UploadedBy) -> DocumentBucket {
    match (visibility, uploaded_by) {
        (Visibility::Private, UploadedBy::Admin) => DocumentBucket::AdminOnly,
        (_, UploadedBy::Client) => DocumentBucket::ClientOnly,
        _ => DocumentBucket::LegacyShared,
    }
}

/// Document metadata as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub client_id: Uuid,
    pub file_name: String,
    /// Slash-separated folder path; empty for the root.
    #[serde(default)]
    pub folder: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub uploaded_by: UploadedBy,
    pub uploader_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Document {
    #[must_use]
    pub fn bucket(&self) -> DocumentBucket {
        classify(self.visibility, self.uploaded_by)
    }
}

/// Documents grouped by [`DocumentBucket`], each group in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBuckets {
    pub admin_only: Vec<Document>,
    pub client_only: Vec<Document>,
    pub legacy_shared: Vec<Document>,
}

impl DocumentBuckets {
    #[must_use]
    pub fn partition(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut out = Self::default();
        for doc in documents {
            match doc.bucket() {
                DocumentBucket::AdminOnly => out.admin_only.push(doc),
                DocumentBucket::ClientOnly => out.client_only.push(doc),
                DocumentBucket::LegacyShared => out.legacy_shared.push(doc),
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.admin_only.len() + self.client_only.len() + self.legacy_shared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
