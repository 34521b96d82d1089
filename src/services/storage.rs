//! File storage for uploaded documents.
//!
//! Bytes live on local disk under the configured root, keyed by
//! `{client_id}/{document_id}`. Metadata lives in the `documents` table;
//! this module never touches the database.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

#[must_use]
pub fn storage_key(client_id: Uuid, document_id: Uuid) -> String {
    format!("{client_id}/{document_id}")
}

impl DocumentStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root. Keys with anything other than
    /// plain UUID segments are rejected.
    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let mut path = self.root.clone();
        let mut segments = 0;
        for segment in key.split('/') {
            if Uuid::parse_str(segment).is_err() {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid storage key: {key}")));
            }
            path.push(segment);
            segments += 1;
        }
        if segments != 2 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid storage key: {key}")));
        }
        Ok(path)
    }

    /// Write `bytes` under `key`, creating the client directory as needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for an invalid key or a failed write.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored under `key`.
    pub async fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await
    }

    /// Delete the file for `key`. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for an invalid key or a failed delete.
    pub async fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
