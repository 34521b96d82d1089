//! Folder tree for the document explorer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::Document;

/// One folder in the explorer tree. The root has an empty name and path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    /// Child folders sorted by name.
    pub folders: Vec<FolderNode>,
    /// Documents directly inside this folder, in input order.
    pub documents: Vec<Document>,
}

impl FolderNode {
    /// Total documents in this folder and every descendant.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len() + self.folders.iter().map(FolderNode::document_count).sum::<usize>()
    }
}

#[derive(Default)]
struct Builder {
    folders: BTreeMap<String, Builder>,
    documents: Vec<Document>,
}

impl Builder {
    fn insert(&mut self, segments: &[&str], doc: Document) {
        match segments.split_first() {
            None => self.documents.push(doc),
            Some((head, rest)) => self.folders.entry((*head).to_owned()).or_default().insert(rest, doc),
        }
    }

    fn finish(self, name: String, path: String) -> FolderNode {
        let folders = self
            .folders
            .into_iter()
            .map(|(child, builder)| {
                let child_path = if path.is_empty() { child.clone() } else { format!("{path}/{child}") };
                builder.finish(child, child_path)
            })
            .collect();
        FolderNode { name, path, folders, documents: self.documents }
    }
}

/// Split a folder path into its non-blank, trimmed segments.
#[must_use]
pub fn folder_segments(folder: &str) -> Vec<&str> {
    folder
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Canonical form of a folder path: trimmed segments joined by `/`.
#[must_use]
pub fn normalize_folder(folder: &str) -> String {
    folder_segments(folder).join("/")
}

/// Build the explorer tree rooted at an unnamed folder.
#[must_use]
pub fn build_tree(documents: impl IntoIterator<Item = Document>) -> FolderNode {
    let mut root = Builder::default();
    for doc in documents {
        let folder = doc.folder.clone();
        root.insert(&folder_segments(&folder), doc);
    }
    root.finish(String::new(), String::new())
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
