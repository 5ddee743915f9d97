//! Handles exchanged with the portal

use crate::tracking_core::TableKind;
use std::path::PathBuf;

/// A local CSV artifact ready to be uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct PublishArtifact {
    pub kind: TableKind,
    pub path: PathBuf,
    /// Item title and source table name; the artifact's file name
    pub title: String,
}

impl PublishArtifact {
    pub fn new(kind: TableKind, path: PathBuf) -> Self {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.file_stem().to_string());
        Self { kind, path, title }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.kind.header()
    }
}

/// An uploaded intermediate item
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteHandle {
    pub item_id: String,
    pub kind: TableKind,
    pub title: String,
    /// Publish parameters returned by the analyze step
    pub source_info: serde_json::Value,
}

/// One table of the hosted tracking service
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTableHandle {
    pub service_url: String,
    pub layer_id: u64,
    pub name: String,
}

impl RemoteTableHandle {
    pub fn url(&self) -> String {
        format!("{}/{}", self.service_url.trim_end_matches('/'), self.layer_id)
    }
}

/// A newly created hosted service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceHandle {
    pub item_id: String,
    pub url: String,
}
