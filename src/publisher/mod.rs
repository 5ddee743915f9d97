//! Publisher - pushes tracking artifacts to the hosted tables
//!
//! The aggregation core never talks to the portal directly. It hands finished
//! artifacts to a [`Publisher`], which uploads them as intermediate items,
//! upserts them into the hosted tracking tables and deletes the intermediates.
//!
//! ```text
//! authenticate → publish (per artifact) → discover_service → append_upsert (per artifact) → cleanup
//! ```
//!
//! [`PortalAdmin`] covers the one-off provisioning calls used by the setup tool.

pub mod flow;
pub mod portal;
pub mod types;

pub use flow::{publish_artifacts, PublishFailure, PublishStage, PublishSummary};
pub use portal::PortalPublisher;
pub use types::{PublishArtifact, RemoteHandle, RemoteTableHandle, ServiceHandle};

use crate::tracking_core::TrackingResult;
use async_trait::async_trait;

/// Upload and upsert contract for the four tracking artifacts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Establish a session; fails with `RemoteAuth` before any other call
    async fn authenticate(&mut self) -> TrackingResult<()>;

    /// Upload one CSV as an intermediate item and analyze it
    async fn publish(&self, artifact: &PublishArtifact) -> TrackingResult<RemoteHandle>;

    /// List the tables of the named hosted service, in service order
    async fn discover_service(&self, name: &str) -> TrackingResult<Vec<RemoteTableHandle>>;

    /// Upsert an uploaded artifact into a hosted table, matching on `key_column`
    async fn append_upsert(
        &self,
        table: &RemoteTableHandle,
        artifact: &PublishArtifact,
        handle: &RemoteHandle,
        key_column: &str,
    ) -> TrackingResult<()>;

    /// Delete an intermediate item
    async fn cleanup(&self, handle: &RemoteHandle) -> TrackingResult<()>;
}

/// A content item fetched from a template portal
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateItem {
    pub title: String,
    pub item_type: String,
    /// Item data (dashboard JSON)
    pub data: String,
}

/// Provisioning calls for the hosted tracking service
#[async_trait]
pub trait PortalAdmin: Send + Sync {
    async fn create_service(
        &self,
        name: &str,
        create_params: &serde_json::Value,
    ) -> TrackingResult<ServiceHandle>;

    async fn add_to_definition(
        &self,
        service: &ServiceHandle,
        definition: &serde_json::Value,
    ) -> TrackingResult<()>;

    /// Create a content folder and return its id
    async fn create_folder(&self, title: &str) -> TrackingResult<String>;

    async fn move_item(&self, item_id: &str, folder_id: &str) -> TrackingResult<()>;

    async fn fetch_template(&self, portal_url: &str, item_id: &str) -> TrackingResult<TemplateItem>;

    /// Add an item with inline data to a folder and return its id
    async fn add_item(&self, folder_id: &str, item: &TemplateItem) -> TrackingResult<String>;

    async fn update_title(&self, item_id: &str, title: &str) -> TrackingResult<()>;
}
