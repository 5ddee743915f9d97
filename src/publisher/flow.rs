//! Publish flow for one run's artifacts
//!
//! Uploads are attempted for every artifact so each failure is reported on its
//! own; the run stops before touching the hosted tables if any upload failed.

use super::types::{PublishArtifact, RemoteHandle};
use super::Publisher;
use crate::tracking_core::{ArtifactError, TableKind, TrackingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Authenticate,
    Upload,
    Discover,
    Append,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishStage::Authenticate => write!(f, "authenticate"),
            PublishStage::Upload => write!(f, "upload"),
            PublishStage::Discover => write!(f, "discover"),
            PublishStage::Append => write!(f, "append"),
        }
    }
}

/// What happened to each artifact
#[derive(Debug, Default)]
pub struct PublishSummary {
    pub uploaded: Vec<RemoteHandle>,
    pub appended: Vec<TableKind>,
    /// Upload or append failures, one per artifact
    pub failures: Vec<ArtifactError>,
    pub cleanup_failures: Vec<ArtifactError>,
}

#[derive(Debug)]
pub struct PublishFailure {
    pub stage: PublishStage,
    pub error: TrackingError,
    pub summary: PublishSummary,
}

impl std::fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Publishing stopped at {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for PublishFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn artifact_error(artifact: &PublishArtifact, source: TrackingError) -> ArtifactError {
    ArtifactError {
        kind: artifact.kind,
        path: artifact.path.clone(),
        source,
    }
}

/// Authenticate, upload, upsert and clean up
///
/// Intermediate items are deleted only after the append stage has run; when
/// uploads fail the items that did upload are left in place and listed in the
/// summary.
pub async fn publish_artifacts<P>(
    publisher: &mut P,
    service_name: &str,
    artifacts: &[PublishArtifact],
) -> Result<PublishSummary, PublishFailure>
where
    P: Publisher + ?Sized,
{
    let mut summary = PublishSummary::default();

    if let Err(error) = publisher.authenticate().await {
        return Err(PublishFailure {
            stage: PublishStage::Authenticate,
            error,
            summary,
        });
    }

    for artifact in artifacts {
        match publisher.publish(artifact).await {
            Ok(handle) => summary.uploaded.push(handle),
            Err(e) => {
                log::error!("❌ Upload failed for {}: {}", artifact.title, e);
                summary.failures.push(artifact_error(artifact, e));
            }
        }
    }

    if !summary.failures.is_empty() {
        let error = TrackingError::Remote(format!(
            "{} of {} uploads failed",
            summary.failures.len(),
            artifacts.len()
        ));
        return Err(PublishFailure {
            stage: PublishStage::Upload,
            error,
            summary,
        });
    }

    let tables = match publisher.discover_service(service_name).await {
        Ok(tables) => tables,
        Err(error) => {
            return Err(PublishFailure {
                stage: PublishStage::Discover,
                error,
                summary,
            })
        }
    };

    for (artifact, handle) in artifacts.iter().zip(summary.uploaded.iter()) {
        let index = artifact.kind.service_index();
        let result = match tables.get(index) {
            Some(table) => {
                publisher
                    .append_upsert(table, artifact, handle, artifact.kind.key_column())
                    .await
            }
            None => Err(TrackingError::RemoteNotFound(format!(
                "{} has no table at index {}",
                service_name, index
            ))),
        };

        match result {
            Ok(()) => summary.appended.push(artifact.kind),
            Err(e) => {
                log::error!("❌ Append failed for {}: {}", artifact.title, e);
                summary.failures.push(artifact_error(artifact, e));
            }
        }
    }

    for (artifact, handle) in artifacts.iter().zip(summary.uploaded.iter()) {
        if let Err(e) = publisher.cleanup(handle).await {
            log::warn!("⚠️  Could not delete intermediate item {}: {}", handle.item_id, e);
            summary.cleanup_failures.push(artifact_error(artifact, e));
        }
    }

    if !summary.failures.is_empty() {
        let error = TrackingError::Remote(format!(
            "{} of {} appends failed",
            summary.failures.len(),
            artifacts.len()
        ));
        return Err(PublishFailure {
            stage: PublishStage::Append,
            error,
            summary,
        });
    }

    log::info!(
        "✅ Published {} tables to {}",
        summary.appended.len(),
        service_name
    );
    Ok(summary)
}
