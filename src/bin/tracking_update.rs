//! Tracking Update Binary - Editor, Team and Project Progress
//!
//! Tabulates the checkout layer, writes the dated tracking CSVs and upserts
//! them into the project's hosted tracking tables.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin tracking_update -- <checkout layer (.gpkg/.sqlite/.csv)> [--backend csv|sqlite]
//! ```
//!
//! `--backend sqlite` also mirrors the four tables into a local SQLite file.
//!
//! ## Environment Variables
//!
//! - PORTAL_URL, PORTAL_TOKEN or PORTAL_USERNAME/PORTAL_PASSWORD - portal sign-in
//! - PROJECT_NAME - Project name (default: first TeamTMU value)
//! - TRACKING_OUTPUT_ROOT - Root of the tracking folder (default: checkout layer's directory)
//! - TRACKING_TABLE - Table name inside a SQLite/GeoPackage file (default: CO)
//! - TRACKING_DB_PATH - SQLite mirror path (default: {root}/{project}_Project_Tracking/tracking.db)
//! - ENABLE_PUBLISH - Upload and upsert into the hosted tables (default: true)
//! - RUST_LOG - Logging level (optional, default: info)

use projtrack::config::{positional_args, TrackingConfig};
use projtrack::pipeline::{open_source, run_update, UpdateOptions};
use projtrack::publisher::{PortalPublisher, Publisher};
use projtrack::tracking_core::BackendType;
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let Some(source_path) = positional_args(&args, &["--backend"]).into_iter().next() else {
        log::error!("Usage: tracking_update <checkout layer> [--backend csv|sqlite]");
        return Err("missing checkout layer path".into());
    };
    let source_path = PathBuf::from(source_path);

    let config = TrackingConfig::from_env()?;
    let backend = BackendType::parse_from_args(&args)?;
    let options = UpdateOptions::from_config(&config, &source_path, backend.clone());

    log::info!("🚀 Starting tracking update");
    log::info!("   Checkout layer: {}", source_path.display());
    log::info!("   Output root: {}", options.output_root.display());
    log::info!("   Backend: {:?}", backend);
    log::info!("   Publish: {}", config.publish_enabled);

    let source = match open_source(&source_path, &config.table) {
        Ok(source) => source,
        Err(e) => {
            log::error!("❌ Could not open {}: {}", source_path.display(), e);
            return Err(e.into());
        }
    };

    let mut portal = if config.publish_enabled {
        Some(PortalPublisher::new(&config.portal)?)
    } else {
        None
    };
    let publisher = portal.as_mut().map(|p| p as &mut dyn Publisher);

    let outcome = run_update(source.as_ref(), &options, publisher).await?;

    for artifact in &outcome.artifacts {
        log::info!("   {} rows → {}", artifact.rows, artifact.path.display());
    }
    if let Some(summary) = &outcome.publish {
        log::info!("   Hosted tables updated: {}", summary.appended.len());
    }

    Ok(())
}
