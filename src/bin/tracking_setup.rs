//! Tracking Setup Binary - Hosted Tracking Service Provisioning
//!
//! Creates `{project}_Tracking_Table_Service` with its four tables, files it in
//! a `{project}_Tracking` folder and clones the dashboard template.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin tracking_setup -- <checkout layer (.gpkg/.sqlite/.csv)>
//! ```
//!
//! ## Environment Variables
//!
//! - PORTAL_URL, PORTAL_TOKEN or PORTAL_USERNAME/PORTAL_PASSWORD - portal sign-in
//! - PROJECT_NAME - Project name (default: first TeamTMU value)
//! - TRACKING_TABLE - Table name inside a SQLite/GeoPackage file (default: CO)
//! - TEMPLATE_ITEM_ID, TEMPLATE_SERVICE_ID, TEMPLATE_PORTAL_URL - dashboard template (optional)
//! - RUST_LOG - Logging level (optional, default: info)

use projtrack::config::{positional_args, TrackingConfig};
use projtrack::pipeline::open_source;
use projtrack::publisher::{PortalPublisher, Publisher};
use projtrack::setup::{project_name_from, provision, ProvisionPlan};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config = TrackingConfig::from_env()?;

    let project = match config.project_name.clone() {
        Some(project) => project,
        None => {
            let Some(source_path) = positional_args(&args, &[]).into_iter().next() else {
                log::error!("Usage: tracking_setup <checkout layer> (or set PROJECT_NAME)");
                return Err("missing checkout layer path".into());
            };
            let source = open_source(&PathBuf::from(source_path), &config.table)?;
            project_name_from(source.as_ref())?
        }
    };
    let plan = ProvisionPlan::new(&project);

    log::info!("🚀 Provisioning tracking for {}", plan.project);
    log::info!("   Service: {}", plan.service_name);
    log::info!("   Folder: {}", plan.folder_name);

    let mut portal = PortalPublisher::new(&config.portal)?;
    if let Err(e) = portal.authenticate().await {
        log::error!(
            "❌ Invalid credentials for the portal. Check PORTAL_TOKEN or PORTAL_USERNAME and PORTAL_PASSWORD. ({})",
            e
        );
        return Err(e.into());
    }

    match provision(&portal, &plan, config.template.as_ref()).await {
        Ok(outcome) => {
            log::info!("✅ {} ready at {}", plan.service_name, outcome.service.url);
            if let Some(id) = outcome.dashboard_id {
                log::info!("   Dashboard {}: {}", plan.dashboard_title, id);
            }
            Ok(())
        }
        Err(failure) => {
            log::error!("❌ {} ({})", plan.failure_message(failure.stage), failure.error);
            Err(failure.into())
        }
    }
}
