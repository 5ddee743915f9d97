//! Provisioning flow for a new project's hosted tracking tables

use super::schema::{service_definition, ServiceParams};
use crate::config::TemplateConfig;
use crate::publisher::{PortalAdmin, ServiceHandle};
use crate::tracking_core::fields::TEAM;
use crate::tracking_core::{RowSource, TrackingError, TrackingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    CreateService,
    CreateFolder,
    CloneTemplate,
    RenameDashboard,
}

#[derive(Debug)]
pub struct ProvisionFailure {
    pub stage: ProvisionStage,
    pub error: TrackingError,
}

impl std::fmt::Display for ProvisionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for ProvisionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Names derived from the project name
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionPlan {
    pub project: String,
    pub service_name: String,
    pub folder_name: String,
    pub dashboard_title: String,
}

impl ProvisionPlan {
    pub fn new(project: &str) -> Self {
        let project = project.trim().to_string();
        Self {
            service_name: format!("{}_Tracking_Table_Service", project),
            folder_name: format!("{}_Tracking", project),
            dashboard_title: format!("{}_Tracking_EB", project),
            project,
        }
    }

    /// Message shown when a stage fails
    pub fn failure_message(&self, stage: ProvisionStage) -> String {
        match stage {
            ProvisionStage::CreateService => "Failed to create the hosted table service. \
                 Check the portal credentials and make sure the portal does not already contain the service."
                .to_string(),
            ProvisionStage::CreateFolder => format!(
                "Error creating folder {} on the portal. Ensure this folder does not already exist.",
                self.folder_name
            ),
            ProvisionStage::CloneTemplate => {
                "Error cloning the dashboard template to the new project.".to_string()
            }
            ProvisionStage::RenameDashboard => "Error renaming the dashboard.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub service: ServiceHandle,
    pub folder_id: String,
    pub dashboard_id: Option<String>,
}

/// First team value in the checkout layer, trimmed
pub fn project_name_from(source: &dyn RowSource) -> TrackingResult<String> {
    source
        .scan(&[TEAM])?
        .iter()
        .find_map(|row| row.get(0).as_key())
        .map(|team| team.trim().to_string())
        .filter(|team| !team.is_empty())
        .ok_or_else(|| {
            TrackingError::Config(format!(
                "{} has no {} values; set PROJECT_NAME",
                source.describe(),
                TEAM
            ))
        })
}

/// Point a template's service references at the new service
pub fn rewrite_template(data: &str, template_service_id: &str, service_id: &str) -> String {
    data.replace(template_service_id, service_id)
}

fn fail(stage: ProvisionStage) -> impl FnOnce(TrackingError) -> ProvisionFailure {
    move |error| ProvisionFailure { stage, error }
}

/// Create the service and its tables, file it in a folder, clone the dashboard
pub async fn provision<A>(
    admin: &A,
    plan: &ProvisionPlan,
    template: Option<&TemplateConfig>,
) -> Result<ProvisionOutcome, ProvisionFailure>
where
    A: PortalAdmin + ?Sized,
{
    let params = serde_json::to_value(ServiceParams::new(plan.service_name.clone()))
        .map_err(|e| fail(ProvisionStage::CreateService)(e.into()))?;

    let service = admin
        .create_service(&plan.service_name, &params)
        .await
        .map_err(fail(ProvisionStage::CreateService))?;
    admin
        .add_to_definition(&service, &service_definition(&plan.project))
        .await
        .map_err(fail(ProvisionStage::CreateService))?;
    log::info!("✅ {} created with 4 tables", plan.service_name);

    let folder_id = admin
        .create_folder(&plan.folder_name)
        .await
        .map_err(fail(ProvisionStage::CreateFolder))?;
    admin
        .move_item(&service.item_id, &folder_id)
        .await
        .map_err(fail(ProvisionStage::CreateFolder))?;
    log::info!("📁 {}", plan.folder_name);

    let dashboard_id = match template {
        None => {
            log::info!("No dashboard template configured, skipping clone");
            None
        }
        Some(template) => {
            let mut item = admin
                .fetch_template(&template.portal_url, &template.item_id)
                .await
                .map_err(fail(ProvisionStage::CloneTemplate))?;
            item.data = rewrite_template(&item.data, &template.service_id, &service.item_id);

            let id = admin
                .add_item(&folder_id, &item)
                .await
                .map_err(fail(ProvisionStage::CloneTemplate))?;
            admin
                .update_title(&id, &plan.dashboard_title)
                .await
                .map_err(fail(ProvisionStage::RenameDashboard))?;

            log::info!("📊 Dashboard {} ({})", plan.dashboard_title, id);
            Some(id)
        }
    };

    Ok(ProvisionOutcome {
        service,
        folder_id,
        dashboard_id,
    })
}
