//! Setup - provisions the hosted tracking service for a new project

pub mod provision;
pub mod schema;

pub use provision::{
    project_name_from, provision, rewrite_template, ProvisionFailure, ProvisionOutcome, ProvisionPlan,
    ProvisionStage,
};
pub use schema::{service_definition, ServiceParams, TableSchema};
