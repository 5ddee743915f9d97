//! projtrack - project tracking statistics for mapping projects
//!
//! Tabulates a checkout layer into editor, team and project progress tables,
//! writes them as dated CSV artifacts and upserts them into the project's
//! hosted tracking tables.

pub mod config;
pub mod huc_extract;
pub mod pipeline;
pub mod publisher;
pub mod setup;
pub mod tracking_core;
