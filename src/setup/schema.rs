//! Hosted table definitions
//!
//! JSON shapes accepted by `createService` and `addToDefinition`. Column lists
//! come from [`TableKind::header`] so the hosted tables always match the CSVs.

use crate::tracking_core::report::ColumnType;
use crate::tracking_core::TableKind;
use serde::Serialize;

pub const CAPABILITIES: &str = "Create,Delete,Query,Update,Editing";
pub const MAX_RECORD_COUNT: u32 = 500;
pub const KEY_LENGTH: u32 = 255;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub alias: String,
    #[serde(rename = "sqlType")]
    pub sql_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub nullable: bool,
    pub editable: bool,
    pub domain: Option<serde_json::Value>,
    #[serde(rename = "defaultValue")]
    pub default_value: Option<serde_json::Value>,
}

impl FieldDef {
    fn new(name: &str, field_type: &'static str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            alias: name.to_string(),
            sql_type: "sqlTypeOther",
            length: None,
            nullable: false,
            editable: true,
            domain: None,
            default_value: None,
        }
    }

    fn object_id() -> Self {
        Self {
            editable: false,
            ..Self::new("OBJECTID", "esriFieldTypeOID")
        }
    }

    fn for_column(kind: TableKind, column: &str) -> Self {
        match kind.column_type(column) {
            ColumnType::Key => Self {
                length: Some(KEY_LENGTH),
                ..Self::new(column, "esriFieldTypeString")
            },
            ColumnType::Integer => Self::new(column, "esriFieldTypeInteger"),
            ColumnType::Double => Self::new(column, "esriFieldTypeDouble"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub fields: String,
    #[serde(rename = "isUnique")]
    pub is_unique: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: &'static str,
    #[serde(rename = "displayField")]
    pub display_field: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldDef>,
    pub capabilities: &'static str,
    #[serde(rename = "spatialReference")]
    pub spatial_reference: Option<serde_json::Value>,
    pub indexes: Vec<IndexDef>,
}

fn table_description(kind: TableKind) -> &'static str {
    match kind {
        TableKind::EditorTracking => "Editor Tracking Table used to track editor creation speeds",
        TableKind::TeamEditTracking => "Team Edit Tracking Table used to track team creation speeds",
        TableKind::TeamTracking => {
            "Team Tracking Table used to track team time spent on select project processes"
        }
        TableKind::ProjectTracking => {
            "Project Tracking Table used to track project progress and mean speeds"
        }
    }
}

impl TableSchema {
    pub fn for_kind(kind: TableKind, project: &str) -> Self {
        let key = kind.key_column();
        let fields = std::iter::once(FieldDef::object_id())
            .chain(kind.header().iter().map(|c| FieldDef::for_column(kind, c)))
            .collect();

        Self {
            name: kind.hosted_table_name(project),
            table_type: "Table",
            display_field: key,
            description: table_description(kind),
            fields,
            capabilities: CAPABILITIES,
            spatial_reference: None,
            indexes: vec![IndexDef {
                name: format!("{}_unique_index", key),
                fields: key.to_string(),
                is_unique: true,
                description: format!("Unique index on {} field to support append", key),
            }],
        }
    }
}

/// `createService` parameters for the empty hosted service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceParams {
    pub name: String,
    pub service_description: &'static str,
    pub has_static_data: bool,
    pub max_record_count: u32,
    pub supported_query_formats: &'static str,
    pub capabilities: &'static str,
    pub spatial_reference: Option<serde_json::Value>,
}

impl ServiceParams {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            name: service_name.into(),
            service_description: "Feature service with multiple tables to track project progress",
            has_static_data: false,
            max_record_count: MAX_RECORD_COUNT,
            supported_query_formats: "JSON, CSV",
            capabilities: CAPABILITIES,
            spatial_reference: None,
        }
    }
}

/// `addToDefinition` payload with the four tables in hosted order
pub fn service_definition(project: &str) -> serde_json::Value {
    let tables: Vec<TableSchema> = TableKind::all()
        .iter()
        .map(|k| TableSchema::for_kind(*k, project))
        .collect();
    serde_json::json!({ "tables": tables })
}
