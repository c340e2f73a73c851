use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dyntable_core::{CellValue, Column, ColumnTemplate, TableType};
use dyntable_registry::TypeChangePreview;

/// A column the target type requires, as surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiredColumn {
    pub name: String,
    pub column_type: String,
    pub is_required: bool,
    pub allow_duplicates: bool,
    pub default_value: CellValue,
}

impl From<&ColumnTemplate> for RequiredColumn {
    fn from(template: &ColumnTemplate) -> Self {
        Self {
            name: template.name.to_string(),
            column_type: template.column_type.to_string(),
            is_required: template.is_required,
            allow_duplicates: template.allow_duplicates,
            default_value: template.default_value.clone(),
        }
    }
}

/// One suggested required→existing assignment from the matcher.
///
/// `existing_column_id: None` means no existing column scored for this slot
/// and the applier will have to create it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedMapping {
    pub required_column: String,
    pub existing_column_id: Option<Uuid>,
    pub existing_column_name: Option<String>,
    pub score: u32,
    /// True when applying this mapping renames the existing column.
    pub rename_needed: bool,
    /// Row-level impact of the column's type moving to the template type,
    /// present only when the types differ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_impact: Option<TypeChangePreview>,
}

/// Advisory migration plan from the current table type to a target type.
/// Producing it never mutates anything.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypeChangePlan {
    pub current_type: TableType,
    pub target_type: TableType,
    pub required_columns: Vec<RequiredColumn>,
    pub existing_columns: Vec<Column>,
    pub suggested_mappings: Vec<SuggestedMapping>,
    /// True iff every required column received a non-null mapping.
    pub all_mapped: bool,
}

impl TypeChangePlan {
    /// Turn the suggestions into applier input unchanged, the common path
    /// when the operator approves the plan as proposed.
    pub fn approved_mappings(&self) -> Vec<ColumnMapping> {
        self.suggested_mappings
            .iter()
            .map(|mapping| ColumnMapping {
                required_column: mapping.required_column.clone(),
                existing_column_id: mapping.existing_column_id,
            })
            .collect()
    }
}

/// Operator-approved mapping handed to the applier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub required_column: String,
    #[serde(default)]
    pub existing_column_id: Option<Uuid>,
}

/// A rename performed by the applier, tracked separately from pure settings
/// updates for the response summary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenamedColumn {
    pub column_id: Uuid,
    pub from: String,
    pub to: String,
}

/// A column operation the applier logged and skipped past.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFailure {
    pub required_column: String,
    pub error: String,
}

/// Summary of an applied type change. Individual column failures do not
/// abort the migration; they are collected here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub table_type_changed: bool,
    pub created: Vec<String>,
    pub renamed: Vec<RenamedColumn>,
    pub updated: Vec<String>,
    pub failures: Vec<ApplyFailure>,
}
