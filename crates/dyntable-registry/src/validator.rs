use std::collections::BTreeMap;

use dyntable_core::{CellValue, Column, RowData, TableRow};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outcome::ValidationOutcome;
use crate::registry::TypeRegistry;

const PREVIEW_SAMPLE_LIMIT: usize = 5;

/// Validation verdicts for one row, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowReport {
    pub row_id: Uuid,
    pub is_valid: bool,
    pub fields: BTreeMap<String, ValidationOutcome>,
}

/// Aggregated validation over a whole table.
///
/// This is the warn-don't-block contract: every row appears in `rows`
/// regardless of validity; nothing is dropped or rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReport {
    pub total_rows: usize,
    pub invalid_rows: usize,
    pub total_warnings: usize,
    pub rows: Vec<RowReport>,
}

impl DatasetReport {
    /// Ids of the rows that currently fail validation, in listing order.
    pub fn invalid_row_ids(&self) -> Vec<Uuid> {
        self.rows
            .iter()
            .filter(|row| !row.is_valid)
            .map(|row| row.row_id)
            .collect()
    }
}

/// One offending value surfaced by a type-change preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncompatibleSample {
    pub row_id: Uuid,
    pub value: CellValue,
    pub error: Option<String>,
}

/// Hypothetical re-validation of a column's existing values against a new
/// type. Never mutates anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypeChangePreview {
    pub total_rows: usize,
    pub incompatible_rows: usize,
    pub samples: Vec<IncompatibleSample>,
}

/// Validate a single value against a column type.
///
/// Empty values are always valid (required-ness is a separate check) and the
/// type id may carry a module namespace prefix, which is stripped by the
/// registry during resolution.
pub fn validate_value(
    registry: &TypeRegistry,
    value: &CellValue,
    column_type: &str,
) -> ValidationOutcome {
    if value.is_empty() {
        return ValidationOutcome::ok();
    }
    registry.resolve(column_type).validate(value, None)
}

/// Validate one row's data against the table's column definitions.
///
/// A required column with no value and no default records a failure; every
/// other column delegates to [`validate_value`].
pub fn validate_row(
    registry: &TypeRegistry,
    data: &RowData,
    columns: &[Column],
) -> BTreeMap<String, ValidationOutcome> {
    let mut fields = BTreeMap::new();
    for column in columns {
        let value = data.get(&column.name);
        let missing = value.is_none_or(CellValue::is_empty);
        let outcome = if missing {
            if column.is_required && column.default_value.is_none() {
                ValidationOutcome::fail("Required field is empty")
            } else {
                ValidationOutcome::ok()
            }
        } else {
            // `missing` rules out None.
            validate_value(registry, value.unwrap_or(&CellValue::Null), &column.column_type)
        };
        fields.insert(column.name.clone(), outcome);
    }
    fields
}

/// Validate every row of a table, aggregating counts for the caller.
pub fn validate_dataset(
    registry: &TypeRegistry,
    rows: &[TableRow],
    columns: &[Column],
) -> DatasetReport {
    let mut reports = Vec::with_capacity(rows.len());
    let mut invalid_rows = 0;
    let mut total_warnings = 0;

    for row in rows {
        let fields = validate_row(registry, &row.data, columns);
        let warnings = fields.values().filter(|outcome| !outcome.valid).count();
        if warnings > 0 {
            invalid_rows += 1;
            total_warnings += warnings;
        }
        reports.push(RowReport {
            row_id: row.id,
            is_valid: warnings == 0,
            fields,
        });
    }

    DatasetReport {
        total_rows: rows.len(),
        invalid_rows,
        total_warnings,
        rows: reports,
    }
}

/// Re-validate a column's existing values against a hypothetical new type,
/// reporting how many rows would become invalid and a handful of samples.
pub fn preview_value_type_change(
    registry: &TypeRegistry,
    rows: &[TableRow],
    column_name: &str,
    new_type: &str,
) -> TypeChangePreview {
    let mut incompatible_rows = 0;
    let mut samples = Vec::new();

    for row in rows {
        let Some(value) = row.data.get(column_name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let outcome = validate_value(registry, value, new_type);
        if !outcome.valid {
            incompatible_rows += 1;
            if samples.len() < PREVIEW_SAMPLE_LIMIT {
                samples.push(IncompatibleSample {
                    row_id: row.id,
                    value: value.clone(),
                    error: outcome.error,
                });
            }
        }
    }

    TypeChangePreview {
        total_rows: rows.len(),
        incompatible_rows,
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn column(name: &str, column_type: &str) -> Column {
        Column::new(Uuid::new_v4(), name, column_type, 0)
    }

    fn row(pairs: &[(&str, CellValue)]) -> TableRow {
        let mut data = RowData::new();
        for (key, value) in pairs {
            data.insert((*key).to_string(), value.clone());
        }
        TableRow::new(Uuid::new_v4(), data)
    }

    #[test]
    fn empty_values_are_always_valid() {
        let registry = TypeRegistry::with_builtins();
        assert!(validate_value(&registry, &CellValue::from(""), "email").valid);
        assert!(validate_value(&registry, &CellValue::Null, "percentage").valid);
    }

    #[test]
    fn required_empty_fields_fail_without_a_default() {
        let registry = TypeRegistry::with_builtins();
        let mut required = column("price", "currency");
        required.is_required = true;
        let mut defaulted = column("qty", "integer");
        defaulted.is_required = true;
        defaulted.default_value = Some(CellValue::Number(0.0));

        let fields = validate_row(&registry, &RowData::new(), &[required, defaulted]);
        assert!(!fields["price"].valid);
        assert_eq!(fields["price"].error.as_deref(), Some("Required field is empty"));
        assert!(fields["qty"].valid);
    }

    #[test]
    fn dataset_report_keeps_invalid_rows_listed() {
        let registry = TypeRegistry::with_builtins();
        let columns = vec![column("price", "number")];
        let mut rows: Vec<TableRow> = (0..7)
            .map(|i| row(&[("price", CellValue::from(i as f64))]))
            .collect();
        for _ in 0..3 {
            rows.push(row(&[("price", CellValue::from("not a price"))]));
        }

        let report = validate_dataset(&registry, &rows, &columns);
        assert_eq!(report.total_rows, 10);
        assert_eq!(report.invalid_rows, 3);
        assert_eq!(report.total_warnings, 3);
        assert_eq!(report.rows.len(), 10);
        assert_eq!(report.invalid_row_ids().len(), 3);
    }

    #[test]
    fn preview_counts_incompatible_values_without_mutating() {
        let registry = TypeRegistry::with_builtins();
        let rows = vec![
            row(&[("score", CellValue::from(42.0))]),
            row(&[("score", CellValue::from(250.0))]),
            row(&[("score", CellValue::from("n/a"))]),
            row(&[("score", CellValue::Null)]),
        ];

        let preview = preview_value_type_change(&registry, &rows, "score", "percentage");
        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.incompatible_rows, 2);
        assert_eq!(preview.samples.len(), 2);
    }

    #[test]
    fn namespaced_types_validate_through_their_base() {
        let registry = TypeRegistry::with_builtins();
        // No module registered: "custom:email" strips to the email built-in.
        let outcome = validate_value(&registry, &CellValue::from("nope"), "custom:email");
        assert!(!outcome.valid);
    }
}
