use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use dyntable_core::{Actor, RentalPeriod, TableType, required_columns};
use dyntable_store::{ColumnUpdate, NewColumn, SchemaService};

use crate::errors::{PlanError, Result};
use crate::model::{ApplyFailure, ApplyOutcome, ColumnMapping, RenamedColumn};

/// Positions for applier-created columns step by ten to leave room for
/// manual reordering before the next recount.
const POSITION_STEP: i32 = 10;

/// Executes an operator-approved type-change plan.
///
/// Column operations are individually resilient: a failing rename or create
/// is logged and collected while the rest of the migration proceeds. Only
/// the final table-type switch failing is escalated, distinctly, because at
/// that point columns have already changed.
pub struct TypeChangeApplier {
    service: Arc<SchemaService>,
}

impl TypeChangeApplier {
    pub fn new(service: Arc<SchemaService>) -> Self {
        Self { service }
    }

    pub async fn apply_type_change(
        &self,
        actor: &Actor,
        table_id: Uuid,
        target_type: TableType,
        mappings: &[ColumnMapping],
        rental_period: Option<RentalPeriod>,
    ) -> Result<ApplyOutcome> {
        // Authorization and mapping completeness are settled before any
        // mutation starts.
        let table = self.service.get_owned_table(actor, table_id).await?;
        let templates = required_columns(target_type);
        let missing: Vec<String> = templates
            .iter()
            .filter(|template| {
                !mappings
                    .iter()
                    .any(|mapping| mapping.required_column.eq_ignore_ascii_case(template.name))
            })
            .map(|template| template.name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PlanError::MissingRequiredMappings { missing });
        }

        let existing = self.service.list_columns(actor, table_id).await?;
        let mut next_position = existing
            .iter()
            .map(|column| column.position)
            .max()
            .map_or(0, |max| max + POSITION_STEP);

        let mut outcome = ApplyOutcome::default();
        for mapping in mappings {
            let Some(template) = templates
                .iter()
                .find(|template| template.name.eq_ignore_ascii_case(&mapping.required_column))
            else {
                warn!(
                    table_id = %table_id,
                    column = %mapping.required_column,
                    "mapping does not correspond to a required column"
                );
                outcome.failures.push(ApplyFailure {
                    required_column: mapping.required_column.clone(),
                    error: "not a required column for the target type".to_string(),
                });
                continue;
            };

            match mapping.existing_column_id {
                Some(column_id) => {
                    let Some(column) = existing.iter().find(|column| column.id == column_id)
                    else {
                        outcome.failures.push(ApplyFailure {
                            required_column: template.name.to_string(),
                            error: format!("column not found: {column_id}"),
                        });
                        continue;
                    };

                    let update = ColumnUpdate {
                        name: (column.name != template.name)
                            .then(|| template.name.to_string()),
                        column_type: None,
                        is_required: Some(template.is_required),
                        allow_duplicates: Some(template.allow_duplicates),
                        // Backfill only when the column never had a default.
                        default_value: column
                            .default_value
                            .is_none()
                            .then(|| template.default_value.clone()),
                    };
                    let old_name = column.name.clone();
                    match self
                        .service
                        .update_column(actor, table_id, column_id, update)
                        .await
                    {
                        Ok(result) if result.renamed => {
                            outcome.renamed.push(RenamedColumn {
                                column_id,
                                from: old_name,
                                to: template.name.to_string(),
                            });
                        }
                        Ok(_) => outcome.updated.push(template.name.to_string()),
                        Err(err) => {
                            warn!(
                                table_id = %table_id,
                                column = %template.name,
                                error = %err,
                                "column update failed during type change"
                            );
                            outcome.failures.push(ApplyFailure {
                                required_column: template.name.to_string(),
                                error: err.to_string(),
                            });
                        }
                    }
                }
                None => {
                    let input = NewColumn {
                        name: template.name.to_string(),
                        column_type: template.column_type.to_string(),
                        is_required: template.is_required,
                        allow_duplicates: template.allow_duplicates,
                        default_value: Some(template.default_value.clone()),
                        position: Some(next_position),
                    };
                    match self.service.add_column(actor, table_id, input).await {
                        Ok(column) => {
                            next_position += POSITION_STEP;
                            outcome.created.push(column.name);
                        }
                        Err(err) => {
                            warn!(
                                table_id = %table_id,
                                column = %template.name,
                                error = %err,
                                "column create failed during type change"
                            );
                            outcome.failures.push(ApplyFailure {
                                required_column: template.name.to_string(),
                                error: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        match self
            .service
            .set_table_type(actor, table_id, target_type, rental_period)
            .await
        {
            Ok(_) => {
                outcome.table_type_changed = true;
                info!(
                    table_id = %table_id,
                    from = %table.table_type,
                    to = %target_type,
                    created = outcome.created.len(),
                    renamed = outcome.renamed.len(),
                    updated = outcome.updated.len(),
                    failures = outcome.failures.len(),
                    "table type change applied"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    table_id = %table_id,
                    target = %target_type,
                    error = %err,
                    "columns changed but type switch failed"
                );
                Err(PlanError::TypeSwitchFailed {
                    reason: err.to_string(),
                    outcome,
                })
            }
        }
    }
}
