use std::sync::Arc;

use uuid::Uuid;

use dyntable_core::{Actor, Column, ColumnTemplate, TableType, required_columns};
use dyntable_registry::compatible_types;
use dyntable_store::SchemaService;

use crate::errors::Result;
use crate::model::{RequiredColumn, SuggestedMapping, TypeChangePlan};

const SCORE_EXACT: u32 = 100;
const SCORE_ALNUM: u32 = 90;
const SCORE_SUBSTRING: u32 = 70;
const SCORE_KEYWORD: u32 = 50;
const BONUS_COMPATIBLE_TYPE: u32 = 5;

/// Computes advisory migration plans between table types. Read-only: the
/// applier is the only component that mutates.
pub struct TypeChangePlanner {
    service: Arc<SchemaService>,
}

impl TypeChangePlanner {
    pub fn new(service: Arc<SchemaService>) -> Self {
        Self { service }
    }

    /// Build the plan for moving `table_id` to `target_type`: the required
    /// column templates, the table's existing columns, and a greedy
    /// globally-scored assignment between the two.
    pub async fn preview_type_change(
        &self,
        actor: &Actor,
        table_id: Uuid,
        target_type: TableType,
    ) -> Result<TypeChangePlan> {
        let table = self.service.get_table(actor, table_id).await?;
        let existing = self.service.list_columns(actor, table_id).await?;
        let templates = required_columns(target_type);

        let assignments = assign_columns(templates, &existing);

        let mut suggested_mappings = Vec::with_capacity(templates.len());
        for (template, assignment) in templates.iter().zip(&assignments) {
            let mapping = match assignment {
                Some((index, score)) => {
                    let column = &existing[*index];
                    let rename_needed = column.name != template.name;
                    let row_impact = if compatible_same_type(column, template) {
                        None
                    } else {
                        Some(
                            self.service
                                .preview_column_type_change(
                                    actor,
                                    table_id,
                                    &column.name,
                                    template.column_type,
                                )
                                .await?,
                        )
                    };
                    SuggestedMapping {
                        required_column: template.name.to_string(),
                        existing_column_id: Some(column.id),
                        existing_column_name: Some(column.name.clone()),
                        score: *score,
                        rename_needed,
                        row_impact,
                    }
                }
                None => SuggestedMapping {
                    required_column: template.name.to_string(),
                    existing_column_id: None,
                    existing_column_name: None,
                    score: 0,
                    rename_needed: false,
                    row_impact: None,
                },
            };
            suggested_mappings.push(mapping);
        }

        let all_mapped = suggested_mappings
            .iter()
            .all(|mapping| mapping.existing_column_id.is_some());

        Ok(TypeChangePlan {
            current_type: table.table_type,
            target_type,
            required_columns: templates.iter().map(RequiredColumn::from).collect(),
            existing_columns: existing,
            suggested_mappings,
            all_mapped,
        })
    }
}

fn compatible_same_type(column: &Column, template: &ColumnTemplate) -> bool {
    column
        .column_type
        .eq_ignore_ascii_case(template.column_type)
}

/// Greedy assignment over the globally sorted score matrix: highest score
/// first, each required slot filled once, no existing column consumed twice.
fn assign_columns(
    templates: &[ColumnTemplate],
    existing: &[Column],
) -> Vec<Option<(usize, u32)>> {
    let mut scored: Vec<(usize, usize, u32)> = Vec::new();
    for (required_index, template) in templates.iter().enumerate() {
        for (existing_index, column) in existing.iter().enumerate() {
            let score = score_pair(template, column);
            if score > 0 {
                scored.push((required_index, existing_index, score));
            }
        }
    }

    scored.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

    let mut assigned: Vec<Option<(usize, u32)>> = vec![None; templates.len()];
    let mut consumed = vec![false; existing.len()];
    for (required_index, existing_index, score) in scored {
        if assigned[required_index].is_none() && !consumed[existing_index] {
            assigned[required_index] = Some((existing_index, score));
            consumed[existing_index] = true;
        }
    }
    assigned
}

/// Score one (required, existing) pair. Zero means no plausible match.
fn score_pair(template: &ColumnTemplate, column: &Column) -> u32 {
    let required = template.name.to_lowercase();
    let candidate = column.name.trim().to_lowercase();

    let base = if candidate == required {
        SCORE_EXACT
    } else if !alnum(&candidate).is_empty() && alnum(&candidate) == alnum(&required) {
        SCORE_ALNUM
    } else if candidate.contains(&required) || required.contains(&candidate) {
        SCORE_SUBSTRING
    } else if keyword_hints(template.name)
        .iter()
        .any(|hint| candidate.contains(hint))
    {
        SCORE_KEYWORD
    } else {
        0
    };

    if base == 0 {
        return 0;
    }
    if compatible_types(&column.column_type, template.column_type) {
        base + BONUS_COMPATIBLE_TYPE
    } else {
        base
    }
}

fn alnum(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Same-meaning keywords per required column, used as the weakest signal.
fn keyword_hints(required_name: &str) -> &'static [&'static str] {
    match required_name {
        "price" => &["price", "cost", "amount", "value"],
        "qty" => &["qty", "quantity", "stock", "count"],
        "fee" => &["fee", "charge", "deposit"],
        "used" => &["used", "consumed"],
        "available" => &["available", "avail", "free"],
        _ => &[],
    }
}
