use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use dyntable_core::{
    Actor, CellValue, Column, Error, InventoryAction, InventoryTransaction, RentalPeriod, Result,
    RowData, Table, TableRow, TableType, Visibility, is_protected_column, number_field,
    required_columns,
};
use dyntable_registry::{
    DatasetReport, TypeChangePreview, TypeRegistry, ValidationOutcome, preview_value_type_change,
    validate_dataset, validate_row,
};

use crate::repo::{Store, TableScope};

/// Input for creating a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
    pub table_type: TableType,
    #[serde(default)]
    pub rental_period: Option<RentalPeriod>,
}

/// Partial update of a table's own settings. The table type is deliberately
/// absent: type changes go through the migration planner/applier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub rental_period: Option<RentalPeriod>,
}

/// Input for adding a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub name: String,
    pub column_type: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_true")]
    pub allow_duplicates: bool,
    #[serde(default)]
    pub default_value: Option<CellValue>,
    /// Explicit position; appended after the current maximum when absent.
    #[serde(default)]
    pub position: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Partial update of a column definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub column_type: Option<String>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub allow_duplicates: Option<bool>,
    #[serde(default)]
    pub default_value: Option<CellValue>,
}

/// Result of a column update, reporting whether a rename cascaded into row
/// data and how many rows it touched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnUpdateOutcome {
    pub column: Column,
    pub renamed: bool,
    pub rows_updated: usize,
}

/// A stored row together with its validation warnings. Warnings never block
/// the write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWriteOutcome {
    pub row: TableRow,
    pub warnings: BTreeMap<String, ValidationOutcome>,
}

/// Per-unit breakdown of a bulk row deletion. Units are independent: some
/// may fail while the rest succeed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteOutcome {
    pub requested: usize,
    pub deleted: usize,
    pub failures: Vec<RowFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_id: Uuid,
    pub error: String,
}

/// Result of the invalid-row cleanup. `found_invalid` and `removed` should
/// match; the split shape exists to surface any divergence between the check
/// and the delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRowCleanup {
    pub found_invalid: usize,
    pub removed: usize,
    pub row_ids: Vec<Uuid>,
}

/// Owns table, column, and row mutations: ownership checks, column
/// protection, dense position management, the rename cascade into row data,
/// and warn-don't-block row validation.
pub struct SchemaService {
    store: Arc<dyn Store>,
    registry: Arc<TypeRegistry>,
}

impl SchemaService {
    pub fn new(store: Arc<dyn Store>, registry: Arc<TypeRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn registry(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    // ------------------------------------------------------------------
    // Access checks
    // ------------------------------------------------------------------

    /// Resolve a table the actor may read. A table the actor cannot see is
    /// reported as not found, not as denied.
    async fn require_table_read(&self, actor: &Actor, table_id: Uuid) -> Result<Table> {
        let table = self
            .store
            .get_table(table_id)
            .await?
            .ok_or_else(|| Error::not_found("table", table_id))?;
        if !actor.can_read(&table) {
            return Err(Error::not_found("table", table_id));
        }
        Ok(table)
    }

    /// Resolve a table for a row-level write: owner, admin, or a scoped
    /// token covering the table.
    async fn require_table_write(&self, actor: &Actor, table_id: Uuid) -> Result<Table> {
        let table = self.require_table_read(actor, table_id).await?;
        if !actor.can_write(&table) {
            return Err(Error::AccessDenied(format!(
                "user {} cannot modify table '{}'",
                actor.user_id, table.name
            )));
        }
        Ok(table)
    }

    /// Resolve a table for a schema mutation: owner or admin only, never a
    /// scoped token.
    async fn require_table_owner(&self, actor: &Actor, table_id: Uuid) -> Result<Table> {
        let table = self.require_table_read(actor, table_id).await?;
        if !(actor.is_admin || table.owner_id == actor.user_id) {
            return Err(Error::AccessDenied(format!(
                "user {} does not own table '{}'",
                actor.user_id, table.name
            )));
        }
        Ok(table)
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    pub async fn create_table(&self, actor: &Actor, input: NewTable) -> Result<Table> {
        if input.name.trim().is_empty() {
            return Err(Error::Validation("table name must not be empty".to_string()));
        }

        let mut table = Table::new(actor.user_id, input.name.trim());
        table.description = input.description;
        table.visibility = input.visibility;
        table.table_type = input.table_type;
        if input.table_type == TableType::Rent {
            table.rental_period = input.rental_period.or(Some(RentalPeriod::Monthly));
        }
        self.store.insert_table(&table).await?;

        // Commerce tables are born with their required columns in place.
        for (index, template) in required_columns(input.table_type).iter().enumerate() {
            let mut column = Column::new(
                table.id,
                template.name,
                template.column_type,
                index as i32,
            );
            column.is_required = template.is_required;
            column.allow_duplicates = template.allow_duplicates;
            column.default_value = Some(template.default_value.clone());
            self.store.insert_column(&column).await?;
        }

        info!(table_id = %table.id, table_type = %table.table_type, "table created");
        Ok(table)
    }

    pub async fn get_table(&self, actor: &Actor, table_id: Uuid) -> Result<Table> {
        self.require_table_read(actor, table_id).await
    }

    /// Resolve a table the actor owns (or administers). Callers staging
    /// multi-step schema work use this to fail authorization up front,
    /// before any mutation.
    pub async fn get_owned_table(&self, actor: &Actor, table_id: Uuid) -> Result<Table> {
        self.require_table_owner(actor, table_id).await
    }

    pub async fn list_tables(&self, actor: &Actor) -> Result<Vec<Table>> {
        let scope = if actor.is_admin {
            TableScope::All
        } else if let Some(ids) = &actor.table_access {
            TableScope::TokenScoped(ids.clone())
        } else {
            TableScope::UserVisible(actor.user_id)
        };
        self.store.list_tables(&scope).await
    }

    pub async fn update_table(
        &self,
        actor: &Actor,
        table_id: Uuid,
        update: TableUpdate,
    ) -> Result<Table> {
        let mut table = self.require_table_owner(actor, table_id).await?;
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(Error::Validation("table name must not be empty".to_string()));
            }
            table.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            table.description = Some(description);
        }
        if let Some(visibility) = update.visibility {
            table.visibility = visibility;
        }
        if let Some(period) = update.rental_period {
            table.rental_period = Some(period);
        }
        table.updated_at = Utc::now();
        self.store.update_table(&table).await?;
        Ok(table)
    }

    /// Switch the table's commerce type. Exposed for the type-change applier,
    /// which validates column mappings before calling this as its final step.
    pub async fn set_table_type(
        &self,
        actor: &Actor,
        table_id: Uuid,
        table_type: TableType,
        rental_period: Option<RentalPeriod>,
    ) -> Result<Table> {
        let mut table = self.require_table_owner(actor, table_id).await?;
        table.table_type = table_type;
        table.rental_period = match table_type {
            TableType::Rent => rental_period
                .or(table.rental_period)
                .or(Some(RentalPeriod::Monthly)),
            _ => None,
        };
        table.updated_at = Utc::now();
        self.store.update_table(&table).await?;
        info!(table_id = %table.id, table_type = %table.table_type, "table type switched");
        Ok(table)
    }

    pub async fn delete_table(&self, actor: &Actor, table_id: Uuid) -> Result<()> {
        let table = self.require_table_owner(actor, table_id).await?;
        self.store.delete_table(table.id).await?;
        info!(table_id = %table.id, "table deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    pub async fn list_columns(&self, actor: &Actor, table_id: Uuid) -> Result<Vec<Column>> {
        self.require_table_read(actor, table_id).await?;
        self.store.list_columns(table_id).await
    }

    pub async fn add_column(
        &self,
        actor: &Actor,
        table_id: Uuid,
        input: NewColumn,
    ) -> Result<Column> {
        let table = self.require_table_owner(actor, table_id).await?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("column name must not be empty".to_string()));
        }

        let existing = self.store.list_columns(table.id).await?;
        if existing
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::DuplicateColumnName {
                name: name.to_string(),
            });
        }

        let position = input.position.unwrap_or_else(|| {
            existing
                .iter()
                .map(|column| column.position)
                .max()
                .map_or(0, |max| max + 1)
        });
        let mut column = Column::new(table.id, name, input.column_type, position);
        column.is_required = input.is_required;
        column.allow_duplicates = input.allow_duplicates;
        column.default_value = input.default_value;
        self.store.insert_column(&column).await?;
        Ok(column)
    }

    pub async fn get_column(
        &self,
        actor: &Actor,
        table_id: Uuid,
        column_id: Uuid,
    ) -> Result<Column> {
        self.require_table_read(actor, table_id).await?;
        self.require_column(table_id, column_id).await
    }

    async fn require_column(&self, table_id: Uuid, column_id: Uuid) -> Result<Column> {
        let column = self
            .store
            .get_column(column_id)
            .await?
            .ok_or_else(|| Error::not_found("column", column_id))?;
        if column.table_id != table_id {
            return Err(Error::not_found("column", column_id));
        }
        Ok(column)
    }

    /// True when the named column is frozen by the table's current type.
    pub async fn is_column_protected_by_type(
        &self,
        actor: &Actor,
        table_id: Uuid,
        column_name: &str,
    ) -> Result<bool> {
        let table = self.require_table_read(actor, table_id).await?;
        Ok(is_protected_column(table.table_type, column_name))
    }

    pub async fn update_column(
        &self,
        actor: &Actor,
        table_id: Uuid,
        column_id: Uuid,
        update: ColumnUpdate,
    ) -> Result<ColumnUpdateOutcome> {
        let table = self.require_table_owner(actor, table_id).await?;
        let mut column = self.require_column(table_id, column_id).await?;

        let new_name = update
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let renaming = new_name.is_some_and(|name| name != column.name);
        let required_changing = update
            .is_required
            .is_some_and(|flag| flag != column.is_required);
        let duplicates_changing = update
            .allow_duplicates
            .is_some_and(|flag| flag != column.allow_duplicates);

        if (renaming || required_changing || duplicates_changing)
            && is_protected_column(table.table_type, &column.name)
        {
            return Err(Error::ColumnProtected {
                column: column.name.clone(),
                table_type: table.table_type,
            });
        }

        if renaming {
            let name = new_name.unwrap_or_default();
            let existing = self.store.list_columns(table.id).await?;
            if existing
                .iter()
                .any(|other| other.id != column.id && other.name.eq_ignore_ascii_case(name))
            {
                return Err(Error::DuplicateColumnName {
                    name: name.to_string(),
                });
            }
        }

        let old_name = column.name.clone();
        if let Some(name) = new_name {
            column.name = name.to_string();
        }
        if let Some(column_type) = update.column_type {
            column.column_type = column_type;
        }
        if let Some(flag) = update.is_required {
            column.is_required = flag;
        }
        if let Some(flag) = update.allow_duplicates {
            column.allow_duplicates = flag;
        }
        if let Some(default_value) = update.default_value {
            column.default_value = Some(default_value);
        }
        column.updated_at = Utc::now();

        if renaming {
            // Row data is keyed by column name: the rename and the data-key
            // rewrite must land together.
            let mut tx = self.store.begin().await?;
            tx.update_column(&column).await?;
            let rows_updated = tx
                .rename_row_data_key(table.id, &old_name, &column.name)
                .await?;
            tx.commit().await?;
            info!(
                table_id = %table.id,
                old = %old_name,
                new = %column.name,
                rows_updated,
                "column renamed"
            );
            Ok(ColumnUpdateOutcome {
                column,
                renamed: true,
                rows_updated,
            })
        } else {
            self.store.update_column(&column).await?;
            Ok(ColumnUpdateOutcome {
                column,
                renamed: false,
                rows_updated: 0,
            })
        }
    }

    pub async fn delete_column(
        &self,
        actor: &Actor,
        table_id: Uuid,
        column_id: Uuid,
    ) -> Result<()> {
        let table = self.require_table_owner(actor, table_id).await?;
        let column = self.require_column(table_id, column_id).await?;
        if is_protected_column(table.table_type, &column.name) {
            return Err(Error::ColumnProtected {
                column: column.name,
                table_type: table.table_type,
            });
        }
        // Row data keeps the orphaned key; data is never destroyed here.
        self.store.delete_column(column_id).await
    }

    /// Rewrite a column-name key in every row of the table. Returns how many
    /// rows carried the key.
    pub async fn rename_column_in_data(
        &self,
        actor: &Actor,
        table_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<usize> {
        let table = self.require_table_owner(actor, table_id).await?;
        let mut tx = self.store.begin().await?;
        let rows_updated = tx.rename_row_data_key(table.id, old, new).await?;
        tx.commit().await?;
        info!(table_id = %table.id, old, new, rows_updated, "row data keys renamed");
        Ok(rows_updated)
    }

    /// Renormalize positions to the dense sequence `0..n-1`, preserving the
    /// current relative order. Returns the number of columns.
    pub async fn recount_column_positions(&self, actor: &Actor, table_id: Uuid) -> Result<usize> {
        let table = self.require_table_owner(actor, table_id).await?;
        let mut tx = self.store.begin().await?;
        let columns = tx.list_columns(table.id).await?;
        for (index, column) in columns.iter().enumerate() {
            let position = index as i32;
            if column.position != position {
                tx.update_column_position(column.id, position).await?;
            }
        }
        tx.commit().await?;
        Ok(columns.len())
    }

    /// Exchange the positions of two columns atomically.
    pub async fn swap_column_positions(
        &self,
        actor: &Actor,
        table_id: Uuid,
        first_id: Uuid,
        second_id: Uuid,
    ) -> Result<()> {
        let table = self.require_table_owner(actor, table_id).await?;
        let mut tx = self.store.begin().await?;
        let columns = tx.list_columns(table.id).await?;
        let first = columns
            .iter()
            .find(|column| column.id == first_id)
            .ok_or_else(|| Error::not_found("column", first_id))?;
        let second = columns
            .iter()
            .find(|column| column.id == second_id)
            .ok_or_else(|| Error::not_found("column", second_id))?;
        tx.update_column_position(first.id, second.position).await?;
        tx.update_column_position(second.id, first.position).await?;
        tx.commit().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub async fn get_row(&self, actor: &Actor, table_id: Uuid, row_id: Uuid) -> Result<TableRow> {
        self.require_table_read(actor, table_id).await?;
        let row = self
            .store
            .get_row(row_id)
            .await?
            .filter(|row| row.table_id == table_id)
            .ok_or_else(|| Error::not_found("row", row_id))?;
        Ok(row)
    }

    pub async fn list_rows(&self, actor: &Actor, table_id: Uuid) -> Result<Vec<TableRow>> {
        self.require_table_read(actor, table_id).await?;
        self.store.list_rows(table_id).await
    }

    pub async fn create_row(
        &self,
        actor: &Actor,
        table_id: Uuid,
        mut data: RowData,
    ) -> Result<RowWriteOutcome> {
        let table = self.require_table_write(actor, table_id).await?;
        let columns = self.store.list_columns(table.id).await?;

        // Backfill column defaults for keys the caller did not send.
        for column in &columns {
            if let Some(default_value) = &column.default_value
                && !data.contains_key(&column.name)
            {
                data.insert(column.name.clone(), default_value.clone());
            }
        }

        let warnings = collect_warnings(validate_row(&self.registry, &data, &columns));
        let row = TableRow::new(table.id, data);
        self.store.insert_row(&row).await?;

        if table.is_commerce() {
            let mut record =
                InventoryTransaction::new(table.id, row.id, InventoryAction::Add, actor.user_id);
            record.after = Some(row.data.clone());
            record.quantity_delta = commerce_quantity(table.table_type, &row.data);
            self.store.insert_inventory_transaction(&record).await?;
        }

        Ok(RowWriteOutcome { row, warnings })
    }

    pub async fn update_row(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_id: Uuid,
        data: RowData,
    ) -> Result<RowWriteOutcome> {
        let table = self.require_table_write(actor, table_id).await?;
        let mut row = self.get_row(actor, table_id, row_id).await?;
        let columns = self.store.list_columns(table.id).await?;

        let before = row.data.clone();
        let warnings = collect_warnings(validate_row(&self.registry, &data, &columns));
        row.data = data;
        row.updated_at = Utc::now();
        self.store.update_row(&row).await?;

        if table.is_commerce() {
            let mut record =
                InventoryTransaction::new(table.id, row.id, InventoryAction::Update, actor.user_id);
            record.quantity_delta = commerce_quantity(table.table_type, &row.data)
                - commerce_quantity(table.table_type, &before);
            record.before = Some(before);
            record.after = Some(row.data.clone());
            self.store.insert_inventory_transaction(&record).await?;
        }

        Ok(RowWriteOutcome { row, warnings })
    }

    pub async fn delete_row(&self, actor: &Actor, table_id: Uuid, row_id: Uuid) -> Result<()> {
        let table = self.require_table_write(actor, table_id).await?;
        let row = self.get_row(actor, table_id, row_id).await?;
        self.store.delete_row(row.id).await?;

        if table.is_commerce() {
            let mut record =
                InventoryTransaction::new(table.id, row.id, InventoryAction::Remove, actor.user_id);
            record.quantity_delta = -commerce_quantity(table.table_type, &row.data);
            record.before = Some(row.data);
            self.store.insert_inventory_transaction(&record).await?;
        }
        Ok(())
    }

    /// Mass delete. Units are independent; failures are collected per row
    /// and never roll back the rows that did delete.
    pub async fn delete_rows(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_ids: &[Uuid],
    ) -> Result<BulkDeleteOutcome> {
        self.require_table_write(actor, table_id).await?;
        let mut deleted = 0;
        let mut failures = Vec::new();
        for &row_id in row_ids {
            match self.delete_row(actor, table_id, row_id).await {
                Ok(()) => deleted += 1,
                Err(err) => {
                    warn!(table_id = %table_id, row_id = %row_id, error = %err, "row delete failed");
                    failures.push(RowFailure {
                        row_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(BulkDeleteOutcome {
            requested: row_ids.len(),
            deleted,
            failures,
        })
    }

    // ------------------------------------------------------------------
    // Validation endpoints (warn, don't block)
    // ------------------------------------------------------------------

    pub async fn validate_table(&self, actor: &Actor, table_id: Uuid) -> Result<DatasetReport> {
        self.require_table_read(actor, table_id).await?;
        let columns = self.store.list_columns(table_id).await?;
        let rows = self.store.list_rows(table_id).await?;
        Ok(validate_dataset(&self.registry, &rows, &columns))
    }

    /// Delete exactly the rows that currently fail validation. The response
    /// distinguishes how many were found from how many were removed so a row
    /// turning valid between check and delete is visible to the caller.
    pub async fn delete_invalid_rows(
        &self,
        actor: &Actor,
        table_id: Uuid,
    ) -> Result<InvalidRowCleanup> {
        self.require_table_write(actor, table_id).await?;
        let report = self.validate_table(actor, table_id).await?;
        let invalid_ids = report.invalid_row_ids();
        let outcome = self.delete_rows(actor, table_id, &invalid_ids).await?;
        Ok(InvalidRowCleanup {
            found_invalid: invalid_ids.len(),
            removed: outcome.deleted,
            row_ids: invalid_ids,
        })
    }

    /// Re-validate a column's stored values against a hypothetical new type.
    pub async fn preview_column_type_change(
        &self,
        actor: &Actor,
        table_id: Uuid,
        column_name: &str,
        new_type: &str,
    ) -> Result<TypeChangePreview> {
        self.require_table_read(actor, table_id).await?;
        let columns = self.store.list_columns(table_id).await?;
        if !columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(column_name))
        {
            return Err(Error::not_found("column", column_name.to_string()));
        }
        let rows = self.store.list_rows(table_id).await?;
        Ok(preview_value_type_change(
            &self.registry,
            &rows,
            column_name,
            new_type,
        ))
    }
}

/// Quantity represented by one row of a commerce table: the `qty` counter
/// for sale tables, a single unit for rent tables.
fn commerce_quantity(table_type: TableType, data: &RowData) -> f64 {
    match table_type {
        TableType::Sale => number_field(data, "qty"),
        TableType::Rent => 1.0,
        TableType::Default => 0.0,
    }
}

fn collect_warnings(
    fields: BTreeMap<String, ValidationOutcome>,
) -> BTreeMap<String, ValidationOutcome> {
    fields
        .into_iter()
        .filter(|(_, outcome)| !outcome.valid)
        .collect()
}
