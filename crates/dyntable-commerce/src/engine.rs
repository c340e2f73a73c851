use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use dyntable_core::{
    Actor, CellValue, Error, InventoryAction, InventoryTransaction, Rental, RentalStatus, Sale,
    SaleStatus, SequenceKind, Table, TableRow, TableType, number_field,
};
use dyntable_store::{Store, StoreTx};

use crate::errors::{CommerceError, Result};
use crate::state::{ItemState, TransitionError, release_transition, rent_transition};

/// Input for renting an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for selling units of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub quantity: f64,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Post-creation mutable subset of a sale ledger entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleUpdate {
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Post-creation mutable subset of a rental ledger entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalUpdate {
    #[serde(default)]
    pub status: Option<RentalStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Availability of one item for a requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub available_qty: f64,
    pub requested_qty: f64,
}

/// Drives the rent/sale item lifecycle.
///
/// Every transition runs inside one store transaction: row lock and
/// legality check, sequence allocation and ledger write with a frozen
/// snapshot, row-state update, inventory append. A failure after the ledger
/// write is logged with the item, transition, and step before the
/// transaction rolls back, so the near-inconsistency is always observable.
pub struct CommerceEngine {
    store: Arc<dyn Store>,
}

impl CommerceEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve a commerce table of the expected type that the actor may
    /// transact against.
    async fn require_table(
        &self,
        actor: &Actor,
        table_id: Uuid,
        expected: TableType,
    ) -> Result<Table> {
        let table = self
            .store
            .get_table(table_id)
            .await?
            .ok_or_else(|| Error::not_found("table", table_id))?;
        if !actor.can_read(&table) {
            return Err(Error::not_found("table", table_id).into());
        }
        if !actor.can_write(&table) {
            return Err(Error::AccessDenied(format!(
                "user {} cannot transact on table '{}'",
                actor.user_id, table.name
            ))
            .into());
        }
        if table.table_type != expected {
            return Err(Error::Validation(format!(
                "table '{}' is not a {} table",
                table.name, expected
            ))
            .into());
        }
        Ok(table)
    }

    /// Rent an item: legal only from the rentable state, creates the rental
    /// ledger entry, flips the row to rented, and records the inventory
    /// event — atomically.
    pub async fn rent_item(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_id: Uuid,
        request: RentRequest,
    ) -> Result<Rental> {
        self.require_table(actor, table_id, TableType::Rent).await?;

        let mut tx = self.store.begin().await?;
        let row = fetch_item(&mut *tx, table_id, row_id).await?;
        let state = ItemState::from_row(&row.data);
        rent_transition(state)?;

        let price = number_field(&row.data, "price");
        if price <= 0.0 {
            return Err(TransitionError::NotPriced.into());
        }

        let year = Utc::now().year();
        let value = tx
            .allocate_sequence(SequenceKind::Rental, year)
            .await
            .map_err(|err| step_failed(row_id, "rent", "allocate_sequence", err))?;
        let mut rental = Rental::new(
            SequenceKind::Rental.format_number(year, value),
            table_id,
            row_id,
            row.data.clone(),
            price,
        );
        rental.customer_id = request.customer_id;
        rental.notes = request.notes;
        tx.insert_rental(&rental)
            .await
            .map_err(|err| step_failed(row_id, "rent", "insert_rental", err))?;

        let mut data = row.data.clone();
        let (used, available) = ItemState::Rented.flags();
        data.insert("used".to_string(), CellValue::Bool(used));
        data.insert("available".to_string(), CellValue::Bool(available));
        tx.update_row_data(row_id, &data)
            .await
            .map_err(|err| step_failed(row_id, "rent", "update_row_state", err))?;

        let mut record =
            InventoryTransaction::new(table_id, row_id, InventoryAction::Rent, actor.user_id);
        record.before = Some(row.data);
        record.after = Some(data);
        record.quantity_delta = -1.0;
        record.reference_id = Some(rental.id);
        tx.insert_inventory_transaction(&record)
            .await
            .map_err(|err| step_failed(row_id, "rent", "insert_inventory", err))?;

        tx.commit()
            .await
            .map_err(|err| step_failed(row_id, "rent", "commit", err))?;
        Ok(rental)
    }

    /// Release a rented item: legal only from the rented state, closes the
    /// active rental, and moves the row to its terminal released state.
    pub async fn release_item(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_id: Uuid,
        notes: Option<String>,
    ) -> Result<Rental> {
        self.require_table(actor, table_id, TableType::Rent).await?;

        let mut tx = self.store.begin().await?;
        let row = fetch_item(&mut *tx, table_id, row_id).await?;
        let state = ItemState::from_row(&row.data);
        release_transition(state)?;

        let mut rental = tx
            .find_active_rental_for_row(row_id)
            .await?
            .ok_or_else(|| {
                error!(
                    row_id = %row_id,
                    "row is in the rented state but has no active rental entry"
                );
                Error::Unexpected(format!("no active rental found for item {row_id}"))
            })?;
        let now = Utc::now();
        rental.status = RentalStatus::Released;
        rental.released_at = Some(now);
        if notes.is_some() {
            rental.notes = notes;
        }
        rental.updated_at = now;
        tx.update_rental(&rental)
            .await
            .map_err(|err| step_failed(row_id, "release", "update_rental", err))?;

        let mut data = row.data.clone();
        let (used, available) = ItemState::Released.flags();
        data.insert("used".to_string(), CellValue::Bool(used));
        data.insert("available".to_string(), CellValue::Bool(available));
        tx.update_row_data(row_id, &data)
            .await
            .map_err(|err| step_failed(row_id, "release", "update_row_state", err))?;

        let mut record =
            InventoryTransaction::new(table_id, row_id, InventoryAction::Release, actor.user_id);
        record.before = Some(row.data);
        record.after = Some(data);
        record.reference_id = Some(rental.id);
        tx.insert_inventory_transaction(&record)
            .await
            .map_err(|err| step_failed(row_id, "release", "insert_inventory", err))?;

        tx.commit()
            .await
            .map_err(|err| step_failed(row_id, "release", "commit", err))?;
        Ok(rental)
    }

    /// Sell units of an item: legal while the item is priced and stocked,
    /// decrements `qty`, and writes the sale ledger entry.
    pub async fn sell_item(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_id: Uuid,
        request: SaleRequest,
    ) -> Result<Sale> {
        self.require_table(actor, table_id, TableType::Sale).await?;
        if !request.quantity.is_finite() || request.quantity <= 0.0 {
            return Err(Error::Validation("quantity must be positive".to_string()).into());
        }

        let mut tx = self.store.begin().await?;
        let row = fetch_item(&mut *tx, table_id, row_id).await?;

        let price = number_field(&row.data, "price");
        if price <= 0.0 {
            return Err(TransitionError::NotPriced.into());
        }
        let stock = number_field(&row.data, "qty");
        if stock <= 0.0 || request.quantity > stock {
            return Err(TransitionError::InsufficientQuantity {
                requested: request.quantity,
                available: stock,
            }
            .into());
        }

        let year = Utc::now().year();
        let value = tx
            .allocate_sequence(SequenceKind::Sale, year)
            .await
            .map_err(|err| step_failed(row_id, "sale", "allocate_sequence", err))?;
        let mut sale = Sale::new(
            SequenceKind::Sale.format_number(year, value),
            table_id,
            row_id,
            row.data.clone(),
            request.quantity,
            price,
        );
        sale.customer_id = request.customer_id;
        sale.payment_method = request.payment_method;
        sale.notes = request.notes;
        tx.insert_sale(&sale)
            .await
            .map_err(|err| step_failed(row_id, "sale", "insert_sale", err))?;

        let mut data = row.data.clone();
        data.insert(
            "qty".to_string(),
            CellValue::Number(stock - request.quantity),
        );
        tx.update_row_data(row_id, &data)
            .await
            .map_err(|err| step_failed(row_id, "sale", "update_row_state", err))?;

        let mut record =
            InventoryTransaction::new(table_id, row_id, InventoryAction::Sale, actor.user_id);
        record.before = Some(row.data);
        record.after = Some(data);
        record.quantity_delta = -request.quantity;
        record.reference_id = Some(sale.id);
        tx.insert_inventory_transaction(&record)
            .await
            .map_err(|err| step_failed(row_id, "sale", "insert_inventory", err))?;

        tx.commit()
            .await
            .map_err(|err| step_failed(row_id, "sale", "commit", err))?;
        Ok(sale)
    }

    /// How many units of an item are currently obtainable: the `qty` counter
    /// for sale tables, one unit for a rentable item, zero otherwise.
    pub async fn check_availability(
        &self,
        actor: &Actor,
        table_id: Uuid,
        row_id: Uuid,
        requested_qty: f64,
    ) -> Result<Availability> {
        let table = self
            .store
            .get_table(table_id)
            .await?
            .ok_or_else(|| Error::not_found("table", table_id))?;
        if !actor.can_read(&table) {
            return Err(Error::not_found("table", table_id).into());
        }
        if !table.is_commerce() {
            return Err(Error::Validation(format!(
                "table '{}' has no commerce semantics",
                table.name
            ))
            .into());
        }

        let row = self
            .store
            .get_row(row_id)
            .await?
            .filter(|row| row.table_id == table_id)
            .ok_or_else(|| Error::not_found("row", row_id))?;

        let available_qty = match table.table_type {
            TableType::Sale => number_field(&row.data, "qty"),
            _ => match ItemState::from_row(&row.data) {
                ItemState::Rentable => 1.0,
                _ => 0.0,
            },
        };
        Ok(Availability {
            available: available_qty >= requested_qty && requested_qty > 0.0,
            available_qty,
            requested_qty,
        })
    }

    /// Update the mutable subset of a sale: status, payment method, notes.
    /// Financial fields and the snapshot are frozen forever.
    pub async fn update_sale(
        &self,
        actor: &Actor,
        sale_id: Uuid,
        update: SaleUpdate,
    ) -> Result<Sale> {
        let mut sale = self
            .store
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| Error::not_found("sale", sale_id))?;
        self.require_table(actor, sale.table_id, TableType::Sale)
            .await?;

        if let Some(status) = update.status {
            sale.status = status;
        }
        if update.payment_method.is_some() {
            sale.payment_method = update.payment_method;
        }
        if update.notes.is_some() {
            sale.notes = update.notes;
        }
        sale.updated_at = Utc::now();
        self.store.update_sale(&sale).await?;
        Ok(sale)
    }

    /// Update the mutable subset of a rental: status and notes.
    pub async fn update_rental(
        &self,
        actor: &Actor,
        rental_id: Uuid,
        update: RentalUpdate,
    ) -> Result<Rental> {
        let mut rental = self
            .store
            .get_rental(rental_id)
            .await?
            .ok_or_else(|| Error::not_found("rental", rental_id))?;
        self.require_table(actor, rental.table_id, TableType::Rent)
            .await?;

        if let Some(status) = update.status {
            rental.status = status;
        }
        if update.notes.is_some() {
            rental.notes = update.notes;
        }
        rental.updated_at = Utc::now();
        self.store.update_rental(&rental).await?;
        Ok(rental)
    }

    pub async fn list_sales(&self, actor: &Actor, table_id: Uuid) -> Result<Vec<Sale>> {
        self.require_readable(actor, table_id).await?;
        Ok(self.store.list_sales(Some(table_id)).await?)
    }

    pub async fn list_rentals(&self, actor: &Actor, table_id: Uuid) -> Result<Vec<Rental>> {
        self.require_readable(actor, table_id).await?;
        Ok(self.store.list_rentals(Some(table_id)).await?)
    }

    pub async fn list_inventory_transactions(
        &self,
        actor: &Actor,
        table_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>> {
        self.require_readable(actor, table_id).await?;
        Ok(self.store.list_inventory_transactions(table_id).await?)
    }

    async fn require_readable(&self, actor: &Actor, table_id: Uuid) -> Result<()> {
        let table = self
            .store
            .get_table(table_id)
            .await?
            .ok_or_else(|| Error::not_found("table", table_id))?;
        if !actor.can_read(&table) {
            return Err(Error::not_found("table", table_id).into());
        }
        Ok(())
    }
}

async fn fetch_item(
    tx: &mut dyn StoreTx,
    table_id: Uuid,
    row_id: Uuid,
) -> Result<TableRow> {
    let row = tx
        .fetch_row_for_update(row_id)
        .await?
        .filter(|row| row.table_id == table_id)
        .ok_or_else(|| Error::not_found("row", row_id))?;
    Ok(row)
}

/// A transition step failed mid-transaction. The transaction will roll back
/// when the handle drops; the log line keeps the near-miss observable for
/// reconciliation.
fn step_failed(row_id: Uuid, transition: &str, step: &str, err: Error) -> CommerceError {
    error!(
        row_id = %row_id,
        transition,
        step,
        error = %err,
        "commerce transition step failed; rolling back"
    );
    err.into()
}
