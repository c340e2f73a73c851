use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use dyntable_core::{
    Column, Error, InventoryTransaction, Rental, RentalStatus, Result, RowData, Sale,
    SequenceKind, Table, TableRow, Visibility, rename_data_key,
};

use crate::repo::{Store, StoreTx, TableScope};

#[derive(Debug, Clone, Default)]
struct Inner {
    tables: HashMap<Uuid, Table>,
    columns: HashMap<Uuid, Column>,
    rows: HashMap<Uuid, TableRow>,
    sales: HashMap<Uuid, Sale>,
    rentals: HashMap<Uuid, Rental>,
    inventory: Vec<InventoryTransaction>,
    sequences: HashMap<(SequenceKind, i32), i64>,
}

impl Inner {
    fn sorted_columns(&self, table_id: Uuid) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .columns
            .values()
            .filter(|column| column.table_id == table_id)
            .cloned()
            .collect();
        columns.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        columns
    }
}

/// In-memory store backing the test suites.
///
/// A single mutex over the whole dataset makes every transaction fully
/// serialized, which is exactly the strictness the concurrency tests want to
/// observe. Transactions clone the state on begin and swap it back on
/// commit, so rollback is a plain drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(kind: &'static str, id: Uuid) -> Error {
    Error::not_found(kind, id)
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_table(&self, table: &Table) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(table.id, table.clone());
        Ok(())
    }

    async fn get_table(&self, id: Uuid) -> Result<Option<Table>> {
        Ok(self.inner.lock().await.tables.get(&id).cloned())
    }

    async fn list_tables(&self, scope: &TableScope) -> Result<Vec<Table>> {
        let inner = self.inner.lock().await;
        let mut tables: Vec<Table> = inner
            .tables
            .values()
            .filter(|table| match scope {
                TableScope::All => true,
                TableScope::UserVisible(user_id) => {
                    table.owner_id == *user_id
                        || matches!(table.visibility, Visibility::Public | Visibility::Shared)
                }
                TableScope::TokenScoped(ids) => ids.contains(&table.id),
            })
            .cloned()
            .collect();
        tables.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tables)
    }

    async fn update_table(&self, table: &Table) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.tables.contains_key(&table.id) {
            return Err(missing("table", table.id));
        }
        inner.tables.insert(table.id, table.clone());
        Ok(())
    }

    async fn delete_table(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.tables.remove(&id).is_none() {
            return Err(missing("table", id));
        }
        inner.columns.retain(|_, column| column.table_id != id);
        inner.rows.retain(|_, row| row.table_id != id);
        Ok(())
    }

    async fn insert_column(&self, column: &Column) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.columns.insert(column.id, column.clone());
        Ok(())
    }

    async fn get_column(&self, id: Uuid) -> Result<Option<Column>> {
        Ok(self.inner.lock().await.columns.get(&id).cloned())
    }

    async fn list_columns(&self, table_id: Uuid) -> Result<Vec<Column>> {
        Ok(self.inner.lock().await.sorted_columns(table_id))
    }

    async fn update_column(&self, column: &Column) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.columns.contains_key(&column.id) {
            return Err(missing("column", column.id));
        }
        inner.columns.insert(column.id, column.clone());
        Ok(())
    }

    async fn delete_column(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.columns.remove(&id).is_none() {
            return Err(missing("column", id));
        }
        Ok(())
    }

    async fn insert_row(&self, row: &TableRow) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.rows.insert(row.id, row.clone());
        Ok(())
    }

    async fn get_row(&self, id: Uuid) -> Result<Option<TableRow>> {
        Ok(self.inner.lock().await.rows.get(&id).cloned())
    }

    async fn list_rows(&self, table_id: Uuid) -> Result<Vec<TableRow>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<TableRow> = inner
            .rows
            .values()
            .filter(|row| row.table_id == table_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn update_row(&self, row: &TableRow) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.rows.contains_key(&row.id) {
            return Err(missing("row", row.id));
        }
        inner.rows.insert(row.id, row.clone());
        Ok(())
    }

    async fn delete_row(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.rows.remove(&id).is_none() {
            return Err(missing("row", id));
        }
        Ok(())
    }

    async fn get_sale(&self, id: Uuid) -> Result<Option<Sale>> {
        Ok(self.inner.lock().await.sales.get(&id).cloned())
    }

    async fn list_sales(&self, table_id: Option<Uuid>) -> Result<Vec<Sale>> {
        let inner = self.inner.lock().await;
        let mut sales: Vec<Sale> = inner
            .sales
            .values()
            .filter(|sale| table_id.is_none_or(|id| sale.table_id == id))
            .cloned()
            .collect();
        sales.sort_by(|a, b| a.sale_number.cmp(&b.sale_number));
        Ok(sales)
    }

    async fn update_sale(&self, sale: &Sale) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.sales.contains_key(&sale.id) {
            return Err(missing("sale", sale.id));
        }
        inner.sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn get_rental(&self, id: Uuid) -> Result<Option<Rental>> {
        Ok(self.inner.lock().await.rentals.get(&id).cloned())
    }

    async fn list_rentals(&self, table_id: Option<Uuid>) -> Result<Vec<Rental>> {
        let inner = self.inner.lock().await;
        let mut rentals: Vec<Rental> = inner
            .rentals
            .values()
            .filter(|rental| table_id.is_none_or(|id| rental.table_id == id))
            .cloned()
            .collect();
        rentals.sort_by(|a, b| a.rental_number.cmp(&b.rental_number));
        Ok(rentals)
    }

    async fn update_rental(&self, rental: &Rental) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.rentals.contains_key(&rental.id) {
            return Err(missing("rental", rental.id));
        }
        inner.rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    async fn insert_inventory_transaction(&self, record: &InventoryTransaction) -> Result<()> {
        self.inner.lock().await.inventory.push(record.clone());
        Ok(())
    }

    async fn list_inventory_transactions(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>> {
        Ok(self
            .inner
            .lock()
            .await
            .inventory
            .iter()
            .filter(|record| record.table_id == table_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Inner>,
    working: Inner,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn fetch_row_for_update(&mut self, id: Uuid) -> Result<Option<TableRow>> {
        // The store-wide guard held by this transaction is the row lock.
        Ok(self.working.rows.get(&id).cloned())
    }

    async fn update_row_data(&mut self, id: Uuid, data: &RowData) -> Result<()> {
        let row = self
            .working
            .rows
            .get_mut(&id)
            .ok_or_else(|| missing("row", id))?;
        row.data = data.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn allocate_sequence(&mut self, kind: SequenceKind, year: i32) -> Result<i64> {
        let counter = self.working.sequences.entry((kind, year)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<()> {
        self.working.sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn insert_rental(&mut self, rental: &Rental) -> Result<()> {
        self.working.rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    async fn update_rental(&mut self, rental: &Rental) -> Result<()> {
        if !self.working.rentals.contains_key(&rental.id) {
            return Err(missing("rental", rental.id));
        }
        self.working.rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    async fn find_active_rental_for_row(&mut self, row_id: Uuid) -> Result<Option<Rental>> {
        Ok(self
            .working
            .rentals
            .values()
            .find(|rental| rental.row_id == row_id && rental.status == RentalStatus::Active)
            .cloned())
    }

    async fn insert_inventory_transaction(&mut self, record: &InventoryTransaction) -> Result<()> {
        self.working.inventory.push(record.clone());
        Ok(())
    }

    async fn list_columns(&mut self, table_id: Uuid) -> Result<Vec<Column>> {
        Ok(self.working.sorted_columns(table_id))
    }

    async fn update_column(&mut self, column: &Column) -> Result<()> {
        if !self.working.columns.contains_key(&column.id) {
            return Err(missing("column", column.id));
        }
        self.working.columns.insert(column.id, column.clone());
        Ok(())
    }

    async fn update_column_position(&mut self, column_id: Uuid, position: i32) -> Result<()> {
        let column = self
            .working
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| missing("column", column_id))?;
        column.position = position;
        column.updated_at = Utc::now();
        Ok(())
    }

    async fn rename_row_data_key(
        &mut self,
        table_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<usize> {
        let mut touched = 0;
        for row in self.working.rows.values_mut() {
            if row.table_id == table_id && rename_data_key(&mut row.data, old, new) {
                row.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the working copy discards every staged change.
        Ok(())
    }
}
