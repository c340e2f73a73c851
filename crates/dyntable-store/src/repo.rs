use async_trait::async_trait;
use uuid::Uuid;

use dyntable_core::{
    Column, InventoryTransaction, Rental, Result, RowData, Sale, SequenceKind, Table, TableRow,
};

/// Which tables a listing may see. Derived from the acting principal by the
/// schema service.
#[derive(Debug, Clone, PartialEq)]
pub enum TableScope {
    /// Every table (admin listings).
    All,
    /// Tables owned by the given user plus any public or shared table.
    UserVisible(Uuid),
    /// Exactly the tables a scoped access token grants.
    TokenScoped(Vec<Uuid>),
}

/// Transactional store over the engine's entities.
///
/// Implementations are thin: no domain rules live here, only persistence.
/// Multi-step invariants (commerce transitions, position renumbering, rename
/// cascades) run through [`StoreTx`] so they commit or roll back as a unit.
#[async_trait]
pub trait Store: Send + Sync {
    // Tables
    async fn insert_table(&self, table: &Table) -> Result<()>;
    async fn get_table(&self, id: Uuid) -> Result<Option<Table>>;
    async fn list_tables(&self, scope: &TableScope) -> Result<Vec<Table>>;
    async fn update_table(&self, table: &Table) -> Result<()>;
    /// Deletes the table together with its columns and rows. Ledger entries
    /// survive for audit.
    async fn delete_table(&self, id: Uuid) -> Result<()>;

    // Columns
    async fn insert_column(&self, column: &Column) -> Result<()>;
    async fn get_column(&self, id: Uuid) -> Result<Option<Column>>;
    /// Columns of a table ordered by position.
    async fn list_columns(&self, table_id: Uuid) -> Result<Vec<Column>>;
    async fn update_column(&self, column: &Column) -> Result<()>;
    async fn delete_column(&self, id: Uuid) -> Result<()>;

    // Rows
    async fn insert_row(&self, row: &TableRow) -> Result<()>;
    async fn get_row(&self, id: Uuid) -> Result<Option<TableRow>>;
    async fn list_rows(&self, table_id: Uuid) -> Result<Vec<TableRow>>;
    async fn update_row(&self, row: &TableRow) -> Result<()>;
    async fn delete_row(&self, id: Uuid) -> Result<()>;

    // Ledger reads and the narrow mutable subset
    async fn get_sale(&self, id: Uuid) -> Result<Option<Sale>>;
    async fn list_sales(&self, table_id: Option<Uuid>) -> Result<Vec<Sale>>;
    async fn update_sale(&self, sale: &Sale) -> Result<()>;
    async fn get_rental(&self, id: Uuid) -> Result<Option<Rental>>;
    async fn list_rentals(&self, table_id: Option<Uuid>) -> Result<Vec<Rental>>;
    async fn update_rental(&self, rental: &Rental) -> Result<()>;
    async fn insert_inventory_transaction(&self, record: &InventoryTransaction) -> Result<()>;
    async fn list_inventory_transactions(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>>;

    /// Open a transaction. Dropping the handle without committing rolls the
    /// transaction back.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// One open transaction against the store.
///
/// Carries the operations that must be atomic with respect to each other:
/// commerce transitions (row lock, sequence allocation, ledger insert, row
/// update, inventory append), column position renumbering, and the
/// rename-cascade over row data.
#[async_trait]
pub trait StoreTx: Send {
    /// Fetch a row, locking it against concurrent transitions for the
    /// lifetime of the transaction.
    async fn fetch_row_for_update(&mut self, id: Uuid) -> Result<Option<TableRow>>;
    /// Overwrite a row's data map, bumping its update timestamp.
    async fn update_row_data(&mut self, id: Uuid, data: &RowData) -> Result<()>;

    /// Atomic increment-and-read of the per-(kind, year) sequence counter.
    /// Never read-then-write: concurrent allocators must each observe a
    /// distinct value.
    async fn allocate_sequence(&mut self, kind: SequenceKind, year: i32) -> Result<i64>;

    async fn insert_sale(&mut self, sale: &Sale) -> Result<()>;
    async fn insert_rental(&mut self, rental: &Rental) -> Result<()>;
    async fn update_rental(&mut self, rental: &Rental) -> Result<()>;
    async fn find_active_rental_for_row(&mut self, row_id: Uuid) -> Result<Option<Rental>>;
    async fn insert_inventory_transaction(&mut self, record: &InventoryTransaction) -> Result<()>;

    /// Columns of a table ordered by position, read under the transaction.
    async fn list_columns(&mut self, table_id: Uuid) -> Result<Vec<Column>>;
    async fn update_column(&mut self, column: &Column) -> Result<()>;
    async fn update_column_position(&mut self, column_id: Uuid, position: i32) -> Result<()>;
    /// Rewrite `old` → `new` in every row-data map of the table, returning
    /// the number of rows touched.
    async fn rename_row_data_key(&mut self, table_id: Uuid, old: &str, new: &str)
    -> Result<usize>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
