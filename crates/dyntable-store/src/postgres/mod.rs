use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use dyntable_core::{
    Column, Error, InventoryTransaction, Rental, Result, RowData, Sale, SequenceKind, Table,
    TableRow,
};

use crate::repo::{Store, StoreTx, TableScope};

mod mapper;

use mapper::{
    ColumnRecord, InventoryRecord, RentalRecord, RowRecord, SaleRecord, TableRecord, map_column,
    map_inventory, map_rental, map_row, map_sale, map_table,
};

const TABLE_FIELDS: &str =
    "id, name, description, visibility, table_type, owner_id, rental_period, created_at, updated_at";
const COLUMN_FIELDS: &str = "id, table_id, name, column_type, is_required, allow_duplicates, \
     default_value, position, created_at, updated_at";
const ROW_FIELDS: &str = "id, table_id, data, created_at, updated_at";
const SALE_FIELDS: &str = "id, sale_number, table_id, row_id, snapshot, customer_id, quantity, \
     unit_price, total, status, payment_method, notes, created_at, updated_at";
const RENTAL_FIELDS: &str = "id, rental_number, table_id, row_id, snapshot, customer_id, \
     unit_price, status, rented_at, released_at, notes, created_at, updated_at";
const INVENTORY_FIELDS: &str = "id, table_id, row_id, action, before_data, after_data, \
     quantity_delta, reference_id, actor_id, created_at";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_tables (
  id UUID PRIMARY KEY,
  name TEXT NOT NULL,
  description TEXT,
  visibility TEXT NOT NULL,
  table_type TEXT NOT NULL,
  owner_id UUID NOT NULL,
  rental_period TEXT,
  created_at TIMESTAMPTZ NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS table_columns (
  id UUID PRIMARY KEY,
  table_id UUID NOT NULL REFERENCES user_tables(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  column_type TEXT NOT NULL,
  is_required BOOLEAN NOT NULL,
  allow_duplicates BOOLEAN NOT NULL,
  default_value JSONB,
  position INTEGER NOT NULL,
  created_at TIMESTAMPTZ NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS table_data (
  id UUID PRIMARY KEY,
  table_id UUID NOT NULL REFERENCES user_tables(id) ON DELETE CASCADE,
  data JSONB NOT NULL,
  created_at TIMESTAMPTZ NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS sales (
  id UUID PRIMARY KEY,
  sale_number TEXT NOT NULL UNIQUE,
  table_id UUID NOT NULL,
  row_id UUID NOT NULL,
  snapshot JSONB NOT NULL,
  customer_id TEXT,
  quantity DOUBLE PRECISION NOT NULL,
  unit_price DOUBLE PRECISION NOT NULL,
  total DOUBLE PRECISION NOT NULL,
  status TEXT NOT NULL,
  payment_method TEXT,
  notes TEXT,
  created_at TIMESTAMPTZ NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS rentals (
  id UUID PRIMARY KEY,
  rental_number TEXT NOT NULL UNIQUE,
  table_id UUID NOT NULL,
  row_id UUID NOT NULL,
  snapshot JSONB NOT NULL,
  customer_id TEXT,
  unit_price DOUBLE PRECISION NOT NULL,
  status TEXT NOT NULL,
  rented_at TIMESTAMPTZ NOT NULL,
  released_at TIMESTAMPTZ,
  notes TEXT,
  created_at TIMESTAMPTZ NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS inventory_transactions (
  id UUID PRIMARY KEY,
  table_id UUID NOT NULL,
  row_id UUID NOT NULL,
  action TEXT NOT NULL,
  before_data JSONB,
  after_data JSONB,
  quantity_delta DOUBLE PRECISION NOT NULL,
  reference_id UUID,
  actor_id UUID NOT NULL,
  created_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS sequence_counters (
  kind TEXT NOT NULL,
  year INTEGER NOT NULL,
  value BIGINT NOT NULL,
  PRIMARY KEY (kind, year)
);
"#;

fn db_err(err: sqlx::Error) -> Error {
    Error::Storage(err.to_string())
}

/// Postgres-backed store.
///
/// Queries are runtime-bound; the row-data and snapshot maps live in JSONB
/// columns, and the per-year sequence counters are advanced with an atomic
/// upsert so concurrent allocators never observe the same value.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store over a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let sql = statement.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_table(&self, table: &Table) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_tables (id, name, description, visibility, table_type, owner_id, \
             rental_period, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(table.id)
        .bind(&table.name)
        .bind(&table.description)
        .bind(table.visibility.as_str())
        .bind(table.table_type.as_str())
        .bind(table.owner_id)
        .bind(table.rental_period.map(|period| period.as_str()))
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_table(&self, id: Uuid) -> Result<Option<Table>> {
        let record = sqlx::query_as::<_, TableRecord>(&format!(
            "SELECT {TABLE_FIELDS} FROM user_tables WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        record.map(map_table).transpose()
    }

    async fn list_tables(&self, scope: &TableScope) -> Result<Vec<Table>> {
        let records = match scope {
            TableScope::All => {
                sqlx::query_as::<_, TableRecord>(&format!(
                    "SELECT {TABLE_FIELDS} FROM user_tables ORDER BY created_at, id"
                ))
                .fetch_all(&self.pool)
                .await
            }
            TableScope::UserVisible(user_id) => {
                sqlx::query_as::<_, TableRecord>(&format!(
                    "SELECT {TABLE_FIELDS} FROM user_tables \
                     WHERE owner_id = $1 OR visibility IN ('public', 'shared') \
                     ORDER BY created_at, id"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            TableScope::TokenScoped(ids) => {
                sqlx::query_as::<_, TableRecord>(&format!(
                    "SELECT {TABLE_FIELDS} FROM user_tables WHERE id = ANY($1) \
                     ORDER BY created_at, id"
                ))
                .bind(ids)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;
        records.into_iter().map(map_table).collect()
    }

    async fn update_table(&self, table: &Table) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_tables SET name = $2, description = $3, visibility = $4, \
             table_type = $5, rental_period = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(table.id)
        .bind(&table.name)
        .bind(&table.description)
        .bind(table.visibility.as_str())
        .bind(table.table_type.as_str())
        .bind(table.rental_period.map(|period| period.as_str()))
        .bind(table.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("table", table.id));
        }
        Ok(())
    }

    async fn delete_table(&self, id: Uuid) -> Result<()> {
        // Columns and rows cascade via their foreign keys.
        let result = sqlx::query("DELETE FROM user_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("table", id));
        }
        Ok(())
    }

    async fn insert_column(&self, column: &Column) -> Result<()> {
        sqlx::query(
            "INSERT INTO table_columns (id, table_id, name, column_type, is_required, \
             allow_duplicates, default_value, position, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(column.id)
        .bind(column.table_id)
        .bind(&column.name)
        .bind(&column.column_type)
        .bind(column.is_required)
        .bind(column.allow_duplicates)
        .bind(column.default_value.as_ref().map(Json))
        .bind(column.position)
        .bind(column.created_at)
        .bind(column.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_column(&self, id: Uuid) -> Result<Option<Column>> {
        let record = sqlx::query_as::<_, ColumnRecord>(&format!(
            "SELECT {COLUMN_FIELDS} FROM table_columns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(record.map(map_column))
    }

    async fn list_columns(&self, table_id: Uuid) -> Result<Vec<Column>> {
        let records = sqlx::query_as::<_, ColumnRecord>(&format!(
            "SELECT {COLUMN_FIELDS} FROM table_columns WHERE table_id = $1 \
             ORDER BY position, name"
        ))
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(records.into_iter().map(map_column).collect())
    }

    async fn update_column(&self, column: &Column) -> Result<()> {
        let result = sqlx::query(
            "UPDATE table_columns SET name = $2, column_type = $3, is_required = $4, \
             allow_duplicates = $5, default_value = $6, position = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(column.id)
        .bind(&column.name)
        .bind(&column.column_type)
        .bind(column.is_required)
        .bind(column.allow_duplicates)
        .bind(column.default_value.as_ref().map(Json))
        .bind(column.position)
        .bind(column.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("column", column.id));
        }
        Ok(())
    }

    async fn delete_column(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM table_columns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("column", id));
        }
        Ok(())
    }

    async fn insert_row(&self, row: &TableRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO table_data (id, table_id, data, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(row.table_id)
        .bind(Json(&row.data))
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_row(&self, id: Uuid) -> Result<Option<TableRow>> {
        let record = sqlx::query_as::<_, RowRecord>(&format!(
            "SELECT {ROW_FIELDS} FROM table_data WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(record.map(map_row))
    }

    async fn list_rows(&self, table_id: Uuid) -> Result<Vec<TableRow>> {
        let records = sqlx::query_as::<_, RowRecord>(&format!(
            "SELECT {ROW_FIELDS} FROM table_data WHERE table_id = $1 ORDER BY created_at, id"
        ))
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(records.into_iter().map(map_row).collect())
    }

    async fn update_row(&self, row: &TableRow) -> Result<()> {
        let result = sqlx::query(
            "UPDATE table_data SET data = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(row.id)
        .bind(Json(&row.data))
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("row", row.id));
        }
        Ok(())
    }

    async fn delete_row(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM table_data WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("row", id));
        }
        Ok(())
    }

    async fn get_sale(&self, id: Uuid) -> Result<Option<Sale>> {
        let record = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {SALE_FIELDS} FROM sales WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        record.map(map_sale).transpose()
    }

    async fn list_sales(&self, table_id: Option<Uuid>) -> Result<Vec<Sale>> {
        let records = match table_id {
            Some(table_id) => {
                sqlx::query_as::<_, SaleRecord>(&format!(
                    "SELECT {SALE_FIELDS} FROM sales WHERE table_id = $1 ORDER BY sale_number"
                ))
                .bind(table_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, SaleRecord>(&format!(
                    "SELECT {SALE_FIELDS} FROM sales ORDER BY sale_number"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;
        records.into_iter().map(map_sale).collect()
    }

    async fn update_sale(&self, sale: &Sale) -> Result<()> {
        // Financial fields are frozen; only the mutable subset is written.
        let result = sqlx::query(
            "UPDATE sales SET status = $2, payment_method = $3, notes = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(sale.id)
        .bind(sale.status.as_str())
        .bind(&sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("sale", sale.id));
        }
        Ok(())
    }

    async fn get_rental(&self, id: Uuid) -> Result<Option<Rental>> {
        let record = sqlx::query_as::<_, RentalRecord>(&format!(
            "SELECT {RENTAL_FIELDS} FROM rentals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        record.map(map_rental).transpose()
    }

    async fn list_rentals(&self, table_id: Option<Uuid>) -> Result<Vec<Rental>> {
        let records = match table_id {
            Some(table_id) => {
                sqlx::query_as::<_, RentalRecord>(&format!(
                    "SELECT {RENTAL_FIELDS} FROM rentals WHERE table_id = $1 \
                     ORDER BY rental_number"
                ))
                .bind(table_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, RentalRecord>(&format!(
                    "SELECT {RENTAL_FIELDS} FROM rentals ORDER BY rental_number"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;
        records.into_iter().map(map_rental).collect()
    }

    async fn update_rental(&self, rental: &Rental) -> Result<()> {
        let result = sqlx::query(
            "UPDATE rentals SET status = $2, released_at = $3, notes = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(rental.id)
        .bind(rental.status.as_str())
        .bind(rental.released_at)
        .bind(&rental.notes)
        .bind(rental.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("rental", rental.id));
        }
        Ok(())
    }

    async fn insert_inventory_transaction(&self, record: &InventoryTransaction) -> Result<()> {
        insert_inventory(&self.pool, record).await
    }

    async fn list_inventory_transactions(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>> {
        let records = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {INVENTORY_FIELDS} FROM inventory_transactions WHERE table_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        records.into_iter().map(map_inventory).collect()
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

async fn insert_inventory<'e, E>(executor: E, record: &InventoryTransaction) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO inventory_transactions (id, table_id, row_id, action, before_data, \
         after_data, quantity_delta, reference_id, actor_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(record.id)
    .bind(record.table_id)
    .bind(record.row_id)
    .bind(record.action.as_str())
    .bind(record.before.as_ref().map(Json))
    .bind(record.after.as_ref().map(Json))
    .bind(record.quantity_delta)
    .bind(record.reference_id)
    .bind(record.actor_id)
    .bind(record.created_at)
    .execute(executor)
    .await
    .map_err(db_err)?;
    Ok(())
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn fetch_row_for_update(&mut self, id: Uuid) -> Result<Option<TableRow>> {
        let record = sqlx::query_as::<_, RowRecord>(&format!(
            "SELECT {ROW_FIELDS} FROM table_data WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(record.map(map_row))
    }

    async fn update_row_data(&mut self, id: Uuid, data: &RowData) -> Result<()> {
        let result =
            sqlx::query("UPDATE table_data SET data = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(Json(data))
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("row", id));
        }
        Ok(())
    }

    async fn allocate_sequence(&mut self, kind: SequenceKind, year: i32) -> Result<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sequence_counters (kind, year, value) VALUES ($1, $2, 1) \
             ON CONFLICT (kind, year) \
             DO UPDATE SET value = sequence_counters.value + 1 \
             RETURNING value",
        )
        .bind(kind.as_str())
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(value)
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<()> {
        sqlx::query(
            "INSERT INTO sales (id, sale_number, table_id, row_id, snapshot, customer_id, \
             quantity, unit_price, total, status, payment_method, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(sale.id)
        .bind(&sale.sale_number)
        .bind(sale.table_id)
        .bind(sale.row_id)
        .bind(Json(&sale.snapshot))
        .bind(&sale.customer_id)
        .bind(sale.quantity)
        .bind(sale.unit_price)
        .bind(sale.total)
        .bind(sale.status.as_str())
        .bind(&sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_rental(&mut self, rental: &Rental) -> Result<()> {
        sqlx::query(
            "INSERT INTO rentals (id, rental_number, table_id, row_id, snapshot, customer_id, \
             unit_price, status, rented_at, released_at, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(rental.id)
        .bind(&rental.rental_number)
        .bind(rental.table_id)
        .bind(rental.row_id)
        .bind(Json(&rental.snapshot))
        .bind(&rental.customer_id)
        .bind(rental.unit_price)
        .bind(rental.status.as_str())
        .bind(rental.rented_at)
        .bind(rental.released_at)
        .bind(&rental.notes)
        .bind(rental.created_at)
        .bind(rental.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_rental(&mut self, rental: &Rental) -> Result<()> {
        let result = sqlx::query(
            "UPDATE rentals SET status = $2, released_at = $3, notes = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(rental.id)
        .bind(rental.status.as_str())
        .bind(rental.released_at)
        .bind(&rental.notes)
        .bind(rental.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("rental", rental.id));
        }
        Ok(())
    }

    async fn find_active_rental_for_row(&mut self, row_id: Uuid) -> Result<Option<Rental>> {
        let record = sqlx::query_as::<_, RentalRecord>(&format!(
            "SELECT {RENTAL_FIELDS} FROM rentals WHERE row_id = $1 AND status = 'active' \
             ORDER BY rented_at DESC LIMIT 1"
        ))
        .bind(row_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        record.map(map_rental).transpose()
    }

    async fn insert_inventory_transaction(&mut self, record: &InventoryTransaction) -> Result<()> {
        insert_inventory(&mut *self.tx, record).await
    }

    async fn list_columns(&mut self, table_id: Uuid) -> Result<Vec<Column>> {
        let records = sqlx::query_as::<_, ColumnRecord>(&format!(
            "SELECT {COLUMN_FIELDS} FROM table_columns WHERE table_id = $1 \
             ORDER BY position, name"
        ))
        .bind(table_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(records.into_iter().map(map_column).collect())
    }

    async fn update_column(&mut self, column: &Column) -> Result<()> {
        let result = sqlx::query(
            "UPDATE table_columns SET name = $2, column_type = $3, is_required = $4, \
             allow_duplicates = $5, default_value = $6, position = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(column.id)
        .bind(&column.name)
        .bind(&column.column_type)
        .bind(column.is_required)
        .bind(column.allow_duplicates)
        .bind(column.default_value.as_ref().map(Json))
        .bind(column.position)
        .bind(column.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("column", column.id));
        }
        Ok(())
    }

    async fn update_column_position(&mut self, column_id: Uuid, position: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE table_columns SET position = $2, updated_at = now() WHERE id = $1",
        )
        .bind(column_id)
        .bind(position)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("column", column_id));
        }
        Ok(())
    }

    async fn rename_row_data_key(
        &mut self,
        table_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<usize> {
        // Row data keys are column names, so a rename rewrites the JSONB map
        // of every row that carries the old key.
        let result = sqlx::query(
            "UPDATE table_data \
             SET data = (data - $2::text) || jsonb_build_object($3::text, data -> $2::text), \
                 updated_at = now() \
             WHERE table_id = $1 AND data ? $2::text",
        )
        .bind(table_id)
        .bind(old)
        .bind(new)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() as usize)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(db_err)
    }
}
