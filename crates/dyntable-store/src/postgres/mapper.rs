use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use dyntable_core::{
    CellValue, Column, InventoryTransaction, Rental, Result, RowData, Sale, Table, TableRow,
};

#[derive(Debug, sqlx::FromRow)]
pub struct TableRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub visibility: String,
    pub table_type: String,
    pub owner_id: Uuid,
    pub rental_period: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn map_table(record: TableRecord) -> Result<Table> {
    Ok(Table {
        id: record.id,
        name: record.name,
        description: record.description,
        visibility: record.visibility.parse()?,
        table_type: record.table_type.parse()?,
        owner_id: record.owner_id,
        rental_period: record
            .rental_period
            .as_deref()
            .map(str::parse)
            .transpose()?,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[derive(Debug, sqlx::FromRow)]
pub struct ColumnRecord {
    pub id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    pub column_type: String,
    pub is_required: bool,
    pub allow_duplicates: bool,
    pub default_value: Option<Json<CellValue>>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn map_column(record: ColumnRecord) -> Column {
    Column {
        id: record.id,
        table_id: record.table_id,
        name: record.name,
        column_type: record.column_type,
        is_required: record.is_required,
        allow_duplicates: record.allow_duplicates,
        default_value: record.default_value.map(|value| value.0),
        position: record.position,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct RowRecord {
    pub id: Uuid,
    pub table_id: Uuid,
    pub data: Json<RowData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn map_row(record: RowRecord) -> TableRow {
    TableRow {
        id: record.id,
        table_id: record.table_id,
        data: record.data.0,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SaleRecord {
    pub id: Uuid,
    pub sale_number: String,
    pub table_id: Uuid,
    pub row_id: Uuid,
    pub snapshot: Json<RowData>,
    pub customer_id: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
    pub status: String,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn map_sale(record: SaleRecord) -> Result<Sale> {
    Ok(Sale {
        id: record.id,
        sale_number: record.sale_number,
        table_id: record.table_id,
        row_id: record.row_id,
        snapshot: record.snapshot.0,
        customer_id: record.customer_id,
        quantity: record.quantity,
        unit_price: record.unit_price,
        total: record.total,
        status: record.status.parse()?,
        payment_method: record.payment_method,
        notes: record.notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[derive(Debug, sqlx::FromRow)]
pub struct RentalRecord {
    pub id: Uuid,
    pub rental_number: String,
    pub table_id: Uuid,
    pub row_id: Uuid,
    pub snapshot: Json<RowData>,
    pub customer_id: Option<String>,
    pub unit_price: f64,
    pub status: String,
    pub rented_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn map_rental(record: RentalRecord) -> Result<Rental> {
    Ok(Rental {
        id: record.id,
        rental_number: record.rental_number,
        table_id: record.table_id,
        row_id: record.row_id,
        snapshot: record.snapshot.0,
        customer_id: record.customer_id,
        unit_price: record.unit_price,
        status: record.status.parse()?,
        rented_at: record.rented_at,
        released_at: record.released_at,
        notes: record.notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[derive(Debug, sqlx::FromRow)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub table_id: Uuid,
    pub row_id: Uuid,
    pub action: String,
    pub before_data: Option<Json<RowData>>,
    pub after_data: Option<Json<RowData>>,
    pub quantity_delta: f64,
    pub reference_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub fn map_inventory(record: InventoryRecord) -> Result<InventoryTransaction> {
    Ok(InventoryTransaction {
        id: record.id,
        table_id: record.table_id,
        row_id: record.row_id,
        action: record.action.parse()?,
        before: record.before_data.map(|value| value.0),
        after: record.after_data.map(|value| value.0),
        quantity_delta: record.quantity_delta,
        reference_id: record.reference_id,
        actor_id: record.actor_id,
        created_at: record.created_at,
    })
}
