use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{
    InventoryAction, RentalPeriod, RentalStatus, SaleStatus, TableType, Visibility,
};
use crate::value::{CellValue, RowData};

/// A user-defined table. Owns its column schema and row data; `table_type`
/// decides which columns are protected and whether a transaction ledger is
/// maintained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub table_type: TableType,
    pub owner_id: Uuid,
    /// Only meaningful while `table_type` is `rent`.
    pub rental_period: Option<RentalPeriod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(owner_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            visibility: Visibility::Private,
            table_type: TableType::Default,
            owner_id,
            rental_period: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_commerce(&self) -> bool {
        self.table_type.is_commerce()
    }
}

/// A column definition. `column_type` is an open string so module-supplied
/// types can appear next to the built-ins; `position` is a dense display
/// ordering maintained by the schema store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    pub column_type: String,
    pub is_required: bool,
    pub allow_duplicates: bool,
    pub default_value: Option<CellValue>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Column {
    pub fn new(
        table_id: Uuid,
        name: impl Into<String>,
        column_type: impl Into<String>,
        position: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            table_id,
            name: name.into(),
            column_type: column_type.into(),
            is_required: false,
            allow_duplicates: true,
            default_value: None,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A row of semi-structured data belonging to one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: Uuid,
    pub table_id: Uuid,
    pub data: RowData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableRow {
    pub fn new(table_id: Uuid, data: RowData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            table_id,
            data,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An immutable-once-created sale ledger entry. Financial fields are frozen
/// at creation; only status, payment method, and notes may change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    /// Globally sequential per year, e.g. `SALE-2026-001`.
    pub sale_number: String,
    pub table_id: Uuid,
    pub row_id: Uuid,
    /// Frozen copy of the item data at sale time.
    pub snapshot: RowData,
    pub customer_id: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
    pub status: SaleStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(
        sale_number: String,
        table_id: Uuid,
        row_id: Uuid,
        snapshot: RowData,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sale_number,
            table_id,
            row_id,
            snapshot,
            customer_id: None,
            quantity,
            unit_price,
            total: quantity * unit_price,
            status: SaleStatus::Completed,
            payment_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An immutable-once-created rental ledger entry. Only status, notes, and the
/// release timestamp change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Uuid,
    /// Globally sequential per year, e.g. `RENT-2026-001`.
    pub rental_number: String,
    pub table_id: Uuid,
    pub row_id: Uuid,
    /// Frozen copy of the item data at rent time.
    pub snapshot: RowData,
    pub customer_id: Option<String>,
    pub unit_price: f64,
    pub status: RentalStatus,
    pub rented_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    pub fn new(
        rental_number: String,
        table_id: Uuid,
        row_id: Uuid,
        snapshot: RowData,
        unit_price: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            rental_number,
            table_id,
            row_id,
            snapshot,
            customer_id: None,
            unit_price,
            status: RentalStatus::Active,
            rented_at: now,
            released_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Append-only audit record of a quantity- or state-affecting event on a
/// commerce-table item. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub table_id: Uuid,
    pub row_id: Uuid,
    pub action: InventoryAction,
    pub before: Option<RowData>,
    pub after: Option<RowData>,
    pub quantity_delta: f64,
    /// Links to the Sale or Rental that caused the event, when one did.
    pub reference_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    pub fn new(table_id: Uuid, row_id: Uuid, action: InventoryAction, actor_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id,
            row_id,
            action,
            before: None,
            after: None,
            quantity_delta: 0.0,
            reference_id: None,
            actor_id,
            created_at: Utc::now(),
        }
    }
}
