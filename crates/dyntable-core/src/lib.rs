//! Core contracts for the dyntable engine.
//!
//! This crate defines the canonical entity types, the tagged cell-value model
//! for schemaless row data, the acting-principal context, and the per-type
//! column templates shared across the store, planner, and commerce crates.

pub mod actor;
pub mod entities;
pub mod enums;
pub mod error;
pub mod templates;
pub mod value;

pub use actor::Actor;
pub use entities::{Column, InventoryTransaction, Rental, Sale, Table, TableRow};
pub use enums::{
    InventoryAction, RentalPeriod, RentalStatus, SaleStatus, SequenceKind, TableType, Visibility,
};
pub use error::{Error, Result};
pub use templates::{ColumnTemplate, is_protected_column, protected_column_names, required_columns};
pub use value::{CellValue, RowData, bool_field, number_field, rename_data_key};
