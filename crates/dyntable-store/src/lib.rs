//! Persistence seam and schema store for dyntable.
//!
//! [`Store`]/[`StoreTx`] define transactional CRUD over the engine's
//! entities plus the atomic per-year sequence primitive. `PostgresStore` is
//! the production implementation; `MemoryStore` backs the test suites with
//! identical semantics. [`SchemaService`] layers the domain rules on top:
//! ownership checks, column protection, dense positions, rename cascades,
//! and warn-don't-block validation.

pub mod memory;
pub mod postgres;
pub mod repo;
pub mod service;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repo::{Store, StoreTx, TableScope};
pub use service::{
    BulkDeleteOutcome, ColumnUpdate, ColumnUpdateOutcome, InvalidRowCleanup, NewColumn, NewTable,
    RowFailure, RowWriteOutcome, SchemaService, TableUpdate,
};
