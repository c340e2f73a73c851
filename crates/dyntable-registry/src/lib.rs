//! Column type registry and row validation for dyntable.
//!
//! The registry maps string type ids to [`ColumnTypeHandler`] implementations
//! covering validation, formatting, parsing, and defaults. Built-ins are
//! installed at startup; modules contribute more types at runtime under
//! namespaced ids. Validation follows the warn-don't-block policy: bad data
//! is surfaced, never rejected or dropped.

pub mod handlers;
pub mod outcome;
pub mod registry;
pub mod validator;

pub use handlers::{ColumnTypeHandler, builtin_handlers};
pub use outcome::ValidationOutcome;
pub use registry::{TypeRegistry, base_type, compatible_types};
pub use validator::{
    DatasetReport, IncompatibleSample, RowReport, TypeChangePreview, preview_value_type_change,
    validate_dataset, validate_row, validate_value,
};
