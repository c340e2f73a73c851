//! Type-change planning and application for dyntable.
//!
//! The planner scores every (required, existing) column pair and assigns
//! greedily from the globally sorted matrix, producing an advisory plan the
//! operator approves. The applier then renames, updates, or creates columns
//! per mapping and switches the table type last.

pub mod applier;
pub mod errors;
pub mod model;
pub mod planner;

pub use applier::TypeChangeApplier;
pub use errors::{PlanError, Result};
pub use model::{
    ApplyFailure, ApplyOutcome, ColumnMapping, RenamedColumn, RequiredColumn, SuggestedMapping,
    TypeChangePlan,
};
pub use planner::TypeChangePlanner;
