use thiserror::Error;

use crate::model::ApplyOutcome;

/// Errors specific to type-change planning and application.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Core(#[from] dyntable_core::Error),
    /// A non-default target requires every template column to be mapped
    /// before any mutation starts.
    #[error("missing mappings for required columns: {}", .missing.join(", "))]
    MissingRequiredMappings { missing: Vec<String> },
    /// Columns were already changed when the final table-type update failed.
    /// The partial outcome is carried so the caller can reconcile.
    #[error("columns changed but type switch failed: {reason}")]
    TypeSwitchFailed {
        reason: String,
        outcome: ApplyOutcome,
    },
}

/// Result type for planner and applier operations.
pub type Result<T> = std::result::Result<T, PlanError>;
