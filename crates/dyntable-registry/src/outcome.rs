use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Result of validating one value against one column type.
///
/// Validation never fails hard: an invalid value produces `valid: false`
/// with a user-facing error (and sometimes a fix suggestion), and the write
/// path treats it as a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            suggestion: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            suggestion: None,
        }
    }

    pub fn fail_with_suggestion(error: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            suggestion: Some(suggestion.into()),
        }
    }
}
