//! Structured operation outcomes for the host process.

use serde::Serialize;

use crate::assignment::AssignmentResolution;

/// Outcome of one driven operation, shaped so a thin wrapper (CLI,
/// service, scheduled job) can report it without further interpretation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    /// Whether the upstream system was changed.
    pub changed: bool,

    /// Short result text: the new public id on create, a confirmation
    /// line otherwise.
    pub message: String,

    /// Category resolution payload, present only for that operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<AssignmentResolution>,
}

impl OperationOutcome {
    /// An outcome that changed the upstream system.
    #[must_use]
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            changed: true,
            message: message.into(),
            resolution: None,
        }
    }

    /// A read-only outcome.
    #[must_use]
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            message: message.into(),
            resolution: None,
        }
    }

    /// A read-only outcome carrying a category resolution.
    #[must_use]
    pub fn with_resolution(message: impl Into<String>, resolution: AssignmentResolution) -> Self {
        Self {
            changed: false,
            message: message.into(),
            resolution: Some(resolution),
        }
    }
}
